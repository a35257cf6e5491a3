use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pattern segment matching any single concrete segment.
pub const WILDCARD: &str = "*";

/// Hierarchical path key identifying a simulant or an event channel.
///
/// An ordered sequence of name segments. The empty address is the game root;
/// screen/group/entity addresses carry 1/2/3 segments. Addresses are never
/// mutated — descending or ascending the hierarchy builds a new value.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address {
    segments: Vec<String>,
}

/// Errors from parsing an address out of text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressParseError {
    #[error("empty segment in address '{0}'")]
    EmptySegment(String),
}

impl Address {
    /// The game root address (no segments).
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments; the hierarchy depth of the node this names.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, if any.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// A new address descending into `segment`.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// A new address one level up, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Concatenation of `self` and `other`.
    pub fn concat(&self, other: &Address) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// Whether `self`, read as a pattern, matches the concrete `address`.
    ///
    /// Same length, and each pattern segment equals the concrete segment or
    /// is the `*` wildcard. A pattern without wildcards matches only itself.
    pub fn matches(&self, address: &Address) -> bool {
        self.segments.len() == address.segments.len()
            && self
                .segments
                .iter()
                .zip(&address.segments)
                .all(|(pat, seg)| pat == WILDCARD || pat == seg)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    /// Parse `"a/b/c"` into segments. The empty string is the root.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        let segments: Vec<String> = s.split('/').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(AddressParseError::EmptySegment(s.to_string()));
        }
        Ok(Self { segments })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trip() {
        let addr: Address = "beach/props/ball".parse().unwrap();
        assert_eq!(addr.segments().len(), 3);
        assert_eq!(addr.to_string(), "beach/props/ball");
    }

    #[test]
    fn empty_string_is_root() {
        let addr: Address = "".parse().unwrap();
        assert!(addr.is_root());
        assert_eq!(addr, Address::root());
    }

    #[test]
    fn empty_segment_rejected() {
        let err = "beach//ball".parse::<Address>().unwrap_err();
        assert!(matches!(err, AddressParseError::EmptySegment(_)));
    }

    #[test]
    fn equality_follows_segments() {
        let a = Address::new(["beach", "props"]);
        let b: Address = "beach/props".parse().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, a.child("ball"));
    }

    #[test]
    fn child_and_parent_invert() {
        let group = Address::new(["beach", "props"]);
        let entity = group.child("ball");
        assert_eq!(entity.name(), Some("ball"));
        assert_eq!(entity.parent(), Some(group));
        assert_eq!(Address::root().parent(), None);
    }

    #[test]
    fn concat_appends() {
        let a = Address::new(["beach"]);
        let b = Address::new(["props", "ball"]);
        assert_eq!(a.concat(&b), Address::new(["beach", "props", "ball"]));
    }

    #[test]
    fn exact_pattern_matches_only_itself() {
        let pat = Address::new(["beach", "incoming-finish"]);
        assert!(pat.matches(&pat));
        assert!(!pat.matches(&Address::new(["lobby", "incoming-finish"])));
    }

    #[test]
    fn wildcard_matches_any_single_segment() {
        let pat = Address::new([WILDCARD, "incoming-finish"]);
        assert!(pat.matches(&Address::new(["beach", "incoming-finish"])));
        assert!(pat.matches(&Address::new(["lobby", "incoming-finish"])));
        // Length must still agree.
        assert!(!pat.matches(&Address::new(["beach", "props", "incoming-finish"])));
    }
}
