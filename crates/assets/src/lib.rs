//! Asset metadata and overlay routing consulted by dispatchers.
//!
//! Both structures are populated by an external loader at world construction
//! time and are read-only from the core's perspective afterward.
//!
//! # Layout
//! Asset metadata is keyed `package -> asset -> metadata`. Overlay routes map
//! a dispatcher or facet name to the overlay that restyles it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Errors from asset metadata and overlay operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate overlay route for '{0}'")]
    DuplicateRoute(String),
}

/// Broad classification of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetKind {
    Image,
    Sound,
    Song,
    TileMap,
    Font,
}

/// Metadata record for one named asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub file_path: String,
    pub kind: AssetKind,
}

/// Package-keyed asset metadata.
///
/// BTreeMap at both levels for deterministic iteration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadataMap {
    packages: BTreeMap<String, BTreeMap<String, AssetMetadata>>,
}

impl AssetMetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        package: impl Into<String>,
        asset: impl Into<String>,
        metadata: AssetMetadata,
    ) {
        self.packages
            .entry(package.into())
            .or_default()
            .insert(asset.into(), metadata);
    }

    pub fn get(&self, package: &str, asset: &str) -> Option<&AssetMetadata> {
        self.packages.get(package)?.get(asset)
    }

    pub fn package(&self, package: &str) -> Option<&BTreeMap<String, AssetMetadata>> {
        self.packages.get(package)
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    pub fn asset_count(&self) -> usize {
        self.packages.values().map(BTreeMap::len).sum()
    }

    /// Load a metadata map from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let file = std::fs::File::open(path.as_ref())?;
        let map: Self = serde_json::from_reader(file)?;
        tracing::debug!(
            packages = map.package_count(),
            assets = map.asset_count(),
            "loaded asset metadata"
        );
        Ok(map)
    }

    /// Save the metadata map to a JSON file (used by loader tooling).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AssetError> {
        let file = std::fs::File::create(path.as_ref())?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

/// One overlay routing rule: restyle `target` with `overlay`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayRoute {
    /// Dispatcher or facet name the overlay applies to.
    pub target: String,
    /// Overlay name to apply.
    pub overlay: String,
}

/// Routes dispatcher/facet names to overlay names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayRouter {
    routes: BTreeMap<String, String>,
}

impl OverlayRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a router from explicit routes. Duplicate targets are rejected:
    /// two rules for the same dispatcher would make restyling ambiguous.
    pub fn from_routes<I>(routes: I) -> Result<Self, AssetError>
    where
        I: IntoIterator<Item = OverlayRoute>,
    {
        let mut table = BTreeMap::new();
        for route in routes {
            if table.contains_key(&route.target) {
                return Err(AssetError::DuplicateRoute(route.target));
            }
            table.insert(route.target, route.overlay);
        }
        Ok(Self { routes: table })
    }

    /// Overlay name routed for `target`, if any.
    pub fn route(&self, target: &str) -> Option<&str> {
        self.routes.get(target).map(String::as_str)
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Load routes from a JSON list file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let file = std::fs::File::open(path.as_ref())?;
        let routes: Vec<OverlayRoute> = serde_json::from_reader(file)?;
        tracing::debug!(routes = routes.len(), "loaded overlay routes");
        Self::from_routes(routes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> AssetMetadataMap {
        let mut map = AssetMetadataMap::new();
        map.insert(
            "gameplay",
            "ball",
            AssetMetadata {
                file_path: "gameplay/ball.png".into(),
                kind: AssetKind::Image,
            },
        );
        map.insert(
            "gameplay",
            "bounce",
            AssetMetadata {
                file_path: "gameplay/bounce.wav".into(),
                kind: AssetKind::Sound,
            },
        );
        map
    }

    #[test]
    fn insert_and_get() {
        let map = sample_map();
        assert_eq!(map.package_count(), 1);
        assert_eq!(map.asset_count(), 2);
        assert_eq!(map.get("gameplay", "ball").unwrap().kind, AssetKind::Image);
        assert!(map.get("gameplay", "missing").is_none());
        assert!(map.get("missing", "ball").is_none());
    }

    #[test]
    fn save_and_load_round_trip() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let map = sample_map();
        map.save(tmp.path()).unwrap();

        let loaded = AssetMetadataMap::load(tmp.path()).unwrap();
        assert_eq!(loaded, map);
    }

    #[test]
    fn router_routes_by_target() {
        let router = OverlayRouter::from_routes([
            OverlayRoute {
                target: "ball".into(),
                overlay: "BallOverlay".into(),
            },
            OverlayRoute {
                target: "bounce".into(),
                overlay: "BounceOverlay".into(),
            },
        ])
        .unwrap();
        assert_eq!(router.route("ball"), Some("BallOverlay"));
        assert_eq!(router.route("paddle"), None);
    }

    #[test]
    fn duplicate_route_rejected() {
        let err = OverlayRouter::from_routes([
            OverlayRoute {
                target: "ball".into(),
                overlay: "A".into(),
            },
            OverlayRoute {
                target: "ball".into(),
                overlay: "B".into(),
            },
        ])
        .unwrap_err();
        assert!(matches!(err, AssetError::DuplicateRoute(name) if name == "ball"));
    }

    #[test]
    fn router_load_from_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let routes = vec![OverlayRoute {
            target: "ball".into(),
            overlay: "BallOverlay".into(),
        }];
        serde_json::to_writer(std::fs::File::create(tmp.path()).unwrap(), &routes).unwrap();

        let router = OverlayRouter::load(tmp.path()).unwrap();
        assert_eq!(router.route_count(), 1);
        assert_eq!(router.route("ball"), Some("BallOverlay"));
    }
}
