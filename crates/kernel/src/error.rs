use tableau_common::{Address, ValueKind};

/// Errors raised by kernel operations.
///
/// Structural errors found at world construction (unknown dispatcher/facet
/// names, duplicate registrations) are fatal to startup. Errors raised by a
/// subscriber callback or task operation propagate out of the publish/drain
/// fold unswallowed; the caller decides whether they are recoverable.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("field not found: '{0}'")]
    FieldNotFound(String),
    #[error("type mismatch for field '{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: ValueKind,
        actual: ValueKind,
    },
    #[error("unknown facet: '{0}'")]
    UnknownFacet(String),
    #[error("unknown dispatcher: '{0}'")]
    UnknownDispatcher(String),
    #[error("component name already registered: '{0}'")]
    DuplicateComponent(String),
    #[error("address cannot be resolved: '{0}'")]
    AddressResolution(Address),
    #[error("simulant already exists at '{0}'")]
    AlreadyExists(Address),
    #[error("hierarchy key '{key}' does not match simulant name '{name}'")]
    HierarchyMismatch { key: String, name: String },
    #[error("event data mismatch: expected {expected}")]
    EventTypeMismatch { expected: &'static str },
    #[error("task scheduled for tick {scheduled} failed")]
    TaskFailed {
        scheduled: u64,
        #[source]
        source: Box<KernelError>,
    },
    #[error("overlay routing error: {0}")]
    Overlay(#[from] tableau_assets::AssetError),
    /// Domain error raised inside a user-supplied handler or hook.
    #[error("handler error: {0}")]
    Handler(String),
}
