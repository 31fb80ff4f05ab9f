use h5r_types::{LocationId, ObjectType};

/// Errors from store, codec, and registry operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A path, address, container, or attribute does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The identifier does not denote an open container or object.
    #[error("invalid location: {0}")]
    InvalidLocation(LocationId),

    /// The registry has no entry for this identifier.
    #[error("unknown identifier: {0}")]
    UnknownId(LocationId),

    /// The requested access options cannot be honored.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Selection bytes could not be produced or parsed.
    #[error("selection codec error: {0}")]
    Codec(String),

    /// The object exists but has the wrong type for the operation.
    #[error("expected {expected}, found {actual}")]
    WrongObjectType {
        expected: ObjectType,
        actual: ObjectType,
    },

    /// An entity with this name already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
