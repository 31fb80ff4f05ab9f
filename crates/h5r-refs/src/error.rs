//! Error types for reference operations.

use std::collections::TryReserveError;

use h5r_store::StoreError;
use h5r_types::{Address, LocationId};
use thiserror::Error;

use crate::kind::ReferenceKind;

/// Errors that can occur while creating, encoding, or resolving references.
#[derive(Debug, Error)]
pub enum RefError {
    /// A required argument is empty or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The location does not denote an open container or object.
    #[error("invalid location: {0}")]
    InvalidLocation(LocationId),

    /// The operation needs the location the reference is bound to, and the
    /// reference is not bound.
    #[error("reference is not bound to an open location")]
    Unbound,

    /// The path, address, container, or attribute does not resolve.
    #[error("target not found: {0}")]
    TargetNotFound(String),

    /// A name does not fit the format's 2-byte length field.
    #[error("{what} too long: {len} bytes (max {max})")]
    NameTooLong {
        what: &'static str,
        len: usize,
        max: usize,
    },

    /// Encoded bytes failed validation.
    #[error("corrupt reference: {0}")]
    CorruptReference(String),

    /// The operation is only defined for other reference kinds.
    #[error("{op} requires {expected}, got {kind} reference")]
    WrongKind {
        op: &'static str,
        expected: &'static str,
        kind: ReferenceKind,
    },

    /// The operation needs an embedded address, which external kinds lack.
    #[error("{op} is not supported for {kind} references")]
    UnsupportedForExternal {
        op: &'static str,
        kind: ReferenceKind,
    },

    /// The operation needs an embedded filename, which intra-file kinds lack.
    #[error("{op} is not supported for {kind} references")]
    UnsupportedForKind {
        op: &'static str,
        kind: ReferenceKind,
    },

    /// The embedded address is the undefined sentinel or zero.
    #[error("undefined object address {0}")]
    UndefinedAddress(Address),

    /// A buffer could not be allocated.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The store rejected the supplied access options.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// The identifier registry rejected a refcount change.
    #[error("identifier registry error: {0}")]
    Registry(String),

    /// Any other store failure.
    #[error("store error: {0}")]
    Store(#[source] StoreError),
}

impl From<StoreError> for RefError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => RefError::TargetNotFound(what),
            StoreError::InvalidLocation(id) => RefError::InvalidLocation(id),
            StoreError::AccessDenied(why) => RefError::AccessDenied(why),
            StoreError::UnknownId(id) => RefError::Registry(format!("unknown identifier {id}")),
            StoreError::Codec(why) => RefError::CorruptReference(why),
            other => RefError::Store(other),
        }
    }
}

impl From<TryReserveError> for RefError {
    fn from(err: TryReserveError) -> Self {
        RefError::ResourceExhausted(err.to_string())
    }
}

/// Convenience type alias for reference operations.
pub type RefResult<T> = std::result::Result<T, RefError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_onto_taxonomy() {
        let id = LocationId::new(3);
        assert!(matches!(
            RefError::from(StoreError::NotFound("x".into())),
            RefError::TargetNotFound(_)
        ));
        assert!(matches!(
            RefError::from(StoreError::InvalidLocation(id)),
            RefError::InvalidLocation(l) if l == id
        ));
        assert!(matches!(
            RefError::from(StoreError::AccessDenied("ro".into())),
            RefError::AccessDenied(_)
        ));
        assert!(matches!(
            RefError::from(StoreError::UnknownId(id)),
            RefError::Registry(_)
        ));
        assert!(matches!(
            RefError::from(StoreError::Codec("bad".into())),
            RefError::CorruptReference(_)
        ));
        assert!(matches!(
            RefError::from(StoreError::AlreadyExists("x".into())),
            RefError::Store(_)
        ));
    }

    #[test]
    fn messages_name_the_kind() {
        let err = RefError::WrongKind {
            op: "get_region",
            expected: "a region",
            kind: ReferenceKind::Attribute,
        };
        assert_eq!(err.to_string(), "get_region requires a region, got attribute reference");
    }
}
