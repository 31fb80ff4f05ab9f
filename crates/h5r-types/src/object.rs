use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of object stored at an address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    Group,
    Dataset,
    NamedDatatype,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectType::Group => write!(f, "group"),
            ObjectType::Dataset => write!(f, "dataset"),
            ObjectType::NamedDatatype => write!(f, "named datatype"),
        }
    }
}

/// Access properties passed to the store when a reference target is opened.
///
/// The store decides whether it can honor them; a rejection surfaces as an
/// access-denied error from resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessOptions {
    /// Request write access to the opened entity.
    pub writable: bool,
}

impl AccessOptions {
    /// Read-only access (the default).
    pub fn read_only() -> Self {
        Self::default()
    }

    /// Read-write access.
    pub fn read_write() -> Self {
        Self { writable: true }
    }
}
