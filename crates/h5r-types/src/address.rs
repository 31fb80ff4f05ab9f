use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage address of an entity inside a container.
///
/// Addresses are opaque to the reference subsystem: they are produced by the
/// store when a path is located and handed back to it when the entity is
/// opened. The all-ones value is reserved as the "undefined" address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(u64);

impl Address {
    /// The reserved undefined address (all bits set).
    pub const UNDEFINED: Address = Address(u64::MAX);

    /// Width of an encoded address in bytes.
    pub const SIZE: usize = 8;

    /// Wrap a raw address value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw address value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns `true` unless this is [`Address::UNDEFINED`].
    pub fn is_defined(self) -> bool {
        self.0 != u64::MAX
    }

    /// Returns `true` if the address can denote a real entity: defined and
    /// non-zero.
    pub fn is_resolvable(self) -> bool {
        self.is_defined() && self.0 != 0
    }

    /// Little-endian encoding.
    pub fn to_le_bytes(self) -> [u8; Self::SIZE] {
        self.0.to_le_bytes()
    }

    /// Decode from little-endian bytes.
    pub fn from_le_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_defined() {
            write!(f, "Address({:#x})", self.0)
        } else {
            write!(f, "Address(UNDEF)")
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_defined() {
            write!(f, "{:#x}", self.0)
        } else {
            write!(f, "UNDEF")
        }
    }
}

impl From<u64> for Address {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<Address> for u64 {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

/// Identifier of an open container, object, or attribute handle.
///
/// Identifiers are issued by the identifier registry. Holding a
/// `LocationId` does not keep the handle open; only a refcount unit
/// registered with the registry does.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationId(u64);

impl LocationId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocationId({})", self.0)
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loc:{}", self.0)
    }
}
