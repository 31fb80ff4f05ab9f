//! The reference value and its payload layouts.
//!
//! A [`Reference`] is a [`Payload`] (one variant per [`ReferenceKind`]) plus
//! an optional [`LocationBinding`]. `Object` references carry their target
//! address inline; every other kind carries a serialized buffer:
//!
//! | kind                 | buffer layout                                              |
//! |----------------------|------------------------------------------------------------|
//! | `Region`             | `[address][selection]`                                     |
//! | `Attribute`          | `[address][u16 len][name]`                                 |
//! | `ExternalObject`     | `[u16 len][filename][pathname]`                            |
//! | `ExternalRegion`     | `[u16 len][filename][pathname][0][selection]`              |
//! | `ExternalAttribute`  | `[u16 len][filename][pathname][0][u16 len][name]`          |
//!
//! Addresses are 8 bytes little-endian. Pathnames are NUL-free; in the
//! region and attribute forms a single NUL ends the pathname.

use std::fmt;
use std::sync::Arc;

use h5r_store::IdRegistry;
use h5r_types::{Address, LocationId};

use crate::binding::LocationBinding;
use crate::codec;
use crate::error::{RefError, RefResult};
use crate::kind::ReferenceKind;

/// The kind-specific content of a reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Payload {
    Object(Address),
    Region(Box<[u8]>),
    Attribute(Box<[u8]>),
    ExternalObject(Box<[u8]>),
    ExternalRegion(Box<[u8]>),
    ExternalAttribute(Box<[u8]>),
}

impl Payload {
    /// Wrap a serialized buffer as the payload of `kind`.
    ///
    /// Returns `None` for [`ReferenceKind::Object`], whose payload is an
    /// inline address.
    pub fn from_serialized(kind: ReferenceKind, buf: Box<[u8]>) -> Option<Self> {
        match kind {
            ReferenceKind::Object => None,
            ReferenceKind::Region => Some(Payload::Region(buf)),
            ReferenceKind::Attribute => Some(Payload::Attribute(buf)),
            ReferenceKind::ExternalObject => Some(Payload::ExternalObject(buf)),
            ReferenceKind::ExternalRegion => Some(Payload::ExternalRegion(buf)),
            ReferenceKind::ExternalAttribute => Some(Payload::ExternalAttribute(buf)),
        }
    }

    pub fn kind(&self) -> ReferenceKind {
        match self {
            Payload::Object(_) => ReferenceKind::Object,
            Payload::Region(_) => ReferenceKind::Region,
            Payload::Attribute(_) => ReferenceKind::Attribute,
            Payload::ExternalObject(_) => ReferenceKind::ExternalObject,
            Payload::ExternalRegion(_) => ReferenceKind::ExternalRegion,
            Payload::ExternalAttribute(_) => ReferenceKind::ExternalAttribute,
        }
    }

    /// The serialized buffer, or `None` for an inline address.
    pub fn serialized(&self) -> Option<&[u8]> {
        match self {
            Payload::Object(_) => None,
            Payload::Region(buf)
            | Payload::Attribute(buf)
            | Payload::ExternalObject(buf)
            | Payload::ExternalRegion(buf)
            | Payload::ExternalAttribute(buf) => Some(buf),
        }
    }

    /// Payload length on the wire.
    pub fn len(&self) -> usize {
        self.serialized().map_or(Address::SIZE, <[u8]>::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn try_clone(&self) -> RefResult<Self> {
        Ok(match self {
            Payload::Object(addr) => Payload::Object(*addr),
            Payload::Region(buf) => Payload::Region(codec::copy_bytes(buf)?),
            Payload::Attribute(buf) => Payload::Attribute(codec::copy_bytes(buf)?),
            Payload::ExternalObject(buf) => Payload::ExternalObject(codec::copy_bytes(buf)?),
            Payload::ExternalRegion(buf) => Payload::ExternalRegion(codec::copy_bytes(buf)?),
            Payload::ExternalAttribute(buf) => Payload::ExternalAttribute(codec::copy_bytes(buf)?),
        })
    }
}

/// Filename and pathname embedded in an external reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ExternalTarget<'a> {
    pub filename: &'a [u8],
    pub pathname: &'a [u8],
    /// Bytes after the pathname terminator (selection or attribute name).
    pub trailer: &'a [u8],
}

/// A serializable handle to an object, a dataset region, or an attribute.
///
/// Two references compare equal when their kinds and payloads match; the
/// bound location never takes part in comparison.
pub struct Reference {
    payload: Payload,
    binding: Option<LocationBinding>,
}

impl Reference {
    /// Wrap a payload in an unbound reference.
    pub(crate) fn from_payload(payload: Payload) -> Self {
        Self {
            payload,
            binding: None,
        }
    }

    pub fn kind(&self) -> ReferenceKind {
        self.payload.kind()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The location this reference holds a unit on, if bound.
    pub fn bound_location(&self) -> Option<LocationId> {
        self.binding.as_ref().map(LocationBinding::id)
    }

    /// Bind to `id`, holding one refcount unit on it.
    ///
    /// Binding to the already-bound location is a no-op. Otherwise the old
    /// unit is released before the new one is acquired; if acquiring fails
    /// the reference is left unbound.
    pub fn bind(&mut self, registry: Arc<dyn IdRegistry>, id: LocationId) -> RefResult<()> {
        if self.bound_location() == Some(id) {
            return Ok(());
        }
        self.unbind()?;
        self.binding = Some(LocationBinding::acquire(registry, id)?);
        Ok(())
    }

    /// Release the bound location's unit, if any.
    pub fn unbind(&mut self) -> RefResult<()> {
        match self.binding.take() {
            Some(binding) => binding.release(),
            None => Ok(()),
        }
    }

    /// Destroy the reference, reporting a failure to release its location
    /// unit. Dropping a reference releases the unit too, but can only log a
    /// failure.
    pub fn destroy(mut self) -> RefResult<()> {
        self.unbind()
    }

    /// Deep copy: the buffer is duplicated and, if bound, the copy holds
    /// its own unit on the same location.
    pub fn try_clone(&self) -> RefResult<Self> {
        let payload = self.payload.try_clone()?;
        let binding = self
            .binding
            .as_ref()
            .map(LocationBinding::duplicate)
            .transpose()?;
        Ok(Self { payload, binding })
    }

    // ---------------------------------------------------------------
    // Payload accessors
    // ---------------------------------------------------------------

    /// Address of the target object.
    ///
    /// Inline for `Object`, decoded from the buffer prefix for `Region` and
    /// `Attribute`. External kinds embed no address.
    pub fn target_address(&self) -> RefResult<Address> {
        let addr = match &self.payload {
            Payload::Object(addr) => *addr,
            Payload::Region(buf) | Payload::Attribute(buf) => codec::get_address(buf)?.0,
            _ => {
                return Err(RefError::UnsupportedForExternal {
                    op: "target_address",
                    kind: self.kind(),
                })
            }
        };
        if !addr.is_resolvable() {
            return Err(RefError::UndefinedAddress(addr));
        }
        Ok(addr)
    }

    /// Attribute name, two-phase: pass `None` (or a short buffer) to learn
    /// the length, then a buffer of at least `length + 1` bytes to receive
    /// the NUL-terminated name.
    pub fn get_attr_name(&self, buf: Option<&mut [u8]>) -> RefResult<usize> {
        Ok(codec::copy_out(self.attr_name_bytes()?, buf))
    }

    /// Attribute name as a string.
    pub fn attr_name(&self) -> RefResult<String> {
        utf8("attribute name", self.attr_name_bytes()?)
    }

    /// External filename, two-phase like [`get_attr_name`](Self::get_attr_name).
    pub fn get_file_name(&self, buf: Option<&mut [u8]>) -> RefResult<usize> {
        Ok(codec::copy_out(self.external("file_name")?.filename, buf))
    }

    /// External filename as a string.
    pub fn file_name(&self) -> RefResult<String> {
        utf8("filename", self.external("file_name")?.filename)
    }

    /// Pathname inside the external container, two-phase.
    pub fn get_path_name(&self, buf: Option<&mut [u8]>) -> RefResult<usize> {
        Ok(codec::copy_out(self.external("path_name")?.pathname, buf))
    }

    /// Pathname inside the external container as a string.
    pub fn path_name(&self) -> RefResult<String> {
        utf8("pathname", self.external("path_name")?.pathname)
    }

    /// The opaque selection bytes of a region reference.
    pub(crate) fn selection_bytes(&self) -> RefResult<&[u8]> {
        match &self.payload {
            Payload::Region(buf) => Ok(codec::get_address(buf)?.1),
            Payload::ExternalRegion(_) => Ok(self.external("get_region")?.trailer),
            _ => Err(RefError::WrongKind {
                op: "get_region",
                expected: "a region",
                kind: self.kind(),
            }),
        }
    }

    fn attr_name_bytes(&self) -> RefResult<&[u8]> {
        let trailer = match &self.payload {
            Payload::Attribute(buf) => codec::get_address(buf)?.1,
            Payload::ExternalAttribute(_) => self.external("attr_name")?.trailer,
            _ => {
                return Err(RefError::WrongKind {
                    op: "attr_name",
                    expected: "an attribute",
                    kind: self.kind(),
                })
            }
        };
        let (name, rest) = codec::get_name(trailer)?;
        if !rest.is_empty() {
            return Err(RefError::CorruptReference(format!(
                "{} trailing bytes after attribute name",
                rest.len()
            )));
        }
        Ok(name)
    }

    pub(crate) fn external(&self, op: &'static str) -> RefResult<ExternalTarget<'_>> {
        let (buf, delimited) = match &self.payload {
            Payload::ExternalObject(buf) => (buf, false),
            Payload::ExternalRegion(buf) | Payload::ExternalAttribute(buf) => (buf, true),
            _ => {
                return Err(RefError::UnsupportedForKind {
                    op,
                    kind: self.kind(),
                })
            }
        };
        let (filename, rest) = codec::get_name(buf)?;
        let (pathname, trailer) = if delimited {
            let end = rest.iter().position(|&b| b == 0).ok_or_else(|| {
                RefError::CorruptReference("unterminated external pathname".into())
            })?;
            (&rest[..end], &rest[end + 1..])
        } else {
            (rest, &rest[rest.len()..])
        };
        Ok(ExternalTarget {
            filename,
            pathname,
            trailer,
        })
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
    }
}

impl Eq for Reference {}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Reference");
        s.field("kind", &self.kind());
        match &self.payload {
            Payload::Object(addr) => s.field("address", addr),
            other => {
                let buf = other.serialized().unwrap_or_default();
                let preview = hex::encode(&buf[..buf.len().min(16)]);
                s.field("len", &buf.len()).field("payload", &preview)
            }
        };
        s.field("bound", &self.bound_location()).finish()
    }
}

pub(crate) fn utf8(what: &str, bytes: &[u8]) -> RefResult<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| RefError::CorruptReference(format!("{what} is not valid UTF-8")))
}
