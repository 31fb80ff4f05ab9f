//! Reference constructors.
//!
//! Intra-file constructors resolve `path` against an open location and
//! embed the target address. External constructors embed a filename and
//! pathname instead; nothing is resolved until the reference is opened.
//!
//! Arguments are validated before any buffer is allocated, so a rejected
//! call leaves nothing behind.

use std::sync::Arc;

use h5r_types::{Address, Dataspace, LocationId};
use tracing::debug;

use crate::codec;
use crate::context::RefContext;
use crate::error::{RefError, RefResult};
use crate::reference::{Payload, Reference};

impl RefContext {
    /// Reference to the object at `path`, relative to `loc`.
    pub fn create_object(&self, loc: LocationId, path: &str) -> RefResult<Reference> {
        require("path", path)?;
        let address = self.locate(loc, path)?;
        self.finish_local(Payload::Object(address), loc, address)
    }

    /// Reference to the active selection of `space` within the dataset at
    /// `path`.
    pub fn create_region(
        &self,
        loc: LocationId,
        path: &str,
        space: &Dataspace,
    ) -> RefResult<Reference> {
        require("path", path)?;
        let selection_len = self.selection_len(space)?;
        let address = self.locate(loc, path)?;

        let mut buf = codec::alloc_buffer(Address::SIZE + selection_len)?;
        codec::put_address(&mut buf, address);
        self.put_selection(&mut buf, space)?;
        self.finish_local(Payload::Region(buf.into_boxed_slice()), loc, address)
    }

    /// Reference to the attribute `attr_name` of the object at `path`.
    pub fn create_attr(&self, loc: LocationId, path: &str, attr_name: &str) -> RefResult<Reference> {
        require("path", path)?;
        require("attribute name", attr_name)?;
        codec::check_name_len("attribute name", attr_name.len())?;
        let address = self.locate(loc, path)?;

        let mut buf = codec::alloc_buffer(Address::SIZE + 2 + attr_name.len())?;
        codec::put_address(&mut buf, address);
        codec::put_name(&mut buf, "attribute name", attr_name.as_bytes())?;
        self.finish_local(Payload::Attribute(buf.into_boxed_slice()), loc, address)
    }

    /// Reference to `pathname` inside the container `filename`.
    pub fn create_external_object(&self, filename: &str, pathname: &str) -> RefResult<Reference> {
        check_external(filename, pathname)?;
        let mut buf = codec::alloc_buffer(2 + filename.len() + pathname.len())?;
        put_external(&mut buf, filename, pathname, false)?;
        Ok(finish_external(Payload::ExternalObject(buf.into_boxed_slice())))
    }

    /// Reference to the active selection of `space` within the dataset
    /// `pathname` of the container `filename`.
    pub fn create_external_region(
        &self,
        filename: &str,
        pathname: &str,
        space: &Dataspace,
    ) -> RefResult<Reference> {
        check_external(filename, pathname)?;
        let selection_len = self.selection_len(space)?;

        let mut buf = codec::alloc_buffer(2 + filename.len() + pathname.len() + 1 + selection_len)?;
        put_external(&mut buf, filename, pathname, true)?;
        self.put_selection(&mut buf, space)?;
        Ok(finish_external(Payload::ExternalRegion(buf.into_boxed_slice())))
    }

    /// Reference to the attribute `attr_name` of `pathname` inside the
    /// container `filename`.
    pub fn create_external_attr(
        &self,
        filename: &str,
        pathname: &str,
        attr_name: &str,
    ) -> RefResult<Reference> {
        check_external(filename, pathname)?;
        require("attribute name", attr_name)?;
        codec::check_name_len("attribute name", attr_name.len())?;

        let mut buf =
            codec::alloc_buffer(2 + filename.len() + pathname.len() + 1 + 2 + attr_name.len())?;
        put_external(&mut buf, filename, pathname, true)?;
        codec::put_name(&mut buf, "attribute name", attr_name.as_bytes())?;
        Ok(finish_external(Payload::ExternalAttribute(buf.into_boxed_slice())))
    }

    fn locate(&self, loc: LocationId, path: &str) -> RefResult<Address> {
        self.check_location(loc)?;
        let address = self.store.locate(loc, path)?;
        if !address.is_resolvable() {
            return Err(RefError::UndefinedAddress(address));
        }
        Ok(address)
    }

    fn selection_len(&self, space: &Dataspace) -> RefResult<usize> {
        space
            .validate()
            .map_err(|e| RefError::InvalidArgument(format!("selection: {e}")))?;
        self.selections
            .encoded_len(space)
            .map_err(|e| RefError::InvalidArgument(format!("selection: {e}")))
    }

    fn put_selection(&self, buf: &mut Vec<u8>, space: &Dataspace) -> RefResult<()> {
        self.selections
            .encode_into(space, buf)
            .map_err(|e| RefError::InvalidArgument(format!("selection: {e}")))
    }

    fn finish_local(&self, payload: Payload, loc: LocationId, address: Address) -> RefResult<Reference> {
        let mut reference = Reference::from_payload(payload);
        if self.config().bind_on_create {
            reference.bind(Arc::clone(&self.registry), loc)?;
        }
        debug!(kind = %reference.kind(), %address, %loc, "reference created");
        Ok(reference)
    }
}

fn finish_external(payload: Payload) -> Reference {
    let reference = Reference::from_payload(payload);
    debug!(kind = %reference.kind(), len = reference.payload().len(), "reference created");
    reference
}

fn require(what: &str, value: &str) -> RefResult<()> {
    if value.is_empty() {
        return Err(RefError::InvalidArgument(format!("{what} is empty")));
    }
    Ok(())
}

fn check_external(filename: &str, pathname: &str) -> RefResult<()> {
    require("filename", filename)?;
    require("pathname", pathname)?;
    codec::check_name_len("filename", filename.len())?;
    if pathname.contains('\0') {
        return Err(RefError::InvalidArgument("pathname contains a NUL byte".into()));
    }
    Ok(())
}

/// Append `[u16 len][filename][pathname]`, plus the pathname terminator when
/// more data follows.
fn put_external(buf: &mut Vec<u8>, filename: &str, pathname: &str, terminated: bool) -> RefResult<()> {
    codec::put_name(buf, "filename", filename.as_bytes())?;
    buf.extend_from_slice(pathname.as_bytes());
    if terminated {
        buf.push(0);
    }
    Ok(())
}
