use h5r_types::{AccessOptions, Address, Dataspace, LocationId, ObjectType};

use crate::error::StoreResult;
use crate::memory::{OpenedAttribute, OpenedObject};

/// Reference-counting registry of open identifiers.
///
/// Implementations must make each individual increment and decrement
/// atomic; callers add no locking of their own.
pub trait IdRegistry: Send + Sync {
    /// Add one refcount unit to `id`. Returns the new count.
    fn inc_ref(&self, id: LocationId) -> StoreResult<u64>;

    /// Remove one refcount unit from `id`. Returns the remaining count.
    ///
    /// When the count reaches zero the identifier is closed and forgotten.
    fn dec_ref(&self, id: LocationId) -> StoreResult<u64>;

    /// Current count, or `None` if the identifier is not registered.
    fn ref_count(&self, id: LocationId) -> Option<u64>;

    /// Returns `true` if the identifier is registered.
    fn is_valid(&self, id: LocationId) -> bool {
        self.ref_count(id).is_some()
    }
}

/// Serializes the active selection of a dataspace.
///
/// The bytes are opaque to callers: they are embedded verbatim in region
/// references and handed back to [`SelectionCodec::decode`] unchanged.
pub trait SelectionCodec: Send + Sync {
    /// Number of bytes [`encode_into`](SelectionCodec::encode_into) will
    /// append for `space`.
    fn encoded_len(&self, space: &Dataspace) -> StoreResult<usize>;

    /// Append the encoding of `space` to `out`.
    fn encode_into(&self, space: &Dataspace, out: &mut Vec<u8>) -> StoreResult<()>;

    /// Rebuild a dataspace, selection included, from its encoding.
    fn decode(&self, bytes: &[u8]) -> StoreResult<Dataspace>;

    /// Encode `space` into a fresh buffer.
    fn encode(&self, space: &Dataspace) -> StoreResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.encoded_len(space)?);
        self.encode_into(space, &mut out)?;
        Ok(out)
    }
}

/// Container storage as seen by the reference subsystem.
///
/// Every `open_*` method registers a new identifier holding one unit; the
/// caller releases it with [`Store::close`].
pub trait Store: Send + Sync {
    /// Returns `true` if `loc` denotes an open container or object.
    fn is_location(&self, loc: LocationId) -> bool;

    /// Resolve `path` relative to `loc` to the target's address.
    fn locate(&self, loc: LocationId, path: &str) -> StoreResult<Address>;

    /// Open the object at `address` in the container `loc` belongs to.
    fn open_by_address(
        &self,
        loc: LocationId,
        address: Address,
        access: &AccessOptions,
    ) -> StoreResult<OpenedObject>;

    /// Open `pathname` inside the container named `filename`.
    fn open_by_external_path(
        &self,
        filename: &str,
        pathname: &str,
        access: &AccessOptions,
    ) -> StoreResult<OpenedObject>;

    /// Open the attribute `name` attached to the open object `object`.
    fn open_attribute(
        &self,
        object: LocationId,
        name: &str,
        access: &AccessOptions,
    ) -> StoreResult<OpenedAttribute>;

    /// A copy of the dataspace of the open dataset `dataset`.
    fn dataspace(&self, dataset: LocationId) -> StoreResult<Dataspace>;

    /// Type of the object at `address` in the container `loc` belongs to.
    fn object_type(&self, loc: LocationId, address: Address) -> StoreResult<ObjectType>;

    /// Path name of the object at `address`, if it has one.
    fn object_name(&self, loc: LocationId, address: Address) -> StoreResult<Option<String>>;

    /// Release the opener's unit on `id`.
    fn close(&self, id: LocationId) -> StoreResult<()>;
}
