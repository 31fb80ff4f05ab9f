//! Reference resolution: decoding embedded selections and names, and
//! opening the entities references point at.
//!
//! Every opener validates the caller's location first and binds the
//! reference to it only once the target has been opened. Handles opened
//! along the way (the dataset of a region, the owner of an attribute) are
//! closed before returning, on success and on error.

use std::sync::Arc;

use h5r_store::{OpenedAttribute, OpenedObject};
use h5r_types::{AccessOptions, Dataspace, LocationId, ObjectType};
use tracing::debug;

use crate::codec;
use crate::context::RefContext;
use crate::error::{RefError, RefResult};
use crate::reference::{utf8, Reference};

/// The entity a reference resolves to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entity {
    /// An open group, dataset, or named datatype.
    Object(OpenedObject),
    /// A copy of the target dataset's dataspace carrying the referenced
    /// selection.
    Region(Dataspace),
    /// An open attribute.
    Attribute(OpenedAttribute),
}

impl Entity {
    /// Identifier of the open handle, if the entity holds one.
    pub fn handle(&self) -> Option<LocationId> {
        match self {
            Entity::Object(obj) => Some(obj.id),
            Entity::Attribute(attr) => Some(attr.id),
            Entity::Region(_) => None,
        }
    }
}

impl RefContext {
    /// Decode the selection carried by a region reference.
    pub fn get_region(&self, reference: &Reference) -> RefResult<Dataspace> {
        let bytes = reference.selection_bytes()?;
        Ok(self.selections.decode(bytes)?)
    }

    /// Type of the object a bound intra-file reference points at.
    pub fn get_obj_type(&self, reference: &Reference) -> RefResult<ObjectType> {
        let address = reference.target_address()?;
        let loc = reference.bound_location().ok_or(RefError::Unbound)?;
        Ok(self.store.object_type(loc, address)?)
    }

    /// Path name of the target inside its container, two-phase. Unnamed
    /// targets report length 0.
    pub fn get_obj_name(&self, reference: &Reference, buf: Option<&mut [u8]>) -> RefResult<usize> {
        let name = self.obj_name(reference)?.unwrap_or_default();
        Ok(codec::copy_out(name.as_bytes(), buf))
    }

    /// Path name of the target inside its container, if it has one.
    pub fn obj_name(&self, reference: &Reference) -> RefResult<Option<String>> {
        let address = reference.target_address()?;
        let loc = reference.bound_location().ok_or(RefError::Unbound)?;
        Ok(self.store.object_name(loc, address)?)
    }

    /// Open the object `reference` targets.
    ///
    /// For region references this is the dataset, for attribute references
    /// the object the attribute is attached to. The caller owns the
    /// returned handle and closes it through the store.
    pub fn open_object(
        &self,
        reference: &mut Reference,
        loc: LocationId,
        access: &AccessOptions,
    ) -> RefResult<OpenedObject> {
        self.check_location(loc)?;
        let opened = self.open_target(reference, loc, access)?;
        if let Err(e) = reference.bind(Arc::clone(&self.registry), loc) {
            self.close_quietly(opened.id);
            return Err(e);
        }
        debug!(kind = %reference.kind(), %loc, id = %opened.id, "object opened");
        Ok(opened)
    }

    /// Apply the selection of a region reference to a copy of the target
    /// dataset's dataspace.
    pub fn open_region(&self, reference: &mut Reference, loc: LocationId) -> RefResult<Dataspace> {
        self.open_region_with(reference, loc, &AccessOptions::read_only())
    }

    /// Open the attribute `reference` targets. The caller owns the returned
    /// handle.
    pub fn open_attr(
        &self,
        reference: &mut Reference,
        loc: LocationId,
        access: &AccessOptions,
    ) -> RefResult<OpenedAttribute> {
        if !reference.kind().is_attribute() {
            return Err(RefError::WrongKind {
                op: "open_attr",
                expected: "an attribute",
                kind: reference.kind(),
            });
        }
        self.check_location(loc)?;
        let name = reference.attr_name()?;

        let owner = self.open_target(reference, loc, access)?;
        let attr = self.store.open_attribute(owner.id, &name, access);
        self.close_quietly(owner.id);
        let attr = attr?;

        if let Err(e) = reference.bind(Arc::clone(&self.registry), loc) {
            self.close_quietly(attr.id);
            return Err(e);
        }
        debug!(kind = %reference.kind(), %loc, attr = %attr.name, "attribute opened");
        Ok(attr)
    }

    /// Dereference `reference` against the open location `loc`.
    ///
    /// Object kinds open the target object, region kinds return the
    /// selected dataspace, attribute kinds open the named attribute.
    pub fn resolve(
        &self,
        reference: &mut Reference,
        loc: LocationId,
        access: &AccessOptions,
    ) -> RefResult<Entity> {
        let kind = reference.kind();
        if kind.is_region() {
            self.open_region_with(reference, loc, access).map(Entity::Region)
        } else if kind.is_attribute() {
            self.open_attr(reference, loc, access).map(Entity::Attribute)
        } else {
            self.open_object(reference, loc, access).map(Entity::Object)
        }
    }

    /// Close the handle held by `entity`, if any.
    pub fn close_entity(&self, entity: &Entity) -> RefResult<()> {
        match entity.handle() {
            Some(id) => Ok(self.store.close(id)?),
            None => Ok(()),
        }
    }

    fn open_region_with(
        &self,
        reference: &mut Reference,
        loc: LocationId,
        access: &AccessOptions,
    ) -> RefResult<Dataspace> {
        if !reference.kind().is_region() {
            return Err(RefError::WrongKind {
                op: "open_region",
                expected: "a region",
                kind: reference.kind(),
            });
        }
        self.check_location(loc)?;
        let selected = self.get_region(reference)?;

        let dataset = self.open_target(reference, loc, access)?;
        let space = self.store.dataspace(dataset.id);
        self.close_quietly(dataset.id);

        let region = space?
            .apply_selection(&selected)
            .map_err(|e| RefError::CorruptReference(format!("selection does not fit dataset: {e}")))?;
        reference.bind(Arc::clone(&self.registry), loc)?;
        debug!(kind = %reference.kind(), %loc, selected = region.selected_count(), "region resolved");
        Ok(region)
    }

    /// Open the object a reference names, without binding.
    fn open_target(
        &self,
        reference: &Reference,
        loc: LocationId,
        access: &AccessOptions,
    ) -> RefResult<OpenedObject> {
        if reference.kind().is_external() {
            let target = reference.external("open_object")?;
            let filename = utf8("filename", target.filename)?;
            let pathname = utf8("pathname", target.pathname)?;
            Ok(self.store.open_by_external_path(&filename, &pathname, access)?)
        } else {
            let address = reference.target_address()?;
            Ok(self.store.open_by_address(loc, address, access)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use h5r_store::{IdRegistry, InMemoryRegistry, InMemoryStore, Store};
    use h5r_types::Address;

    use crate::wire;

    struct Fixture {
        ctx: RefContext,
        store: Arc<InMemoryStore>,
        root: LocationId,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(InMemoryStore::new(Arc::new(InMemoryRegistry::new())));
            store.create_container("main.store").unwrap();
            store.add_group("main.store", "/grp").unwrap();
            store
                .insert_object_at(
                    "main.store",
                    "/grp/data",
                    Address::new(0x2000),
                    ObjectType::Dataset,
                    Some(Dataspace::simple(vec![10, 10])),
                )
                .unwrap();
            store.add_datatype("main.store", "/grp/dtype").unwrap();
            store.add_attribute("main.store", "/grp/data", "units").unwrap();

            store.create_container("other.store").unwrap();
            store.add_dataset("other.store", "/x", Dataspace::simple(vec![4])).unwrap();
            store.add_attribute("other.store", "/x", "scale").unwrap();

            let root = store.open_container("main.store").unwrap();
            let ctx = RefContext::in_memory(Arc::clone(&store));
            Self { ctx, store, root }
        }

        fn count(&self, id: LocationId) -> Option<u64> {
            self.store.registry().ref_count(id)
        }

        /// Round-trip through the wire format to get an unbound reference.
        fn unbound(&self, reference: &Reference) -> Reference {
            self.ctx.decode(&wire::encode(reference).unwrap()).unwrap().0
        }
    }

    #[test]
    fn object_type_and_name() {
        let f = Fixture::new();
        let data = f.ctx.create_object(f.root, "/grp/data").unwrap();
        assert_eq!(f.ctx.get_obj_type(&data).unwrap(), ObjectType::Dataset);
        let dtype = f.ctx.create_object(f.root, "/grp/dtype").unwrap();
        assert_eq!(f.ctx.get_obj_type(&dtype).unwrap(), ObjectType::NamedDatatype);

        assert_eq!(f.ctx.get_obj_name(&data, None).unwrap(), 9);
        let mut buf = [0u8; 16];
        f.ctx.get_obj_name(&data, Some(&mut buf)).unwrap();
        assert_eq!(&buf[..10], b"/grp/data\0");
    }

    #[test]
    fn object_queries_need_binding() {
        let f = Fixture::new();
        let r = f.unbound(&f.ctx.create_object(f.root, "/grp/data").unwrap());
        assert!(matches!(f.ctx.get_obj_type(&r), Err(RefError::Unbound)));
        assert!(matches!(f.ctx.obj_name(&r), Err(RefError::Unbound)));

        let ext = f.ctx.create_external_object("other.store", "/x").unwrap();
        assert!(matches!(
            f.ctx.get_obj_type(&ext),
            Err(RefError::UnsupportedForExternal { .. })
        ));
    }

    #[test]
    fn open_object_binds_after_success() {
        let f = Fixture::new();
        let mut r = f.unbound(&f.ctx.create_object(f.root, "/grp/data").unwrap());
        assert_eq!(f.count(f.root), Some(1));

        let obj = f.ctx.open_object(&mut r, f.root, &AccessOptions::read_only()).unwrap();
        assert_eq!(obj.address, Address::new(0x2000));
        assert_eq!(obj.object_type, ObjectType::Dataset);
        assert_eq!(r.bound_location(), Some(f.root));
        assert_eq!(f.count(f.root), Some(2));
        f.store.close(obj.id).unwrap();
    }

    #[test]
    fn failed_open_leaves_reference_unbound() {
        let f = Fixture::new();
        let mut r = f.unbound(&f.ctx.create_object(f.root, "/grp/data").unwrap());

        let err = f
            .ctx
            .open_object(&mut r, LocationId::new(999), &AccessOptions::read_only())
            .unwrap_err();
        assert!(matches!(err, RefError::InvalidLocation(_)));

        f.store.set_read_only("main.store", true).unwrap();
        let err = f
            .ctx
            .open_object(&mut r, f.root, &AccessOptions::read_write())
            .unwrap_err();
        assert!(matches!(err, RefError::AccessDenied(_)));
        assert_eq!(r.bound_location(), None);
        assert_eq!(f.count(f.root), Some(1));
    }

    #[test]
    fn dangling_address_is_not_found() {
        let f = Fixture::new();
        let mut buf = wire::encode(&f.ctx.create_object(f.root, "/grp/data").unwrap()).unwrap();
        buf[9..17].copy_from_slice(&0x9999u64.to_le_bytes());
        let (mut r, _) = f.ctx.decode(&buf).unwrap();
        let err = f.ctx.resolve(&mut r, f.root, &AccessOptions::default()).unwrap_err();
        assert!(matches!(err, RefError::TargetNotFound(_)));
    }

    #[test]
    fn region_applies_selection_to_dataset_space() {
        let f = Fixture::new();
        let mut space = Dataspace::simple(vec![10, 10]);
        space.select_hyperslab(vec![0, 0], vec![2, 5]).unwrap();
        let mut r = f.unbound(&f.ctx.create_region(f.root, "/grp/data", &space).unwrap());

        let region = f.ctx.open_region(&mut r, f.root).unwrap();
        assert_eq!(region, space);
        assert_eq!(region.selected_count(), 10);
        // The dataset handle was closed; only the binding remains.
        assert_eq!(f.count(f.root), Some(2));
        assert_eq!(f.store.registry().len(), 1);
    }

    #[test]
    fn region_extent_mismatch_is_corrupt() {
        let f = Fixture::new();
        let space = Dataspace::simple(vec![3, 3]);
        let mut r = f.ctx.create_region(f.root, "/grp/data", &space).unwrap();
        let err = f.ctx.open_region(&mut r, f.root).unwrap_err();
        assert!(matches!(err, RefError::CorruptReference(_)));
    }

    #[test]
    fn region_ops_reject_other_kinds() {
        let f = Fixture::new();
        let mut obj = f.ctx.create_object(f.root, "/grp/data").unwrap();
        let mut attr = f.ctx.create_attr(f.root, "/grp/data", "units").unwrap();
        assert!(matches!(f.ctx.get_region(&obj), Err(RefError::WrongKind { .. })));
        assert!(matches!(f.ctx.get_region(&attr), Err(RefError::WrongKind { .. })));
        assert!(matches!(
            f.ctx.open_region(&mut obj, f.root),
            Err(RefError::WrongKind { .. })
        ));
        assert!(matches!(
            f.ctx.open_attr(&mut obj, f.root, &AccessOptions::default()),
            Err(RefError::WrongKind { .. })
        ));
        assert!(f.ctx.open_attr(&mut attr, f.root, &AccessOptions::default()).is_ok());
    }

    #[test]
    fn attribute_opens_on_owner() {
        let f = Fixture::new();
        let mut r = f.unbound(&f.ctx.create_attr(f.root, "/grp/data", "units").unwrap());
        let attr = f.ctx.open_attr(&mut r, f.root, &AccessOptions::default()).unwrap();
        assert_eq!(attr.name, "units");
        assert_eq!(attr.owner, Address::new(0x2000));
        // root + binding, plus the attribute handle; the owner was closed.
        assert_eq!(f.count(f.root), Some(2));
        assert_eq!(f.store.registry().len(), 2);
        f.store.close(attr.id).unwrap();
    }

    #[test]
    fn missing_attribute_closes_owner() {
        let f = Fixture::new();
        let mut r = f.ctx.create_attr(f.root, "/grp/data", "missing").unwrap();
        let before = f.store.registry().len();
        let err = f.ctx.open_attr(&mut r, f.root, &AccessOptions::default()).unwrap_err();
        assert!(matches!(err, RefError::TargetNotFound(_)));
        assert_eq!(f.store.registry().len(), before);
    }

    #[test]
    fn external_kinds_resolve_by_path() {
        let f = Fixture::new();
        let mut obj = f.ctx.create_external_object("other.store", "/x").unwrap();
        let entity = f.ctx.resolve(&mut obj, f.root, &AccessOptions::default()).unwrap();
        assert!(matches!(&entity, Entity::Object(o) if o.object_type == ObjectType::Dataset));
        f.ctx.close_entity(&entity).unwrap();

        let mut attr = f.ctx.create_external_attr("other.store", "/x", "scale").unwrap();
        let entity = f.ctx.resolve(&mut attr, f.root, &AccessOptions::default()).unwrap();
        assert!(matches!(&entity, Entity::Attribute(a) if a.name == "scale"));
        f.ctx.close_entity(&entity).unwrap();

        let mut space = Dataspace::simple(vec![4]);
        space.select_points(vec![vec![3]]).unwrap();
        let mut region = f.ctx.create_external_region("other.store", "/x", &space).unwrap();
        let entity = f.ctx.resolve(&mut region, f.root, &AccessOptions::default()).unwrap();
        assert_eq!(entity, Entity::Region(space));
        assert_eq!(entity.handle(), None);
    }

    #[test]
    fn missing_external_container_is_not_found() {
        let f = Fixture::new();
        let mut r = f.ctx.create_external_object("absent.store", "/x").unwrap();
        let err = f.ctx.resolve(&mut r, f.root, &AccessOptions::default()).unwrap_err();
        assert!(matches!(err, RefError::TargetNotFound(_)));
        assert_eq!(r.bound_location(), None);
    }
}
