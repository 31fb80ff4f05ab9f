//! In-memory container store for tests and embedding.
//!
//! [`InMemoryStore`] holds a set of named container images. Each image is a
//! flat table of objects keyed by address plus a path index. Opening a
//! container or an object registers an identifier with the shared
//! [`InMemoryRegistry`]; the store considers a handle open for exactly as
//! long as the registry keeps the identifier alive.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use h5r_types::{AccessOptions, Address, Dataspace, LocationId, ObjectType};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::registry::InMemoryRegistry;
use crate::traits::{IdRegistry, Store};

/// Address of the root group in every container image.
pub const ROOT_ADDRESS: Address = Address::new(0x60);

/// First address handed out by automatic allocation.
const FIRST_ALLOCATED: u64 = 0x800;
const ALLOCATION_STRIDE: u64 = 0x800;

/// An object opened through the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenedObject {
    /// Identifier of the open handle.
    pub id: LocationId,
    /// Address of the object inside its container.
    pub address: Address,
    /// Concrete type of the object.
    pub object_type: ObjectType,
}

/// An attribute opened through the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenedAttribute {
    /// Identifier of the open handle.
    pub id: LocationId,
    /// Address of the object the attribute is attached to.
    pub owner: Address,
    /// Attribute name.
    pub name: String,
}

#[derive(Clone, Debug)]
struct ObjectEntry {
    path: String,
    object_type: ObjectType,
    dataspace: Option<Dataspace>,
    attributes: BTreeSet<String>,
}

#[derive(Debug)]
struct ContainerImage {
    objects: BTreeMap<Address, ObjectEntry>,
    paths: BTreeMap<String, Address>,
    next_address: u64,
    read_only: bool,
}

impl ContainerImage {
    fn new() -> Self {
        let mut image = Self {
            objects: BTreeMap::new(),
            paths: BTreeMap::new(),
            next_address: FIRST_ALLOCATED,
            read_only: false,
        };
        image.objects.insert(
            ROOT_ADDRESS,
            ObjectEntry {
                path: "/".into(),
                object_type: ObjectType::Group,
                dataspace: None,
                attributes: BTreeSet::new(),
            },
        );
        image.paths.insert("/".into(), ROOT_ADDRESS);
        image
    }

    fn allocate(&mut self) -> Address {
        while self.objects.contains_key(&Address::new(self.next_address)) {
            self.next_address += ALLOCATION_STRIDE;
        }
        let addr = Address::new(self.next_address);
        self.next_address += ALLOCATION_STRIDE;
        addr
    }

    fn entry(&self, address: Address) -> StoreResult<&ObjectEntry> {
        self.objects
            .get(&address)
            .ok_or_else(|| StoreError::NotFound(format!("no object at address {address}")))
    }

    fn lookup(&self, path: &str) -> StoreResult<Address> {
        self.paths
            .get(path)
            .copied()
            .ok_or_else(|| StoreError::NotFound(format!("path {path}")))
    }

    fn check_access(&self, access: &AccessOptions) -> StoreResult<()> {
        if access.writable && self.read_only {
            return Err(StoreError::AccessDenied(
                "write access requested on a read-only container".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
enum Handle {
    Object { file: String, address: Address },
    Attribute { file: String },
}

impl Handle {
    fn file(&self) -> &str {
        match self {
            Handle::Object { file, .. } | Handle::Attribute { file } => file,
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    files: HashMap<String, ContainerImage>,
    handles: HashMap<LocationId, Handle>,
}

/// In-memory, `HashMap`-based container store.
///
/// Intended for tests and embedding. Container images are created and
/// populated through the inherent methods; the [`Store`] trait exposes the
/// read side the reference subsystem needs.
pub struct InMemoryStore {
    registry: Arc<InMemoryRegistry>,
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    /// Create an empty store issuing identifiers from `registry`.
    pub fn new(registry: Arc<InMemoryRegistry>) -> Self {
        Self {
            registry,
            state: RwLock::new(StoreState::default()),
        }
    }

    /// The registry this store issues identifiers from.
    pub fn registry(&self) -> &Arc<InMemoryRegistry> {
        &self.registry
    }

    /// Create an empty container image holding only the root group.
    pub fn create_container(&self, filename: &str) -> StoreResult<()> {
        let mut state = self.state.write().expect("lock poisoned");
        if state.files.contains_key(filename) {
            return Err(StoreError::AlreadyExists(format!("container {filename}")));
        }
        state.files.insert(filename.to_string(), ContainerImage::new());
        debug!(filename, "container created");
        Ok(())
    }

    /// Mark a container read-only; write access to it is then denied.
    pub fn set_read_only(&self, filename: &str, read_only: bool) -> StoreResult<()> {
        let mut state = self.state.write().expect("lock poisoned");
        let image = container_mut(&mut state, filename)?;
        image.read_only = read_only;
        Ok(())
    }

    /// Open a container, returning an identifier for its root group.
    pub fn open_container(&self, filename: &str) -> StoreResult<LocationId> {
        let mut state = self.state.write().expect("lock poisoned");
        container(&state, filename)?;
        self.prune_handles(&mut state);
        let id = self.registry.register();
        state.handles.insert(
            id,
            Handle::Object {
                file: filename.to_string(),
                address: ROOT_ADDRESS,
            },
        );
        Ok(id)
    }

    /// Add a group at an absolute `path`; the parent group must exist.
    pub fn add_group(&self, filename: &str, path: &str) -> StoreResult<Address> {
        self.insert(filename, path, None, ObjectType::Group, None)
    }

    /// Add a dataset with the given dataspace.
    pub fn add_dataset(&self, filename: &str, path: &str, space: Dataspace) -> StoreResult<Address> {
        self.insert(filename, path, None, ObjectType::Dataset, Some(space))
    }

    /// Add a named datatype.
    pub fn add_datatype(&self, filename: &str, path: &str) -> StoreResult<Address> {
        self.insert(filename, path, None, ObjectType::NamedDatatype, None)
    }

    /// Add an object at an explicit address.
    pub fn insert_object_at(
        &self,
        filename: &str,
        path: &str,
        address: Address,
        object_type: ObjectType,
        space: Option<Dataspace>,
    ) -> StoreResult<Address> {
        self.insert(filename, path, Some(address), object_type, space)
    }

    /// Attach an attribute named `name` to the object at `path`.
    pub fn add_attribute(&self, filename: &str, path: &str, name: &str) -> StoreResult<()> {
        let mut state = self.state.write().expect("lock poisoned");
        let image = container_mut(&mut state, filename)?;
        let address = image.lookup(&normalize(None, path))?;
        let entry = image
            .objects
            .get_mut(&address)
            .ok_or_else(|| StoreError::NotFound(format!("no object at address {address}")))?;
        if !entry.attributes.insert(name.to_string()) {
            return Err(StoreError::AlreadyExists(format!("attribute {name} on {path}")));
        }
        Ok(())
    }

    fn insert(
        &self,
        filename: &str,
        path: &str,
        address: Option<Address>,
        object_type: ObjectType,
        dataspace: Option<Dataspace>,
    ) -> StoreResult<Address> {
        let mut state = self.state.write().expect("lock poisoned");
        let image = container_mut(&mut state, filename)?;
        let path = normalize(None, path);
        if image.paths.contains_key(&path) {
            return Err(StoreError::AlreadyExists(path));
        }
        let parent = parent_of(&path);
        let parent_addr = image.lookup(parent)?;
        let parent_type = image.entry(parent_addr)?.object_type;
        if parent_type != ObjectType::Group {
            return Err(StoreError::WrongObjectType {
                expected: ObjectType::Group,
                actual: parent_type,
            });
        }
        let address = match address {
            Some(addr) if !addr.is_resolvable() => {
                return Err(StoreError::NotFound(format!("unusable address {addr}")))
            }
            Some(addr) if image.objects.contains_key(&addr) => {
                return Err(StoreError::AlreadyExists(format!("address {addr}")))
            }
            Some(addr) => addr,
            None => image.allocate(),
        };
        image.objects.insert(
            address,
            ObjectEntry {
                path: path.clone(),
                object_type,
                dataspace,
                attributes: BTreeSet::new(),
            },
        );
        debug!(filename, %path, %address, %object_type, "object added");
        image.paths.insert(path, address);
        Ok(address)
    }

    /// Look up a handle whose identifier the registry still holds open.
    fn handle(&self, state: &StoreState, id: LocationId) -> Option<Handle> {
        if !self.registry.is_valid(id) {
            return None;
        }
        state.handles.get(&id).cloned()
    }

    fn object_handle(&self, state: &StoreState, id: LocationId) -> StoreResult<(String, Address)> {
        match self.handle(state, id) {
            Some(Handle::Object { file, address }) => Ok((file, address)),
            _ => Err(StoreError::InvalidLocation(id)),
        }
    }

    fn register_handle(&self, handle: Handle) -> LocationId {
        let mut state = self.state.write().expect("lock poisoned");
        self.prune_handles(&mut state);
        let id = self.registry.register();
        state.handles.insert(id, handle);
        id
    }

    /// Forget handles whose identifiers the registry has closed. The last
    /// unit on a handle may be released straight through the registry, so
    /// the store cannot rely on [`Store::close`] seeing the count reach zero.
    fn prune_handles(&self, state: &mut StoreState) {
        let before = state.handles.len();
        state.handles.retain(|id, _| self.registry.is_valid(*id));
        let pruned = before - state.handles.len();
        if pruned > 0 {
            debug!(pruned, "closed handles forgotten");
        }
    }

    /// Number of open handles.
    pub fn handle_count(&self) -> usize {
        let mut state = self.state.write().expect("lock poisoned");
        self.prune_handles(&mut state);
        state.handles.len()
    }
}

impl Store for InMemoryStore {
    fn is_location(&self, loc: LocationId) -> bool {
        let state = self.state.read().expect("lock poisoned");
        matches!(self.handle(&state, loc), Some(Handle::Object { .. }))
    }

    fn locate(&self, loc: LocationId, path: &str) -> StoreResult<Address> {
        let state = self.state.read().expect("lock poisoned");
        let (file, base) = self.object_handle(&state, loc)?;
        let image = container(&state, &file)?;
        let base_path = &image.entry(base)?.path;
        image.lookup(&normalize(Some(base_path.as_str()), path))
    }

    fn open_by_address(
        &self,
        loc: LocationId,
        address: Address,
        access: &AccessOptions,
    ) -> StoreResult<OpenedObject> {
        let (file, object_type) = {
            let state = self.state.read().expect("lock poisoned");
            let file = match self.handle(&state, loc) {
                Some(handle) => handle.file().to_string(),
                None => return Err(StoreError::InvalidLocation(loc)),
            };
            let image = container(&state, &file)?;
            image.check_access(access)?;
            (file, image.entry(address)?.object_type)
        };
        let id = self.register_handle(Handle::Object { file, address });
        Ok(OpenedObject {
            id,
            address,
            object_type,
        })
    }

    fn open_by_external_path(
        &self,
        filename: &str,
        pathname: &str,
        access: &AccessOptions,
    ) -> StoreResult<OpenedObject> {
        let (address, object_type) = {
            let state = self.state.read().expect("lock poisoned");
            let image = container(&state, filename)?;
            image.check_access(access)?;
            let address = image.lookup(&normalize(None, pathname))?;
            (address, image.entry(address)?.object_type)
        };
        let id = self.register_handle(Handle::Object {
            file: filename.to_string(),
            address,
        });
        Ok(OpenedObject {
            id,
            address,
            object_type,
        })
    }

    fn open_attribute(
        &self,
        object: LocationId,
        name: &str,
        access: &AccessOptions,
    ) -> StoreResult<OpenedAttribute> {
        let (file, owner) = {
            let state = self.state.read().expect("lock poisoned");
            let (file, owner) = self.object_handle(&state, object)?;
            let image = container(&state, &file)?;
            image.check_access(access)?;
            let entry = image.entry(owner)?;
            if !entry.attributes.contains(name) {
                return Err(StoreError::NotFound(format!(
                    "attribute {name} on {}",
                    entry.path
                )));
            }
            (file, owner)
        };
        let id = self.register_handle(Handle::Attribute { file });
        Ok(OpenedAttribute {
            id,
            owner,
            name: name.to_string(),
        })
    }

    fn dataspace(&self, dataset: LocationId) -> StoreResult<Dataspace> {
        let state = self.state.read().expect("lock poisoned");
        let (file, address) = self.object_handle(&state, dataset)?;
        let entry = container(&state, &file)?.entry(address)?;
        entry.dataspace.clone().ok_or(StoreError::WrongObjectType {
            expected: ObjectType::Dataset,
            actual: entry.object_type,
        })
    }

    fn object_type(&self, loc: LocationId, address: Address) -> StoreResult<ObjectType> {
        let state = self.state.read().expect("lock poisoned");
        let (file, _) = self.object_handle(&state, loc)?;
        Ok(container(&state, &file)?.entry(address)?.object_type)
    }

    fn object_name(&self, loc: LocationId, address: Address) -> StoreResult<Option<String>> {
        let state = self.state.read().expect("lock poisoned");
        let (file, _) = self.object_handle(&state, loc)?;
        Ok(Some(container(&state, &file)?.entry(address)?.path.clone()))
    }

    fn close(&self, id: LocationId) -> StoreResult<()> {
        self.registry.dec_ref(id)?;
        let mut state = self.state.write().expect("lock poisoned");
        self.prune_handles(&mut state);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().expect("lock poisoned");
        f.debug_struct("InMemoryStore")
            .field("containers", &state.files.len())
            .field(
                "handles",
                &state
                    .handles
                    .keys()
                    .filter(|id| self.registry.is_valid(**id))
                    .count(),
            )
            .finish()
    }
}

fn container<'a>(state: &'a StoreState, filename: &str) -> StoreResult<&'a ContainerImage> {
    state
        .files
        .get(filename)
        .ok_or_else(|| StoreError::NotFound(format!("container {filename}")))
}

fn container_mut<'a>(
    state: &'a mut StoreState,
    filename: &str,
) -> StoreResult<&'a mut ContainerImage> {
    state
        .files
        .get_mut(filename)
        .ok_or_else(|| StoreError::NotFound(format!("container {filename}")))
}

/// Canonical absolute form of `path`, resolved against `base` when relative.
fn normalize(base: Option<&str>, path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if !path.starts_with('/') {
        if let Some(base) = base {
            parts.extend(base.split('/').filter(|p| !p.is_empty()));
        }
    }
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &path[..i],
    }
}
