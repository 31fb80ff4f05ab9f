//! Collaborator interfaces for container references.
//!
//! The reference subsystem never touches container storage directly. It
//! talks to three collaborators, each defined here as a trait:
//!
//! - [`Store`] — locates paths, opens objects and attributes by address or
//!   by external path, and reports object metadata
//! - [`SelectionCodec`] — turns a [`Dataspace`](h5r_types::Dataspace)
//!   selection into opaque bytes and back
//! - [`IdRegistry`] — reference-counts open identifiers so a container
//!   stays open while references depend on it
//!
//! # Backends
//!
//! - [`InMemoryStore`] — named container images held in memory
//! - [`InMemoryRegistry`] — `HashMap`-based refcounting registry
//! - [`BincodeSelectionCodec`] — bincode encoding of dataspaces
//!
//! # Design Rules
//!
//! 1. Every opened identifier is issued by the registry with one unit held
//!    by the opener.
//! 2. An identifier whose count drops to zero is closed; the store treats
//!    it as invalid from then on.
//! 3. All failures are reported as [`StoreError`], never panics.

pub mod error;
pub mod memory;
pub mod registry;
pub mod selection;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryStore, OpenedAttribute, OpenedObject, ROOT_ADDRESS};
pub use registry::InMemoryRegistry;
pub use selection::BincodeSelectionCodec;
pub use traits::{IdRegistry, SelectionCodec, Store};
