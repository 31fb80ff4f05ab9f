use std::sync::Arc;

use h5r_store::{BincodeSelectionCodec, IdRegistry, InMemoryStore, SelectionCodec, Store};
use h5r_types::LocationId;
use tracing::warn;

use crate::config::RefConfig;
use crate::error::{RefError, RefResult};
use crate::reference::Reference;
use crate::wire;

/// Entry point for creating, decoding, and resolving references.
///
/// Holds the three collaborators the subsystem needs: the container store,
/// the selection codec for region references, and the identifier registry
/// that bound references hold units on. The registry must be the one the
/// store issues identifiers through.
pub struct RefContext {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) selections: Arc<dyn SelectionCodec>,
    pub(crate) registry: Arc<dyn IdRegistry>,
    config: RefConfig,
}

impl RefContext {
    pub fn new(
        store: Arc<dyn Store>,
        selections: Arc<dyn SelectionCodec>,
        registry: Arc<dyn IdRegistry>,
    ) -> Self {
        Self {
            store,
            selections,
            registry,
            config: RefConfig::default(),
        }
    }

    /// Context over an [`InMemoryStore`], its registry, and the bincode
    /// selection codec.
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        let registry = Arc::clone(store.registry());
        Self::new(store, Arc::new(BincodeSelectionCodec::new()), registry)
    }

    pub fn with_config(mut self, config: RefConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RefConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<dyn IdRegistry> {
        &self.registry
    }

    /// Bind `reference` to the open location `loc`.
    pub fn bind_location(&self, reference: &mut Reference, loc: LocationId) -> RefResult<()> {
        self.check_location(loc)?;
        reference.bind(Arc::clone(&self.registry), loc)
    }

    /// Decode one reference using the configured payload ceiling.
    pub fn decode(&self, bytes: &[u8]) -> RefResult<(Reference, usize)> {
        wire::decode_with_limit(bytes, self.config.max_decode_payload)
    }

    /// Decode a contiguous sequence of references.
    pub fn decode_all(&self, bytes: &[u8]) -> RefResult<Vec<Reference>> {
        wire::decode_all_with_limit(bytes, self.config.max_decode_payload)
    }

    pub(crate) fn check_location(&self, loc: LocationId) -> RefResult<()> {
        if !self.store.is_location(loc) {
            return Err(RefError::InvalidLocation(loc));
        }
        Ok(())
    }

    /// Close a handle this crate opened, logging instead of failing.
    pub(crate) fn close_quietly(&self, id: LocationId) {
        if let Err(e) = self.store.close(id) {
            warn!(%id, error = %e, "failed to close handle");
        }
    }
}

impl std::fmt::Debug for RefContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
