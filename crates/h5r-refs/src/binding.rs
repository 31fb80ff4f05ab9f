//! Refcount tokens tying a reference to an open location.
//!
//! A [`LocationBinding`] owns exactly one refcount unit on a location
//! identifier. The unit is acquired when the binding is created and
//! released exactly once: explicitly through [`LocationBinding::release`],
//! or on drop.

use std::fmt;
use std::sync::Arc;

use h5r_store::IdRegistry;
use h5r_types::LocationId;
use tracing::{debug, warn};

use crate::error::{RefError, RefResult};

/// One refcount unit held on a location identifier.
pub struct LocationBinding {
    id: LocationId,
    registry: Option<Arc<dyn IdRegistry>>,
}

impl LocationBinding {
    /// Acquire a unit on `id`.
    pub fn acquire(registry: Arc<dyn IdRegistry>, id: LocationId) -> RefResult<Self> {
        let count = registry
            .inc_ref(id)
            .map_err(|e| RefError::Registry(format!("incrementing {id} failed: {e}")))?;
        debug!(%id, count, "location bound");
        Ok(Self {
            id,
            registry: Some(registry),
        })
    }

    /// The bound identifier.
    pub fn id(&self) -> LocationId {
        self.id
    }

    /// Acquire a second, independent unit on the same identifier.
    pub fn duplicate(&self) -> RefResult<Self> {
        match &self.registry {
            Some(registry) => Self::acquire(Arc::clone(registry), self.id),
            None => Err(RefError::Registry(format!("binding to {} already released", self.id))),
        }
    }

    /// Release the unit, reporting a registry failure.
    pub fn release(mut self) -> RefResult<()> {
        self.release_unit()
    }

    fn release_unit(&mut self) -> RefResult<()> {
        if let Some(registry) = self.registry.take() {
            let remaining = registry
                .dec_ref(self.id)
                .map_err(|e| RefError::Registry(format!("decrementing {} failed: {e}", self.id)))?;
            debug!(id = %self.id, remaining, "location released");
        }
        Ok(())
    }
}

impl Drop for LocationBinding {
    fn drop(&mut self) {
        if let Err(e) = self.release_unit() {
            warn!(id = %self.id, error = %e, "failed to release location unit");
        }
    }
}

impl fmt::Debug for LocationBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationBinding")
            .field("id", &self.id)
            .field("held", &self.registry.is_some())
            .finish()
    }
}
