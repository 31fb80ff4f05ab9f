use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use h5r_types::LocationId;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::IdRegistry;

/// In-memory identifier registry.
///
/// Identifiers are issued from a monotonically increasing counter and never
/// reused. Counts live in a `HashMap` behind a `Mutex`, so every increment
/// and decrement is atomic with respect to the others.
#[derive(Debug)]
pub struct InMemoryRegistry {
    counts: Mutex<HashMap<LocationId, u64>>,
    next_id: AtomicU64,
}

impl InMemoryRegistry {
    /// Create an empty registry. The first identifier issued is 1.
    pub fn new() -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Issue a fresh identifier holding one unit.
    pub fn register(&self) -> LocationId {
        let id = LocationId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.counts.lock().expect("lock poisoned").insert(id, 1);
        debug!(%id, "identifier registered");
        id
    }

    /// Number of live identifiers.
    pub fn len(&self) -> usize {
        self.counts.lock().expect("lock poisoned").len()
    }

    /// Returns `true` if no identifier is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IdRegistry for InMemoryRegistry {
    fn inc_ref(&self, id: LocationId) -> StoreResult<u64> {
        let mut counts = self.counts.lock().expect("lock poisoned");
        let count = counts.get_mut(&id).ok_or(StoreError::UnknownId(id))?;
        *count += 1;
        Ok(*count)
    }

    fn dec_ref(&self, id: LocationId) -> StoreResult<u64> {
        let mut counts = self.counts.lock().expect("lock poisoned");
        let count = counts.get_mut(&id).ok_or(StoreError::UnknownId(id))?;
        *count -= 1;
        let remaining = *count;
        if remaining == 0 {
            counts.remove(&id);
            debug!(%id, "identifier closed");
        }
        Ok(remaining)
    }

    fn ref_count(&self, id: LocationId) -> Option<u64> {
        self.counts.lock().expect("lock poisoned").get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_starts_at_one_unit() {
        let reg = InMemoryRegistry::new();
        let id = reg.register();
        assert_eq!(reg.ref_count(id), Some(1));
        assert!(reg.is_valid(id));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn ids_are_not_reused() {
        let reg = InMemoryRegistry::new();
        let a = reg.register();
        reg.dec_ref(a).unwrap();
        let b = reg.register();
        assert_ne!(a, b);
    }

    #[test]
    fn inc_then_dec_restores_count() {
        let reg = InMemoryRegistry::new();
        let id = reg.register();
        assert_eq!(reg.inc_ref(id).unwrap(), 2);
        assert_eq!(reg.inc_ref(id).unwrap(), 3);
        assert_eq!(reg.dec_ref(id).unwrap(), 2);
        assert_eq!(reg.dec_ref(id).unwrap(), 1);
        assert_eq!(reg.ref_count(id), Some(1));
    }

    #[test]
    fn last_dec_closes() {
        let reg = InMemoryRegistry::new();
        let id = reg.register();
        assert_eq!(reg.dec_ref(id).unwrap(), 0);
        assert!(!reg.is_valid(id));
        assert!(reg.is_empty());
    }

    #[test]
    fn unknown_id_errors() {
        let reg = InMemoryRegistry::new();
        let id = LocationId::new(99);
        assert!(matches!(reg.inc_ref(id), Err(StoreError::UnknownId(_))));
        assert!(matches!(reg.dec_ref(id), Err(StoreError::UnknownId(_))));
        assert_eq!(reg.ref_count(id), None);
    }
}
