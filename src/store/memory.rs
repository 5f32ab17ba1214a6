//! In-process window store.

use dashmap::DashMap;

use crate::identity::RateKey;
use crate::limiter::AdmissionDecision;
use crate::policy::EndpointCategory;
use crate::store::{StoreError, WindowEntry, WindowStore};

/// Window store backed by a sharded concurrent map.
///
/// `get_or_create` runs the update while holding the shard write lock for the
/// key, which serializes concurrent checks of the same identity and keeps
/// `prune` from removing an entry mid-update.
#[derive(Debug, Default)]
pub struct MemoryWindowStore {
    records: DashMap<(RateKey, EndpointCategory), WindowEntry>,
}

impl MemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &RateKey, category: EndpointCategory) -> bool {
        self.records.contains_key(&(key.clone(), category))
    }
}

impl WindowStore for MemoryWindowStore {
    fn get_or_create(
        &self,
        key: &RateKey,
        category: EndpointCategory,
        update: &mut dyn FnMut(&mut WindowEntry) -> AdmissionDecision,
    ) -> Result<AdmissionDecision, StoreError> {
        let mut entry = self.records.entry((key.clone(), category)).or_default();
        Ok(update(entry.value_mut()))
    }

    fn prune(&self, now_ms: u64) -> usize {
        let mut removed = 0;
        self.records.retain(|_, entry| {
            let keep = !entry.is_expired(now_ms);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
