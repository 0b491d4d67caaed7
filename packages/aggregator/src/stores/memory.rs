//! In-memory seen-set storage for testing and single-process use.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{DedupResult, DedupStateError};
use crate::traits::seen_store::SeenStore;
use crate::types::seen::{RecipientId, SeenEntry, SeenSet};

/// Seen-sets held in process memory.
///
/// Lost on restart, so every posting becomes "new" again after one.
#[derive(Default)]
pub struct MemorySeenStore {
    sets: RwLock<HashMap<RecipientId, SeenSet>>,
}

impl MemorySeenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recipients with a stored set.
    pub fn recipient_count(&self) -> DedupResult<usize> {
        Ok(self.read()?.len())
    }

    /// Remove every recipient's set.
    pub fn clear(&self) -> DedupResult<()> {
        self.write()?.clear();
        Ok(())
    }

    fn read(&self) -> DedupResult<RwLockReadGuard<'_, HashMap<RecipientId, SeenSet>>> {
        self.sets.read().map_err(|e| DedupStateError::Storage(e.to_string().into()))
    }

    fn write(&self) -> DedupResult<RwLockWriteGuard<'_, HashMap<RecipientId, SeenSet>>> {
        self.sets.write().map_err(|e| DedupStateError::Storage(e.to_string().into()))
    }
}

#[async_trait]
impl SeenStore for MemorySeenStore {
    async fn load(&self, recipient: &RecipientId) -> DedupResult<SeenSet> {
        Ok(self.read()?.get(recipient).cloned().unwrap_or_default())
    }

    async fn record(&self, recipient: &RecipientId, entries: &[SeenEntry]) -> DedupResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut sets = self.write()?;
        let set = sets.entry(recipient.clone()).or_default();
        for entry in entries {
            set.insert(entry.key.clone(), entry.seen_at);
        }
        Ok(())
    }

    async fn prune(&self, recipient: &RecipientId, cutoff: DateTime<Utc>) -> DedupResult<usize> {
        Ok(self
            .write()?
            .get_mut(recipient)
            .map(|set| set.prune(cutoff))
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::job::IdentityKey;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
    }

    fn entry(key: &str, hour: u32) -> SeenEntry {
        SeenEntry {
            key: IdentityKey::from_stored(key),
            seen_at: at(hour),
        }
    }

    #[tokio::test]
    async fn test_unknown_recipient_loads_empty() {
        let store = MemorySeenStore::new();
        assert!(store.load(&RecipientId::new("nobody")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_keeps_first_timestamp() {
        let store = MemorySeenStore::new();
        let r = RecipientId::new("alice");

        store.record(&r, &[entry("a", 1)]).await.unwrap();
        store.record(&r, &[entry("a", 5), entry("b", 5)]).await.unwrap();

        let set = store.load(&r).await.unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.seen_at(&IdentityKey::from_stored("a")), Some(at(1)));
    }

    #[tokio::test]
    async fn test_prune_is_per_recipient() {
        let store = MemorySeenStore::new();
        let alice = RecipientId::new("alice");
        let bob = RecipientId::new("bob");
        store.record(&alice, &[entry("a", 1), entry("b", 8)]).await.unwrap();
        store.record(&bob, &[entry("a", 1)]).await.unwrap();

        let pruned = store.prune(&alice, at(1) + Duration::hours(1)).await.unwrap();

        assert_eq!(pruned, 1);
        assert_eq!(store.load(&alice).await.unwrap().len(), 1);
        assert_eq!(store.load(&bob).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_record_creates_nothing() {
        let store = MemorySeenStore::new();
        store.record(&RecipientId::global(), &[]).await.unwrap();
        assert_eq!(store.recipient_count().unwrap(), 0);
    }
}
