//! Seen-set: identity keys already surfaced to a recipient.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::job::IdentityKey;

/// Who a seen-set belongs to: a user, or the global feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientId(String);

impl RecipientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Shared feed not tied to any user.
    pub fn global() -> Self {
        Self("global".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A key and when it was first recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenEntry {
    pub key: IdentityKey,
    pub seen_at: DateTime<Utc>,
}

/// In-memory view of one recipient's seen keys.
///
/// Grows monotonically except through [`SeenSet::prune`]. Pruned keys may
/// be surfaced again later; that re-notification is accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeenSet {
    entries: HashMap<IdentityKey, DateTime<Utc>>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Record a key. Keeps the original timestamp if already present.
    /// Returns true when the key was new.
    pub fn insert(&mut self, key: IdentityKey, seen_at: DateTime<Utc>) -> bool {
        use std::collections::hash_map::Entry;
        match self.entries.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(seen_at);
                true
            }
        }
    }

    pub fn seen_at(&self, key: &IdentityKey) -> Option<DateTime<Utc>> {
        self.entries.get(key).copied()
    }

    /// Drop entries recorded strictly before `cutoff`. Returns how many were dropped.
    pub fn prune(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, seen_at| *seen_at >= cutoff);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by key, for stable persistence and comparison.
    pub fn entries(&self) -> Vec<SeenEntry> {
        let mut entries: Vec<SeenEntry> = self
            .entries
            .iter()
            .map(|(key, seen_at)| SeenEntry {
                key: key.clone(),
                seen_at: *seen_at,
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }
}

impl FromIterator<SeenEntry> for SeenSet {
    fn from_iter<T: IntoIterator<Item = SeenEntry>>(iter: T) -> Self {
        let mut set = SeenSet::new();
        for entry in iter {
            set.insert(entry.key, entry.seen_at);
        }
        set
    }
}
