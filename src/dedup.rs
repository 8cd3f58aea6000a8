//! Set of every record key seen since the server started.
//!
//! [`DedupStore::insert`] is the single point of truth for "seen before": it
//! checks and inserts under one exclusive lock, so two sessions racing on
//! the same key get exactly one `true` between them. [`DedupStore::contains`]
//! only takes the shared lock and never mutates.
//!
//! The store only grows; nothing is ever removed.
//!
//! ```rust
//! use numeri::dedup::DedupStore;
//! use numeri::protocol::RecordKey;
//!
//! let store = DedupStore::new();
//! let key = RecordKey::try_from("000000042").unwrap();
//!
//! assert!(store.insert(key));
//! assert!(!store.insert(key));
//! assert!(store.contains(&key));
//! assert_eq!(store.len(), 1);
//! ```

use std::collections::HashSet;

use parking_lot::RwLock;

use crate::protocol::RecordKey;

/// Concurrent, grow-only set of [`RecordKey`]s.
#[derive(Debug, Default)]
pub struct DedupStore {
    seen: RwLock<HashSet<RecordKey>>,
}

impl DedupStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with room for `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seen: RwLock::new(HashSet::with_capacity(capacity)),
        }
    }

    /// Returns `true` if the key has been inserted before.
    pub fn contains(&self, key: &RecordKey) -> bool {
        self.seen.read().contains(key)
    }

    /// Inserts the key if absent.
    ///
    /// Returns `true` when this call inserted it, `false` when it was
    /// already present. The check and the insertion happen under the same
    /// write lock.
    pub fn insert(&self, key: RecordKey) -> bool {
        self.seen.write().insert(key)
    }

    /// Number of distinct keys seen.
    pub fn len(&self) -> usize {
        self.seen.read().len()
    }

    /// Returns `true` if no key has been inserted yet.
    pub fn is_empty(&self) -> bool {
        self.seen.read().is_empty()
    }
}
