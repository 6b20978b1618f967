// Copyright (c) 2026 cansleuth contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/cansleuth/cansleuth

//! Saved searches - named identifier sets reusable as scan filters

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::bus::MessageIdentifier;

/// Saved-search store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A search with this name already exists; the store is unchanged.
    #[error("a saved search named {0:?} already exists")]
    DuplicateName(String),

    /// Index past the end of the store; no state change.
    #[error("saved search index {index} out of range (store holds {len})")]
    OutOfRange {
        /// The requested index.
        index: usize,
        /// Number of entries in the store.
        len: usize,
    },
}

/// A named set of message identifiers captured at save time.
///
/// Immutable once created; there is no edit operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSearch {
    /// User-supplied name, unique within the store.
    pub name: String,
    /// The identifiers captured when the search was saved.
    pub identifiers: HashSet<MessageIdentifier>,
    /// When the search was saved.
    pub created_at: DateTime<Utc>,
}

/// Session-scoped registry of named identifier sets.
///
/// Entries are exposed in insertion order so a host can offer them as
/// numbered filter choices. Entries are never implicitly pruned; the only
/// removal is an unconditional [`clear`](Self::clear).
#[derive(Debug, Clone, Default)]
pub struct SavedSearchStore {
    entries: Vec<SavedSearch>,
}

impl SavedSearchStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new saved search.
    ///
    /// Fails with [`StoreError::DuplicateName`] if the name is taken,
    /// leaving existing entries untouched.
    pub fn save(
        &mut self,
        name: impl Into<String>,
        identifiers: HashSet<MessageIdentifier>,
    ) -> Result<(), StoreError> {
        let name = name.into();
        if self.entries.iter().any(|s| s.name == name) {
            return Err(StoreError::DuplicateName(name));
        }
        info!("Saved search {:?} with {} identifiers", name, identifiers.len());
        self.entries.push(SavedSearch {
            name,
            identifiers,
            created_at: Utc::now(),
        });
        Ok(())
    }

    /// Look up a saved search by insertion index.
    pub fn get(&self, index: usize) -> Result<&SavedSearch, StoreError> {
        self.entries.get(index).ok_or(StoreError::OutOfRange {
            index,
            len: self.entries.len(),
        })
    }

    /// Remove all entries unconditionally.
    pub fn clear(&mut self) {
        info!("Cleared {} saved searches", self.entries.len());
        self.entries.clear();
    }

    /// Number of saved searches.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|s| s.name.as_str()).collect()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &SavedSearch> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(pairs: &[(u32, u8)]) -> HashSet<MessageIdentifier> {
        pairs
            .iter()
            .map(|&(address, bus)| MessageIdentifier { address, bus })
            .collect()
    }

    #[test]
    fn test_save_and_get_in_order() {
        let mut store = SavedSearchStore::new();
        store.save("Search 1", ids(&[(0x100, 0), (0x200, 0)])).unwrap();
        store.save("Search 2", ids(&[(0x300, 1)])).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.names(), vec!["Search 1", "Search 2"]);
        assert_eq!(store.get(0).unwrap().identifiers.len(), 2);
        assert_eq!(store.get(1).unwrap().name, "Search 2");
    }

    #[test]
    fn test_duplicate_name_leaves_store_unchanged() {
        let mut store = SavedSearchStore::new();
        store.save("Search 1", ids(&[(0x100, 0)])).unwrap();

        let err = store.save("Search 1", ids(&[(0x999, 3)])).unwrap_err();
        assert_eq!(err, StoreError::DuplicateName("Search 1".to_string()));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0).unwrap().identifiers, ids(&[(0x100, 0)]));
    }

    #[test]
    fn test_get_out_of_range() {
        let store = SavedSearchStore::new();
        let err = store.get(0).unwrap_err();
        assert_eq!(err, StoreError::OutOfRange { index: 0, len: 0 });
    }

    #[test]
    fn test_clear() {
        let mut store = SavedSearchStore::new();
        store.save("Search 1", ids(&[(0x100, 0)])).unwrap();
        store.clear();
        assert!(store.is_empty());

        // names are reusable after a clear
        store.save("Search 1", ids(&[(0x200, 0)])).unwrap();
        assert_eq!(store.len(), 1);
    }
}
