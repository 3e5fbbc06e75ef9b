//! Key and expiry indices for parked entries.
//!
//! Both indices live in one unbounded [`LruCache`]: its hash map is the key
//! index and its linked list is the expiry index. Every entry has the same
//! lifetime, so insertion order is expiry order. Lookups use `peek` so the
//! list is never reordered after insertion.

use std::time::Instant;

use lru::LruCache;

use crate::entry::StateEntry;
use crate::key::StateKey;

/// Membership index over parked entries.
pub(crate) struct StateIndex {
    entries: LruCache<StateKey, StateEntry>,
}

impl StateIndex {
    pub fn new() -> Self {
        Self {
            entries: LruCache::unbounded(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, key: &StateKey) -> bool {
        self.entries.contains(key)
    }

    /// Link an entry at the tail of the expiry order.
    ///
    /// A key that is already present is refused and the entry handed back.
    pub fn insert(&mut self, entry: StateEntry) -> Result<(), StateEntry> {
        if self.entries.contains(&entry.key) {
            return Err(entry);
        }
        self.entries.push(entry.key, entry);
        Ok(())
    }

    pub fn get(&self, key: &StateKey) -> Option<&StateEntry> {
        self.entries.peek(key)
    }

    pub fn get_mut(&mut self, key: &StateKey) -> Option<&mut StateEntry> {
        self.entries.peek_mut(key)
    }

    /// Unlink an entry from both indices.
    pub fn remove(&mut self, key: &StateKey) -> Option<StateEntry> {
        self.entries.pop(key)
    }

    /// Unlink the expired prefix of the expiry order.
    ///
    /// Walks from the head, stepping over `skip`, and stops at the first
    /// entry that has not expired. Returns the unlinked entries oldest
    /// first.
    pub fn drain_expired(&mut self, now: Instant, skip: Option<&StateKey>) -> Vec<StateEntry> {
        let expired: Vec<StateKey> = self
            .entries
            .iter()
            .rev()
            .filter(|(key, _)| Some(*key) != skip)
            .take_while(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| *key)
            .collect();

        expired
            .iter()
            .filter_map(|key| self.entries.pop(key))
            .collect()
    }

    /// Unlink the entry at the head of the expiry order.
    pub fn pop_oldest(&mut self) -> Option<StateEntry> {
        self.entries.pop_lru().map(|(_, entry)| entry)
    }

    /// Entry ids from head to tail of the expiry order.
    #[cfg(test)]
    pub fn ids_in_expiry_order(&self) -> Vec<u64> {
        self.entries.iter().rev().map(|(_, e)| e.id).collect()
    }
}
