//! Parked conversation state.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::handoff::Slot;
use crate::key::StateKey;
use crate::request::{RequestId, StateScope};
use crate::request_data::RequestData;

/// Everything a conversation carries between rounds.
#[derive(Debug, Default)]
pub struct EntryPayload {
    /// Session-state attributes and the scope that owns them.
    pub scope: StateScope,

    /// Persistable request data.
    pub data: RequestData,
}

impl EntryPayload {
    pub fn new(scope: StateScope, data: RequestData) -> Self {
        Self { scope, data }
    }
}

/// A parked conversation, owned by the store's index.
#[derive(Debug)]
pub(crate) struct StateEntry {
    pub(crate) id: u64,

    /// Key as stored in the index, i.e. already scoped to its server.
    pub(crate) key: StateKey,
    pub(crate) seq_start: u64,
    pub(crate) expiry: Instant,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) tries: u32,
    pub(crate) payload: Slot<EntryPayload>,

    /// Request that last pulled the payload out.
    pub(crate) claimed_by: Option<RequestId>,
}

impl StateEntry {
    pub(crate) fn new(
        key: StateKey,
        tries: u32,
        seq_start: u64,
        expiry: Instant,
        payload: EntryPayload,
    ) -> Self {
        Self {
            id: 0,
            key,
            seq_start,
            expiry,
            created_at: Utc::now(),
            tries,
            payload: Slot::with(payload),
            claimed_by: None,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expiry < now
    }

    /// Whether the entry still owns persisted data records.
    pub(crate) fn has_persisted_data(&self) -> bool {
        self.payload.get().is_some_and(|p| !p.data.is_empty())
    }

    pub(crate) fn info(&self, now: Instant) -> EntryInfo {
        EntryInfo {
            id: self.id,
            key: self.key,
            tries: self.tries,
            seq_start: self.seq_start,
            created_at: self.created_at,
            expires_in: self.expiry.saturating_duration_since(now),
            claimed_by: self.claimed_by,
            holds_payload: self.payload.is_occupied(),
        }
    }
}

impl Drop for StateEntry {
    fn drop(&mut self) {
        if let Some(payload) = self.payload.get() {
            debug_assert!(
                payload.data.all_persistable(),
                "state entry {} owns non-persistable data",
                self.id
            );
        }
        trace!(entry_id = self.id, "State entry freed");
    }
}

/// Point-in-time view of an entry, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub id: u64,

    /// Key as stored, already scoped to the owning server.
    pub key: StateKey,
    pub tries: u32,
    pub seq_start: u64,
    pub created_at: DateTime<Utc>,
    pub expires_in: Duration,
    pub claimed_by: Option<RequestId>,
    pub holds_payload: bool,
}
