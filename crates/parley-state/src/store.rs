//! The state store: parked conversations keyed by token.
//!
//! Entries are created or refreshed at the end of each round and looked up
//! at the start of the next. Expired entries are cleaned up lazily, from the
//! head of the expiry order, on every create or refresh.
//!
//! The store's lock covers index membership, the counters and the swap of
//! payload ownership. Entries are always freed after the lock is released,
//! since dropping persisted data runs arbitrary destructors.

use std::sync::Arc;

use tracing::{debug, error, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::StateConfig;
use crate::entry::{EntryInfo, EntryPayload, StateEntry};
use crate::error::{Error, Result};
use crate::index::StateIndex;
use crate::key::{KEY_LEN, ServerHash, StateKey};
use crate::lock::{StoreLock, ThreadSafe};
use crate::pairs::{Attribute, Message};
use crate::request::RequestId;

/// State protected by the store lock.
struct StoreInner {
    index: StateIndex,

    /// Next id to assign. Doubles as the count of entries created.
    next_id: u64,

    /// Entries cleaned up because they expired.
    timed_out: u64,
}

/// Result of a successful create or refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTicket {
    pub entry_id: u64,

    /// Token as sent to the client.
    pub token: StateKey,

    /// Earlier rounds in this conversation.
    pub tries: u32,

    /// Whether the token attribute was appended to the reply.
    pub appended: bool,
}

/// A refused create, handing the payload back to the caller.
#[derive(Debug)]
pub struct Rejected {
    pub error: Error,
    pub payload: EntryPayload,
}

/// Payload pulled out of an entry by a claiming request.
#[derive(Debug)]
pub(crate) struct Claimed {
    pub entry_id: u64,
    pub seq_start: u64,
    pub payload: EntryPayload,
}

/// Store statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateStats {
    /// Entries created over the store's lifetime.
    pub created: u64,

    /// Entries cleaned up because they expired.
    pub timed_out: u64,

    /// Entries currently tracked.
    pub tracked: usize,

    /// Maximum number of tracked entries.
    pub capacity: usize,
}

/// Snapshot of the entry being refreshed, taken under the lock.
#[derive(Clone, Copy)]
struct Previous {
    key: StateKey,
    tries: u32,
}

/// Conversation state store for one listening context.
///
/// `L` selects the lock: [`ThreadSafe`] for stores shared by worker
/// threads, [`SingleThreaded`](crate::SingleThreaded) otherwise.
pub struct StateStore<L: StoreLock = ThreadSafe> {
    inner: L::Lock<StoreInner>,
    config: StateConfig,
    clock: Arc<dyn Clock>,
}

impl<L: StoreLock> StateStore<L> {
    /// Create a store using the system clock.
    pub fn new(config: StateConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a store with an explicit time source.
    pub fn with_clock(config: StateConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        if config.thread_safe != L::THREAD_SAFE {
            return Err(Error::Config(format!(
                "thread_safe = {} does not match the store's lock type",
                config.thread_safe
            )));
        }

        debug!(
            max_sessions = config.max_sessions,
            timeout_secs = config.timeout_secs,
            server_id = config.server_id,
            thread_safe = config.thread_safe,
            "State store created"
        );

        Ok(Self {
            inner: L::new(StoreInner {
                index: StateIndex::new(),
                next_id: 0,
                timed_out: 0,
            }),
            config,
            clock,
        })
    }

    fn lock(&self) -> L::Guard<'_, StoreInner> {
        L::lock::<StoreInner>(&self.inner)
    }

    pub fn config(&self) -> &StateConfig {
        &self.config
    }

    /// Name of the attribute carrying the token.
    pub fn token_attribute(&self) -> &str {
        &self.config.token_attribute
    }

    /// Compute the index key for a token value received by `server`.
    pub fn lookup_key(token: &[u8], server: ServerHash) -> StateKey {
        StateKey::fold(token).scoped(server)
    }

    /// Look up the entry a token refers to, as seen from `server`.
    ///
    /// Only exact matches are found. A token minted by another virtual
    /// server never matches.
    pub fn find(&self, token: &[u8], server: ServerHash) -> Option<EntryInfo> {
        let key = Self::lookup_key(token, server);
        let now = self.clock.now();
        let inner = self.lock();
        inner.index.get(&key).map(|entry| entry.info(now))
    }

    /// Create a new entry, or refresh the one stored under `existing`.
    ///
    /// `existing` is the stored key of the entry being refreshed, as
    /// reported by [`find`](Self::find). If it has vanished in the meantime
    /// the call is treated as a brand-new conversation.
    ///
    /// When `reply` already carries a token attribute, the key is derived
    /// from it. Otherwise a token is minted and appended to `reply`.
    ///
    /// On failure the payload is handed back untouched. Expired entries
    /// cleaned up during the call stay cleaned up either way.
    pub fn create_or_refresh(
        &self,
        existing: Option<StateKey>,
        reply: &mut Message,
        server: ServerHash,
        seq_start: u64,
        payload: EntryPayload,
    ) -> std::result::Result<StateTicket, Rejected> {
        let now = self.clock.now();
        let Some(expiry) = now.checked_add(self.config.timeout()) else {
            error!(
                timeout_secs = self.config.timeout_secs,
                "Failed inserting state entry - expiry out of range"
            );
            return Err(Rejected {
                error: Error::Config(format!(
                    "timeout_secs = {} is out of range",
                    self.config.timeout_secs
                )),
                payload,
            });
        };
        let mut to_free: Vec<StateEntry> = Vec::new();

        let (previous, timed_out, too_many) = {
            let mut inner = self.lock();
            let existing = existing.filter(|key| inner.index.contains(key));

            let expired = inner.index.drain_expired(now, existing.as_ref());
            let timed_out = expired.len();
            inner.timed_out += timed_out as u64;
            to_free.extend(expired);

            let too_many = existing.is_none() && inner.index.len() >= self.config.max_sessions;

            let mut previous = None;
            if let Some(key) = existing {
                let mut consumed = false;
                if let Some(old) = inner.index.get(&key) {
                    previous = Some(Previous {
                        key: old.key,
                        tries: old.tries,
                    });
                    consumed = !old.has_persisted_data();
                }
                if consumed {
                    to_free.extend(inner.index.remove(&key));
                }
            }

            (previous, timed_out, too_many)
        };

        if timed_out > 0 {
            warn!(count = timed_out, "Cleaning up timed out state entries");
        }
        free_entries(to_free);

        if too_many {
            error!(
                max_sessions = self.config.max_sessions,
                "Failed inserting state entry - at maximum ongoing session limit"
            );
            return Err(Rejected {
                error: Error::CapacityExceeded {
                    max_sessions: self.config.max_sessions,
                },
                payload,
            });
        }

        let tries = previous.map_or(0, |p| p.tries.saturating_add(1));
        let attr_name = self.config.token_attribute.as_str();

        let (token, appended) = match reply.find(attr_name) {
            Some(attr) => {
                if attr.value.len() > KEY_LEN {
                    warn!(
                        expected = KEY_LEN,
                        got = attr.value.len(),
                        "Token too long, folding it with MD5"
                    );
                }
                (StateKey::fold(&attr.value), false)
            }
            None => {
                let mut token = previous.map_or_else(StateKey::random, |p| p.key);
                token.stamp(tries, self.config.server_id);
                reply.add(Attribute::new(attr_name, token.as_bytes().to_vec()));
                (token, true)
            }
        };

        let mut entry = StateEntry::new(token.scoped(server), tries, seq_start, expiry, payload);

        let mut inner = self.lock();

        // Other creates may have filled the store while it was unlocked.
        if previous.is_none() && inner.index.len() >= self.config.max_sessions {
            drop(inner);
            error!(
                max_sessions = self.config.max_sessions,
                "Failed inserting state entry - at maximum ongoing session limit"
            );
            return Err(unwind(
                reply,
                appended.then_some(attr_name),
                entry,
                Error::CapacityExceeded {
                    max_sessions: self.config.max_sessions,
                },
            ));
        }

        entry.id = inner.next_id;
        match inner.index.insert(entry) {
            Ok(()) => {
                let entry_id = inner.next_id;
                inner.next_id += 1;
                drop(inner);

                debug!(
                    entry_id,
                    token = %token,
                    tries,
                    expires_in_secs = self.config.timeout_secs,
                    "State entry created"
                );

                Ok(StateTicket {
                    entry_id,
                    token,
                    tries,
                    appended,
                })
            }
            Err(refused) => {
                drop(inner);
                error!(token = %token, "Failed inserting state entry - duplicate key");
                Err(unwind(
                    reply,
                    appended.then_some(attr_name),
                    refused,
                    Error::DuplicateKey,
                ))
            }
        }
    }

    /// Pull the payload out of the entry `token` refers to.
    ///
    /// The entry stays in the index, marked as claimed by `request`, until
    /// the next create or discard. Returns `Ok(None)` if no entry matches
    /// or `request` already holds the payload.
    pub(crate) fn claim(
        &self,
        token: &[u8],
        server: ServerHash,
        request: RequestId,
    ) -> Result<Option<Claimed>> {
        let key = Self::lookup_key(token, server);
        let mut inner = self.lock();
        let Some(entry) = inner.index.get_mut(&key) else {
            return Ok(None);
        };

        match entry.claimed_by {
            Some(holder) if holder == request => Ok(None),
            Some(holder) => Err(Error::AlreadyClaimed {
                entry_id: entry.id,
                holder,
            }),
            None => {
                let Some(payload) = entry.payload.take() else {
                    return Ok(None);
                };
                entry.claimed_by = Some(request);
                Ok(Some(Claimed {
                    entry_id: entry.id,
                    seq_start: entry.seq_start,
                    payload,
                }))
            }
        }
    }

    /// Unlink and free the entry `token` refers to.
    ///
    /// Returns whether an entry was found. Discarding an unknown token is a
    /// no-op.
    pub fn discard(&self, token: &[u8], server: ServerHash) -> bool {
        let key = Self::lookup_key(token, server);
        let entry = self.lock().index.remove(&key);

        match entry {
            Some(entry) => {
                trace!(entry_id = entry.id, "State entry unlinked");
                drop(entry);
                true
            }
            None => false,
        }
    }

    /// Entries created over the store's lifetime.
    pub fn entries_created(&self) -> u64 {
        self.lock().next_id
    }

    /// Entries cleaned up because they expired.
    pub fn entries_timed_out(&self) -> u64 {
        self.lock().timed_out
    }

    /// Entries currently tracked.
    pub fn entries_tracked(&self) -> usize {
        self.lock().index.len()
    }

    /// Snapshot of all counters.
    pub fn stats(&self) -> StateStats {
        let inner = self.lock();
        StateStats {
            created: inner.next_id,
            timed_out: inner.timed_out,
            tracked: inner.index.len(),
            capacity: self.config.max_sessions,
        }
    }
}

impl<L: StoreLock> Drop for StateStore<L> {
    fn drop(&mut self) {
        let inner = L::get_mut::<StoreInner>(&mut self.inner);
        debug!(tracked = inner.index.len(), "Freeing state store");
        while let Some(entry) = inner.index.pop_oldest() {
            trace!(entry_id = entry.id, "State entry unlinked");
            drop(entry);
        }
    }
}

/// Undo a create that got as far as building its entry: strip the token we
/// appended and hand the payload back.
fn unwind(reply: &mut Message, appended: Option<&str>, mut entry: StateEntry, error: Error) -> Rejected {
    if let Some(name) = appended {
        reply.remove_all(name);
    }
    let payload = entry.payload.take().unwrap_or_default();
    Rejected { error, payload }
}

/// Free entries that have already been unlinked. Must run without the lock.
fn free_entries(entries: Vec<StateEntry>) {
    for entry in entries {
        trace!(entry_id = entry.id, "State entry unlinked");
        drop(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::lock::SingleThreaded;
    use std::sync::mpsc;
    use std::thread;
    use crate::request::StateScope;
    use crate::request_data::{DataKey, RequestData};
    use std::time::Duration;

    const DEFAULT: &str = "default";

    fn store(max: usize, timeout: u64) -> (StateStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let config = StateConfig::new()
            .with_max_sessions(max)
            .with_timeout_secs(timeout)
            .with_server_id(0x42);
        let store = StateStore::with_clock(config, clock.clone()).unwrap();
        (store, clock)
    }

    fn payload_with(attr: &str) -> EntryPayload {
        let mut scope = StateScope::new();
        scope.attrs_mut().push(Attribute::new(attr, vec![1]));
        EntryPayload::new(scope, RequestData::new())
    }

    fn create(store: &StateStore, existing: Option<StateKey>) -> StateTicket {
        let mut reply = Message::new();
        store
            .create_or_refresh(existing, &mut reply, ServerHash::of(DEFAULT), 1, payload_with("x"))
            .unwrap()
    }

    #[test]
    fn test_create_appends_token() {
        let (store, _clock) = store(10, 30);
        let mut reply = Message::new();
        let ticket = store
            .create_or_refresh(None, &mut reply, ServerHash::of(DEFAULT), 5, payload_with("a"))
            .unwrap();

        assert!(ticket.appended);
        assert_eq!(ticket.tries, 0);
        assert_eq!(ticket.token.round(), 1);
        assert_eq!(ticket.token.server_id(), 0x42);
        let attr = reply.find("State").unwrap();
        assert_eq!(attr.value.as_slice(), ticket.token.as_bytes());

        let info = store.find(&attr.value, ServerHash::of(DEFAULT)).unwrap();
        assert_eq!(info.id, ticket.entry_id);
        assert_eq!(info.seq_start, 5);
        assert!(info.holds_payload);
        assert_eq!(info.expires_in, Duration::from_secs(30));
        assert_eq!(store.entries_created(), 1);
        assert_eq!(store.entries_tracked(), 1);
    }

    #[test]
    fn test_other_server_cannot_find() {
        let (store, _clock) = store(10, 30);
        let ticket = create(&store, None);

        assert!(store.find(ticket.token.as_bytes(), ServerHash::of(DEFAULT)).is_some());
        assert!(store.find(ticket.token.as_bytes(), ServerHash::of("inner-tunnel")).is_none());
        assert!(!store.discard(ticket.token.as_bytes(), ServerHash::of("inner-tunnel")));
        assert_eq!(store.entries_tracked(), 1);
    }

    #[test]
    fn test_module_supplied_token() {
        let (store, _clock) = store(10, 30);
        let mut reply = Message::new();
        reply.add(Attribute::new("State", b"module-token".to_vec()));

        let ticket = store
            .create_or_refresh(None, &mut reply, ServerHash::of(DEFAULT), 1, payload_with("a"))
            .unwrap();

        assert!(!ticket.appended);
        assert_eq!(reply.len(), 1);
        assert_eq!(ticket.token, StateKey::fold(b"module-token"));
        assert!(store.find(b"module-token", ServerHash::of(DEFAULT)).is_some());
    }

    #[test]
    fn test_refresh_consumes_old_entry() {
        let (store, _clock) = store(10, 30);
        let first = create(&store, None);
        let existing = store
            .find(first.token.as_bytes(), ServerHash::of(DEFAULT))
            .map(|info| info.key);

        let second = create(&store, existing);
        assert_eq!(second.tries, 1);
        assert_eq!(second.token.round(), 2);
        assert_eq!(second.token.round_delta(), 2 ^ 1);
        assert_eq!(store.entries_tracked(), 1);
        assert_eq!(store.entries_created(), 2);
        assert!(store.find(first.token.as_bytes(), ServerHash::of(DEFAULT)).is_none());
        assert!(store.find(second.token.as_bytes(), ServerHash::of(DEFAULT)).is_some());
    }

    #[test]
    fn test_refresh_keeps_entry_with_persisted_data() {
        let (store, _clock) = store(10, 30);
        let mut data = RequestData::new();
        data.add(DataKey::new("eap", 0), 1u8, true);
        let mut reply = Message::new();
        let first = store
            .create_or_refresh(
                None,
                &mut reply,
                ServerHash::of(DEFAULT),
                1,
                EntryPayload::new(StateScope::new(), data),
            )
            .unwrap();
        let existing = store
            .find(first.token.as_bytes(), ServerHash::of(DEFAULT))
            .map(|info| info.key);

        create(&store, existing);
        assert_eq!(store.entries_tracked(), 2);
    }

    #[test]
    fn test_refresh_bypasses_capacity() {
        let (store, _clock) = store(1, 30);
        let first = create(&store, None);
        let existing = store
            .find(first.token.as_bytes(), ServerHash::of(DEFAULT))
            .map(|info| info.key);

        let mut reply = Message::new();
        let result = store.create_or_refresh(
            existing,
            &mut reply,
            ServerHash::of(DEFAULT),
            1,
            payload_with("b"),
        );
        assert!(result.is_ok());
        assert_eq!(store.entries_tracked(), 1);
    }

    #[test]
    fn test_capacity_exceeded_returns_payload() {
        let (store, _clock) = store(1, 30);
        create(&store, None);

        let mut reply = Message::new();
        let rejected = store
            .create_or_refresh(None, &mut reply, ServerHash::of(DEFAULT), 1, payload_with("kept"))
            .unwrap_err();

        assert!(matches!(
            rejected.error,
            Error::CapacityExceeded { max_sessions: 1 }
        ));
        assert_eq!(rejected.payload.scope.attrs()[0].name, "kept");
        assert!(reply.is_empty());
        assert_eq!(store.entries_tracked(), 1);
    }

    #[test]
    fn test_capacity_rechecked_after_unlocked_cleanup() {
        // Blocks in its destructor until released, holding the creating
        // thread between cleanup and insertion.
        struct Stall {
            entered: mpsc::Sender<()>,
            release: mpsc::Receiver<()>,
        }
        impl Drop for Stall {
            fn drop(&mut self) {
                let _ = self.entered.send(());
                let _ = self.release.recv();
            }
        }

        let (store, clock) = store(2, 30);
        let hash = ServerHash::of(DEFAULT);
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();

        let mut data = RequestData::new();
        data.add(
            DataKey::new("stall", 0),
            Stall {
                entered: entered_tx,
                release: release_rx,
            },
            true,
        );
        let mut reply = Message::new();
        store
            .create_or_refresh(None, &mut reply, hash, 1, EntryPayload::new(StateScope::new(), data))
            .unwrap();
        clock.advance(Duration::from_secs(31));

        thread::scope(|s| {
            let late = s.spawn(|| {
                let mut reply = Message::new();
                let result = store.create_or_refresh(None, &mut reply, hash, 1, payload_with("late"));
                (result, reply)
            });

            // The expired entry is unlinked and being freed outside the lock.
            entered_rx.recv().unwrap();
            create(&store, None);
            create(&store, None);
            release_tx.send(()).unwrap();

            let (result, reply) = late.join().unwrap();
            let rejected = result.unwrap_err();
            assert!(matches!(
                rejected.error,
                Error::CapacityExceeded { max_sessions: 2 }
            ));
            assert_eq!(rejected.payload.scope.attrs()[0].name, "late");
            assert!(reply.is_empty());
        });

        assert_eq!(store.entries_tracked(), 2);
        assert_eq!(store.entries_created(), 3);
        assert_eq!(store.entries_timed_out(), 1);
    }

    #[test]
    fn test_out_of_range_timeout_rejected() {
        let config = StateConfig::new().with_timeout_secs(u64::MAX);
        assert!(matches!(StateStore::<ThreadSafe>::new(config), Err(Error::Config(_))));
    }

    #[test]
    fn test_expired_entries_free_capacity() {
        let (store, clock) = store(1, 30);
        create(&store, None);

        clock.advance(Duration::from_secs(31));
        create(&store, None);

        assert_eq!(store.entries_timed_out(), 1);
        assert_eq!(store.entries_tracked(), 1);
    }

    #[test]
    fn test_expiry_is_strict() {
        let (store, clock) = store(1, 30);
        create(&store, None);

        // Exactly at the deadline the entry is still live.
        clock.advance(Duration::from_secs(30));
        let mut reply = Message::new();
        let result =
            store.create_or_refresh(None, &mut reply, ServerHash::of(DEFAULT), 1, payload_with("b"));
        assert!(result.is_err());
        assert_eq!(store.entries_timed_out(), 0);
    }

    #[test]
    fn test_eviction_in_expiry_order() {
        let (store, clock) = store(10, 30);
        let a = create(&store, None);
        clock.advance(Duration::from_secs(5));
        let b = create(&store, None);

        {
            let inner = store.lock();
            assert_eq!(inner.index.ids_in_expiry_order(), vec![a.entry_id, b.entry_id]);
        }

        // Only the first deadline has passed.
        clock.set_elapsed(Duration::from_secs(31));
        let c = create(&store, None);
        {
            let inner = store.lock();
            assert_eq!(inner.index.ids_in_expiry_order(), vec![b.entry_id, c.entry_id]);
        }

        clock.set_elapsed(Duration::from_secs(100));
        create(&store, None);
        assert_eq!(store.entries_timed_out(), 3);
        assert_eq!(store.entries_tracked(), 1);
    }

    #[test]
    fn test_duplicate_key_removes_token() {
        let (store, _clock) = store(10, 30);
        let mut first = Message::new();
        first.add(Attribute::new("State", vec![7u8; KEY_LEN]));
        store
            .create_or_refresh(None, &mut first, ServerHash::of(DEFAULT), 1, payload_with("a"))
            .unwrap();

        let mut second = Message::new();
        second.add(Attribute::new("State", vec![7u8; KEY_LEN]));
        let rejected = store
            .create_or_refresh(None, &mut second, ServerHash::of(DEFAULT), 1, payload_with("b"))
            .unwrap_err();

        assert!(matches!(rejected.error, Error::DuplicateKey));
        assert!(rejected.error.is_create_failure());
        assert_eq!(rejected.payload.scope.attrs()[0].name, "b");
        // Module-supplied tokens are left alone.
        assert_eq!(second.len(), 1);
        assert_eq!(store.entries_created(), 1);
    }

    #[test]
    fn test_claim_and_conflict() {
        let (store, _clock) = store(10, 30);
        let ticket = create(&store, None);
        let hash = ServerHash::of(DEFAULT);

        let claimed = store
            .claim(ticket.token.as_bytes(), hash, RequestId::new(10))
            .unwrap()
            .unwrap();
        assert_eq!(claimed.entry_id, ticket.entry_id);
        assert_eq!(claimed.seq_start, 1);

        let conflict = store.claim(ticket.token.as_bytes(), hash, RequestId::new(11));
        assert!(matches!(
            conflict,
            Err(Error::AlreadyClaimed { holder, .. }) if holder == RequestId::new(10)
        ));

        let again = store.claim(ticket.token.as_bytes(), hash, RequestId::new(10)).unwrap();
        assert!(again.is_none());

        let info = store.find(ticket.token.as_bytes(), hash).unwrap();
        assert!(!info.holds_payload);
        assert_eq!(info.claimed_by, Some(RequestId::new(10)));
    }

    #[test]
    fn test_discard_twice() {
        let (store, _clock) = store(10, 30);
        let ticket = create(&store, None);
        let hash = ServerHash::of(DEFAULT);

        assert!(store.discard(ticket.token.as_bytes(), hash));
        assert!(!store.discard(ticket.token.as_bytes(), hash));
        assert!(store.find(ticket.token.as_bytes(), hash).is_none());
        assert_eq!(store.entries_tracked(), 0);
    }

    #[test]
    fn test_stats() {
        let (store, clock) = store(5, 30);
        create(&store, None);
        create(&store, None);
        clock.advance(Duration::from_secs(60));
        create(&store, None);

        assert_eq!(
            store.stats(),
            StateStats {
                created: 3,
                timed_out: 2,
                tracked: 1,
                capacity: 5,
            }
        );
    }

    #[test]
    fn test_drop_frees_payloads() {
        struct Flag(Arc<std::sync::atomic::AtomicBool>);
        impl Drop for Flag {
            fn drop(&mut self) {
                self.0.store(true, std::sync::atomic::Ordering::SeqCst);
            }
        }

        let freed = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let (store, _clock) = store(5, 30);
        let mut data = RequestData::new();
        data.add(DataKey::new("flag", 0), Flag(freed.clone()), true);
        let mut reply = Message::new();
        store
            .create_or_refresh(
                None,
                &mut reply,
                ServerHash::of(DEFAULT),
                1,
                EntryPayload::new(StateScope::new(), data),
            )
            .unwrap();

        assert!(!freed.load(std::sync::atomic::Ordering::SeqCst));
        drop(store);
        assert!(freed.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn test_thread_safe_flag_must_match_lock() {
        let config = StateConfig::new().with_thread_safe(false);
        assert!(matches!(StateStore::<ThreadSafe>::new(config.clone()), Err(Error::Config(_))));
        assert!(StateStore::<SingleThreaded>::new(config).is_ok());

        let config = StateConfig::new();
        assert!(matches!(StateStore::<SingleThreaded>::new(config), Err(Error::Config(_))));
    }

    #[test]
    fn test_single_threaded_store() {
        let config = StateConfig::new().with_thread_safe(false);
        let store = StateStore::<SingleThreaded>::new(config).unwrap();
        let mut reply = Message::new();
        let ticket = store
            .create_or_refresh(None, &mut reply, ServerHash::of(DEFAULT), 1, payload_with("a"))
            .unwrap();
        assert!(store.find(ticket.token.as_bytes(), ServerHash::of(DEFAULT)).is_some());
    }
}
