//! Session-state store for multi-round authentication conversations.
//!
//! Methods that need several request/response round-trips park their
//! per-conversation data here between rounds, keyed by an opaque 16-byte
//! token the client echoes back. This crate provides:
//! - Token derivation, scoped per virtual server
//! - A capacity-bounded store with lazily enforced expiry
//! - Ownership handoff of session-state between requests and the store
//! - Propagation of session-state between child and parent requests
//!
//! # Example
//!
//! ```rust,ignore
//! use parley_state::{StateConfig, StateStore, transfer};
//!
//! let store: StateStore = StateStore::new(StateConfig::default().with_max_sessions(1000))?;
//!
//! transfer::restore(&store, &mut request)?;
//! // ... run the authentication method ...
//! transfer::save(&store, &mut request)?;
//! ```

mod clock;
mod config;
mod entry;
mod error;
mod handoff;
mod index;
mod key;
mod lock;
mod pairs;
mod request;
mod request_data;
mod store;

pub mod subrequest;
pub mod transfer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    DEFAULT_MAX_SESSIONS, DEFAULT_TIMEOUT_SECS, DEFAULT_TOKEN_ATTRIBUTE, MAX_TIMEOUT_SECS, StateConfig,
};
pub use entry::{EntryInfo, EntryPayload};
pub use error::{Error, Result};
pub use handoff::Slot;
pub use key::{KEY_LEN, ServerHash, StateKey, VERSION_FINGERPRINT};
pub use lock::{SingleThreaded, StoreLock, ThreadSafe};
pub use pairs::{AttrList, Attribute, Message};
pub use request::{Request, RequestId, ScopeId, StateScope};
pub use request_data::{DataKey, RequestData};
pub use store::{Rejected, StateStats, StateStore, StateTicket};
pub use transfer::RestoreOutcome;
