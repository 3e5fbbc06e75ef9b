//! Requests and the conversation-scoped state they carry.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::handoff::Slot;
use crate::key::ServerHash;
use crate::pairs::{AttrList, Attribute, Message};
use crate::request_data::RequestData;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies an in-flight request. Only ever compared, never dereferenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub const fn new(number: u64) -> Self {
        Self(number)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of an ownership scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u64);

/// The ownership unit for a conversation's session-state attributes.
///
/// Whoever holds the scope owns the attributes in it. Scopes are moved,
/// never shared, between requests and parked entries.
#[derive(Debug)]
pub struct StateScope {
    id: ScopeId,
    attrs: AttrList,
}

impl StateScope {
    /// A fresh, empty scope.
    pub fn new() -> Self {
        Self {
            id: ScopeId(NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed)),
            attrs: AttrList::new(),
        }
    }

    /// A scope view onto an existing scope, as handed to a child request
    /// that allocates into its parent's scope.
    pub(crate) fn sharing(id: ScopeId) -> Self {
        Self {
            id,
            attrs: AttrList::new(),
        }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn attrs(&self) -> &AttrList {
        &self.attrs
    }

    pub fn attrs_mut(&mut self) -> &mut AttrList {
        &mut self.attrs
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

impl Default for StateScope {
    fn default() -> Self {
        Self::new()
    }
}

/// A request being processed by a worker.
#[derive(Debug)]
pub struct Request {
    id: RequestId,
    server: String,
    server_hash: ServerHash,

    /// Request number of the first round of this conversation.
    pub seq_start: u64,

    /// Inbound message.
    pub packet: Message,

    /// Outbound message.
    pub reply: Message,

    /// Arbitrary keyed data attached by modules.
    pub data: RequestData,

    pub(crate) state: Slot<StateScope>,
}

impl Request {
    /// Create a request handled by the virtual server `server`.
    pub fn new(number: u64, server: impl Into<String>) -> Self {
        let server = server.into();
        Self {
            id: RequestId(number),
            server_hash: ServerHash::of(&server),
            server,
            seq_start: 0,
            packet: Message::new(),
            reply: Message::new(),
            data: RequestData::new(),
            state: Slot::with(StateScope::new()),
        }
    }

    /// Create a child request that allocates its session-state in the
    /// parent's scope.
    pub fn child(parent: &Request, number: u64) -> Self {
        let mut child = Self::new(number, parent.server.clone());
        child.seq_start = parent.seq_start;
        if let Some(id) = parent.scope_id() {
            child.state = Slot::with(StateScope::sharing(id));
        }
        child
    }

    /// Set the inbound message.
    pub fn with_packet(mut self, packet: Message) -> Self {
        self.packet = packet;
        self
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn number(&self) -> u64 {
        self.id.0
    }

    /// Name of the virtual server handling this request.
    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn server_hash(&self) -> ServerHash {
        self.server_hash
    }

    /// Identity of the scope currently held, if any.
    pub fn scope_id(&self) -> Option<ScopeId> {
        self.state.get().map(StateScope::id)
    }

    /// Session-state attributes, if the request holds a scope.
    pub fn session_state(&self) -> Option<&AttrList> {
        self.state.get().map(StateScope::attrs)
    }

    /// Mutable session-state attributes, if the request holds a scope.
    pub fn session_state_mut(&mut self) -> Option<&mut AttrList> {
        self.state.get_mut().map(StateScope::attrs_mut)
    }

    /// Add a session-state attribute, opening a scope if none is held.
    pub fn add_session_state(&mut self, attr: Attribute) {
        if self.state.is_empty() {
            self.state.give(StateScope::new());
        }
        if let Some(scope) = self.state.get_mut() {
            scope.attrs.push(attr);
        }
    }

    /// Whether any session-state attribute is held.
    pub fn has_session_state(&self) -> bool {
        self.state.get().is_some_and(|scope| !scope.is_empty())
    }
}
