//! Moving conversation state between a request and the store.
//!
//! ```text
//! request -> entry -> request -> entry -> request -> discard
//!        \-> reply           \-> reply           \-> final reply
//! ```
//!
//! [`save`] parks the request's session-state at the end of a round,
//! [`restore`] hands it to the next round's request, and [`discard`] drops
//! it once the conversation reaches a final outcome.

use tracing::{debug, trace, warn};

use crate::entry::EntryPayload;
use crate::error::{Error, Result};
use crate::lock::StoreLock;
use crate::request::Request;
use crate::store::{StateStore, StateTicket};

/// What [`restore`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The inbound message carried no token: first round of a conversation.
    NoToken,

    /// The token matched nothing, or this request already holds the state.
    NotFound,

    /// Session-state was moved into the request.
    Restored { entry_id: u64 },
}

/// Park the request's session-state and persistable data in the store.
///
/// Returns `Ok(None)` when there is nothing to remember. On success the
/// reply carries the token for the next round. On failure the request is
/// left exactly as it was.
pub fn save<L: StoreLock>(store: &StateStore<L>, request: &mut Request) -> Result<Option<StateTicket>> {
    let data = request.data.take_persistable();

    if !request.has_session_state() && data.is_empty() {
        request.data.restore(data);
        return Ok(None);
    }

    if let Some(attrs) = request.session_state() {
        debug!(
            request = %request.id(),
            attrs = attrs.len(),
            persisted = data.len(),
            "Saving session-state"
        );
    }

    let hash = request.server_hash();
    let existing = request
        .packet
        .find(store.token_attribute())
        .and_then(|attr| store.find(&attr.value, hash))
        .map(|info| info.key);

    let scope = request.state.take().unwrap_or_default();
    let payload = EntryPayload::new(scope, data);

    match store.create_or_refresh(existing, &mut request.reply, hash, request.seq_start, payload) {
        Ok(ticket) => {
            trace!(request = %request.id(), entry_id = ticket.entry_id, "Session-state saved");
            Ok(Some(ticket))
        }
        Err(rejected) => {
            warn!(request = %request.id(), error = %rejected.error, "Creating state entry failed");
            let EntryPayload { scope, data } = rejected.payload;
            request.state.give(scope);
            request.data.restore(data);
            Err(rejected.error)
        }
    }
}

/// Move parked session-state into the request presenting its token.
///
/// An entry already claimed by another in-flight request is a conflict:
/// nothing is handed out and [`Error::AlreadyClaimed`] is returned.
pub fn restore<L: StoreLock>(store: &StateStore<L>, request: &mut Request) -> Result<RestoreOutcome> {
    let Some(attr) = request.packet.find(store.token_attribute()) else {
        trace!(request = %request.id(), "No token attribute, nothing to restore");
        start_sequence(request);
        return Ok(RestoreOutcome::NoToken);
    };

    let claimed = match store.claim(&attr.value, request.server_hash(), request.id()) {
        Ok(Some(claimed)) => claimed,
        Ok(None) => {
            trace!(request = %request.id(), "No matching state entry");
            start_sequence(request);
            return Ok(RestoreOutcome::NotFound);
        }
        Err(e) => {
            if let Error::AlreadyClaimed { entry_id, holder } = &e {
                warn!(
                    request = %request.id(),
                    entry_id,
                    holder = %holder,
                    "State entry has already been claimed by another request"
                );
            }
            return Err(e);
        }
    };

    let EntryPayload { scope, data } = claimed.payload;
    let old = request.state.take();
    request.state.give(scope);
    request.seq_start = claimed.seq_start;
    request.data.restore(data);

    debug!(
        request = %request.id(),
        entry_id = claimed.entry_id,
        attrs = request.session_state().map_or(0, Vec::len),
        "Restored session-state"
    );

    // Whatever scope the request held before is freed here, outside the lock.
    drop(old);

    Ok(RestoreOutcome::Restored {
        entry_id: claimed.entry_id,
    })
}

/// End the conversation: free its parked entry and reset the request.
///
/// Returns whether an entry was found. The request's session-state is
/// replaced with a fresh empty scope regardless, so nothing left over from
/// the conversation is visible to later processing.
pub fn discard<L: StoreLock>(store: &StateStore<L>, request: &mut Request) -> bool {
    let found = request
        .packet
        .find(store.token_attribute())
        .is_some_and(|attr| store.discard(&attr.value, request.server_hash()));

    drop(request.state.take());
    request.state.give(Default::default());

    debug!(request = %request.id(), found, "Session-state discarded");
    found
}

fn start_sequence(request: &mut Request) {
    if request.seq_start == 0 {
        request.seq_start = request.number();
    }
}
