//! Session-state for child requests.
//!
//! A child request (an inner exchange spawned by a module) keeps its
//! session-state inside its parent between rounds rather than in the store.
//! Every operation here is a no-op when there is no parent.

use tracing::trace;

use crate::pairs::AttrList;
use crate::request::{Request, StateScope};
use crate::request_data::DataKey;

/// Key the child's session-state list is stashed under while it travels
/// inside the child's persistable data.
const STASH_KEY: DataKey = DataKey::new("session-state", 0);

/// Park the child's session-state and persistable data in its parent.
///
/// `key` identifies the facility that spawned the child, so several
/// facilities can each park one child in the same parent.
pub fn store_in_parent(child: &mut Request, parent: Option<&mut Request>, key: DataKey) {
    let Some(parent) = parent else {
        return;
    };

    let attrs = child
        .session_state_mut()
        .map(std::mem::take)
        .unwrap_or_default();
    child.data.add(STASH_KEY, attrs, true);
    child.data.store_in_parent(&mut parent.data, key);

    trace!(child = %child.id(), parent = %parent.id(), facility = %key, "Child state saved to parent");
}

/// Pull session-state parked by [`store_in_parent`] back into the child.
pub fn restore_to_child(child: &mut Request, parent: Option<&mut Request>, key: DataKey) {
    let Some(parent) = parent else {
        return;
    };

    child.data.restore_from_parent(&mut parent.data, key);

    if let Some(attrs) = child.data.get::<AttrList>(STASH_KEY) {
        match child.session_state_mut() {
            Some(slot) => *slot = attrs,
            None => {
                let mut scope = StateScope::new();
                *scope.attrs_mut() = attrs;
                child.state.give(scope);
            }
        }
    }

    trace!(child = %child.id(), parent = %parent.id(), facility = %key, "Child state restored from parent");
}

/// Separate a child's session-state from its parent's scope.
///
/// With `will_free`, the caller promises to drop the child straight away
/// and never touch its session-state again: the child's attributes and
/// persistable data are freed, and a scope shared with the parent is let go
/// so the parent remains its only owner.
///
/// Otherwise the child gets a private scope holding a copy of its
/// attributes, so it can outlive the parent safely.
pub fn detach(child: &mut Request, parent: Option<&Request>, will_free: bool) {
    let Some(parent) = parent else {
        return;
    };
    let shared = child.scope_id().is_some() && child.scope_id() == parent.scope_id();

    if will_free {
        if let Some(attrs) = child.session_state_mut() {
            attrs.clear();
        }
        child.data.free_persistable();
        if shared {
            drop(child.state.take());
        }
        trace!(child = %child.id(), shared, "Child state freed on detach");
        return;
    }

    let mut private = StateScope::new();
    if let Some(old) = child.state.get_mut() {
        *private.attrs_mut() = old.attrs().clone();
        old.attrs_mut().clear();
    }
    // A shared scope still belongs to the parent. A private one is ours to
    // release, which dropping it here does.
    drop(child.state.take());
    child.state.give(private);

    trace!(child = %child.id(), shared, "Child state moved to private scope");
}
