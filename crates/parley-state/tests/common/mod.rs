//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use parley_state::{Attribute, ManualClock, Message, Request, StateConfig, StateStore};

/// Virtual server most tests run under.
pub const SERVER: &str = "default";

/// Install a test subscriber once. Honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("parley_state=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// A thread-safe store driven by a manual clock.
pub fn store(max_sessions: usize, timeout_secs: u64) -> (Arc<StateStore>, Arc<ManualClock>) {
    init_tracing();
    let clock = Arc::new(ManualClock::new());
    let config = StateConfig::new()
        .with_max_sessions(max_sessions)
        .with_timeout_secs(timeout_secs);
    let store = StateStore::with_clock(config, clock.clone()).expect("valid config");
    (Arc::new(store), clock)
}

/// A first-round request carrying one session-state attribute.
pub fn opening_request(number: u64, server: &str, marker: &str) -> Request {
    let mut request = Request::new(number, server);
    request.add_session_state(Attribute::new("Marker", marker.as_bytes().to_vec()));
    request
}

/// A follow-up request echoing the token from `reply`.
pub fn follow_up(number: u64, server: &str, reply: &Message) -> Request {
    let mut packet = Message::new();
    if let Some(token) = reply.find("State") {
        packet.add(token.clone());
    }
    Request::new(number, server).with_packet(packet)
}

/// Token bytes from a reply.
pub fn token(reply: &Message) -> Vec<u8> {
    reply
        .find("State")
        .map(|attr| attr.value.clone())
        .expect("reply carries a token")
}
