//! Core relay logic for the partyline hub.
//!
//! Everything network-specific lives in adapter crates; this crate holds the
//! coordination between them: the message [`Envelope`] and its renderer, the
//! roster aggregator, the presence debouncer, and the broadcast hub that fans
//! messages out to every bridge except the one they came from.

pub mod adapter;
pub mod envelope;
pub mod hub;
pub mod presence;
pub mod roster;

pub use {
    adapter::{BridgeAdapter, DEFAULT_ROSTER_COMMAND},
    envelope::{Envelope, SenderId, StatusKind, sanitize_name},
    hub::{BroadcastHub, HubHandle},
    presence::{DEFAULT_DEBOUNCE_WINDOW, PresenceDebouncer, PresenceSource},
};
