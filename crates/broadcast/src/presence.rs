//! Debounced presence announcements.
//!
//! Unreliable networks flap: a participant drops and reconnects within
//! seconds, and announcing every blip would spam every bridge with join/part
//! churn. A connectivity transition therefore only creates a *pending*
//! status change; a one-shot timer matures it into a broadcast envelope
//! unless the participant flipped back in the meantime.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use tracing::debug;

use crate::{
    envelope::{Envelope, SenderId, StatusKind},
    hub::HubHandle,
};

/// Quiet period a transition must survive before it is announced.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_secs(5);

/// Read access to a participant's current online flag.
///
/// Implemented by adapters over their own participant state; the debouncer
/// never touches that state directly, so adapters keep their own locking
/// discipline.
pub trait PresenceSource: Send + Sync {
    /// Current online flag, or `None` for an unknown participant.
    fn is_online(&self, participant_id: u64) -> Option<bool>;
}

/// A transition waiting out its quiet period.
struct Pending {
    online: bool,
    seq: u64,
}

#[derive(Default)]
struct PendingTable {
    entries: HashMap<(String, u64), Pending>,
    next_seq: u64,
}

/// Delay-then-recheck suppression of presence flapping.
///
/// Cloneable; clones share the pending table. Adapters must record the new
/// online flag in their own state *before* calling
/// [`PresenceDebouncer::on_transition`], and must never call it while
/// enumerating participants at startup; only real transitions announce.
#[derive(Clone)]
pub struct PresenceDebouncer {
    hub: HubHandle,
    window: Duration,
    pending: Arc<Mutex<PendingTable>>,
}

impl PresenceDebouncer {
    pub fn new(hub: HubHandle) -> Self {
        Self::with_window(hub, DEFAULT_DEBOUNCE_WINDOW)
    }

    pub fn with_window(hub: HubHandle, window: Duration) -> Self {
        Self {
            hub,
            window,
            pending: Arc::new(Mutex::new(PendingTable::default())),
        }
    }

    /// Record a connectivity transition for one participant.
    ///
    /// A transition that reverses a still-pending one cancels it outright;
    /// the flap produces zero announcements. Otherwise a timer task sleeps
    /// out the window and then re-reads the participant's current flag
    /// through `source`; only if the flag still matches (and no newer
    /// transition replaced this one) does a Joined/Left envelope reach the
    /// hub.
    pub fn on_transition(
        &self,
        source: Arc<dyn PresenceSource>,
        bridge_id: impl Into<String>,
        participant_id: u64,
        name: impl Into<String>,
        online: bool,
    ) {
        let bridge_id = bridge_id.into();
        let name = name.into();
        let key = (bridge_id.clone(), participant_id);

        let seq = {
            let mut table = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(pending) = table.entries.get(&key) {
                if pending.online != online {
                    // Flip back before the window elapsed: suppress both.
                    debug!(%bridge_id, participant_id, "presence flap suppressed");
                    table.entries.remove(&key);
                } else {
                    // Same direction again; the existing timer stands.
                    debug!(%bridge_id, participant_id, "transition already pending");
                }
                return;
            }
            table.next_seq += 1;
            let seq = table.next_seq;
            table.entries.insert(key.clone(), Pending { online, seq });
            seq
        };

        let hub = self.hub.clone();
        let pending = Arc::clone(&self.pending);
        let window = self.window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;

            {
                let mut table = pending.lock().unwrap_or_else(|e| e.into_inner());
                match table.entries.get(&key) {
                    Some(entry) if entry.seq == seq => {
                        table.entries.remove(&key);
                    },
                    // Cancelled or replaced while we slept.
                    _ => return,
                }
            }

            // Re-read current truth through the adapter's accessor; adapter
            // state may have moved without a transition call (e.g. a kick
            // handled elsewhere).
            if source.is_online(participant_id) != Some(online) {
                debug!(
                    %bridge_id,
                    participant_id, "presence changed during window, dropping announcement"
                );
                return;
            }

            let kind = if online {
                StatusKind::Joined
            } else {
                StatusKind::Left
            };
            hub.push_message(Envelope::status(
                bridge_id,
                SenderId::Numeric(participant_id),
                name,
                kind,
            ));
        });
    }
}
