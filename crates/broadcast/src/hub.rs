//! The broadcast coordinator: two intake channels, two consume-forever
//! loops, fan-out to every bridge except the origin.

use std::{collections::HashMap, sync::Arc};

use {
    tokio::sync::mpsc,
    tracing::{debug, info},
};

use crate::{adapter::BridgeAdapter, envelope::Envelope, roster};

/// Cloneable producer side of the hub's two intakes. Handed to every
/// adapter and to the presence debouncer.
#[derive(Clone)]
pub struct HubHandle {
    messages: mpsc::UnboundedSender<Envelope>,
    roster_changed: mpsc::UnboundedSender<()>,
}

impl HubHandle {
    /// Queue an envelope for broadcast. Envelopes from one producer are
    /// forwarded in the order they were pushed.
    pub fn push_message(&self, envelope: Envelope) {
        if self.messages.send(envelope).is_err() {
            debug!("hub message intake closed, dropping envelope");
        }
    }

    /// Tell the hub some bridge's local roster changed; it will re-gather,
    /// re-aggregate, and push the fresh global roster to every adapter.
    pub fn signal_roster_changed(&self) {
        if self.roster_changed.send(()).is_err() {
            debug!("hub roster intake closed, dropping signal");
        }
    }
}

/// The central coordinator. Owns the registered adapters and the consumer
/// side of both intakes.
pub struct BroadcastHub {
    adapters: Vec<Arc<dyn BridgeAdapter>>,
    messages: mpsc::UnboundedReceiver<Envelope>,
    roster_changed: mpsc::UnboundedReceiver<()>,
}

impl BroadcastHub {
    pub fn new() -> (Self, HubHandle) {
        let (messages_tx, messages_rx) = mpsc::unbounded_channel();
        let (roster_tx, roster_rx) = mpsc::unbounded_channel();
        let hub = Self {
            adapters: Vec::new(),
            messages: messages_rx,
            roster_changed: roster_rx,
        };
        let handle = HubHandle {
            messages: messages_tx,
            roster_changed: roster_tx,
        };
        (hub, handle)
    }

    /// Register a bridge. Must happen before [`BroadcastHub::run`].
    pub fn register(&mut self, adapter: Arc<dyn BridgeAdapter>) {
        self.adapters.push(adapter);
    }

    /// Consume both intakes until every [`HubHandle`] clone is dropped.
    ///
    /// Message forwarding and roster refresh run as independent loops; each
    /// preserves its own arrival order, and both consume one item at a time
    /// so no envelope is ever left half-forwarded at shutdown.
    pub async fn run(self) {
        let adapters: Arc<[Arc<dyn BridgeAdapter>]> = self.adapters.into();
        let mut messages = self.messages;
        let mut roster_changed = self.roster_changed;

        let fanout_adapters = Arc::clone(&adapters);
        let fanout = async move {
            while let Some(envelope) = messages.recv().await {
                debug!(
                    origin = %envelope.origin,
                    status = ?envelope.status,
                    "broadcasting envelope"
                );
                forward(&fanout_adapters, &envelope).await;
            }
        };

        let refresh = async move {
            while roster_changed.recv().await.is_some() {
                refresh_roster(&adapters).await;
            }
        };

        tokio::join!(fanout, refresh);
        info!("broadcast hub stopped");
    }
}

/// Forward one envelope to every adapter except the one it came from.
///
/// Echo prevention is keyed on bridge identifier equality, never on sender
/// identity; one bridge hosts many senders, and name-only networks have no
/// usable per-sender identity at all.
pub async fn forward(adapters: &[Arc<dyn BridgeAdapter>], envelope: &Envelope) {
    for adapter in adapters {
        if adapter.id() != envelope.origin {
            adapter.send(envelope).await;
        }
    }
}

/// Gather every bridge's local names, aggregate, and push the result back to
/// every adapter for local caching.
pub async fn refresh_roster(adapters: &[Arc<dyn BridgeAdapter>]) {
    let mut lists = HashMap::new();
    for adapter in adapters {
        let id = adapter.id();
        if id.is_empty() {
            continue;
        }
        lists.insert(id, adapter.local_names().await);
    }

    let global = roster::aggregate(&lists);
    debug!(roster = %global, "pushing aggregated roster");
    for adapter in adapters {
        adapter.set_global_names(global.clone()).await;
    }
}
