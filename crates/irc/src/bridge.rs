//! Bridge-facing state and the [`BridgeAdapter`] implementation.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use {
    async_trait::async_trait,
    tokio::sync::mpsc,
    tracing::{debug, warn},
};

use {
    partyline_broadcast::{BridgeAdapter, Envelope, HubHandle},
    partyline_config::IrcBridgeConfig,
};

use crate::session;

/// One bridged IRC network.
pub struct IrcBridge {
    shared: Arc<Shared>,
}

impl IrcBridge {
    pub fn new(config: IrcBridgeConfig) -> Self {
        Self {
            shared: Arc::new(Shared::new(config)),
        }
    }

    /// Spawn the network session (connect, serve, reconnect forever).
    /// Returns immediately.
    pub fn start(&self, hub: HubHandle, roster_command: String) {
        tokio::spawn(session::run(
            Arc::clone(&self.shared),
            hub,
            roster_command,
        ));
    }
}

#[async_trait]
impl BridgeAdapter for IrcBridge {
    fn id(&self) -> String {
        self.shared.id()
    }

    async fn send(&self, envelope: &Envelope) {
        if !self.shared.connected() {
            warn!(bridge = %self.shared.id(), "irc not connected, dropping outbound message");
            return;
        }
        self.shared
            .privmsg(&self.shared.config.channel, &envelope.render());
    }

    async fn local_names(&self) -> Vec<String> {
        self.shared.read().names.clone()
    }

    async fn set_global_names(&self, names: String) {
        self.shared.set_global_names(names);
    }
}

/// State shared between the adapter surface and the session task.
///
/// Guarded by a std `RwLock`; nothing holds a guard across an await point.
pub(crate) struct Shared {
    pub(crate) config: IrcBridgeConfig,
    inner: RwLock<Runtime>,
}

#[derive(Default)]
struct Runtime {
    id: String,
    /// Current nick, which can drift from the configured one on collision.
    nick: String,
    connected: bool,
    names: Vec<String>,
    /// NAMES replies accumulate here until the end-of-names marker.
    pending_names: Vec<String>,
    global_names: String,
    outbound: Option<mpsc::UnboundedSender<String>>,
}

impl Shared {
    pub(crate) fn new(config: IrcBridgeConfig) -> Self {
        let id = config.id.clone();
        let nick = config.nick.clone();
        Self {
            config,
            inner: RwLock::new(Runtime {
                id,
                nick,
                ..Runtime::default()
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Runtime> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Runtime> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn id(&self) -> String {
        self.read().id.clone()
    }

    pub(crate) fn set_id(&self, id: &str) {
        self.write().id = id.to_string();
    }

    pub(crate) fn nick(&self) -> String {
        self.read().nick.clone()
    }

    pub(crate) fn set_nick(&self, nick: String) {
        self.write().nick = nick;
    }

    pub(crate) fn connected(&self) -> bool {
        self.read().connected
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.write().connected = connected;
    }

    pub(crate) fn global_names(&self) -> String {
        self.read().global_names.clone()
    }

    pub(crate) fn set_global_names(&self, names: String) {
        self.write().global_names = names;
    }

    pub(crate) fn buffer_names(&self, names: impl IntoIterator<Item = String>) {
        self.write().pending_names.extend(names);
    }

    pub(crate) fn commit_names(&self) {
        let mut runtime = self.write();
        runtime.names = std::mem::take(&mut runtime.pending_names);
    }

    pub(crate) fn set_outbound(&self, tx: mpsc::UnboundedSender<String>) {
        self.write().outbound = Some(tx);
    }

    /// Session is gone: drop the writer, forget the roster.
    pub(crate) fn mark_disconnected(&self) {
        let mut runtime = self.write();
        runtime.connected = false;
        runtime.outbound = None;
        runtime.names.clear();
        runtime.pending_names.clear();
    }

    /// Queue a raw protocol line for the session writer.
    pub(crate) fn raw(&self, line: String) {
        if let Some(tx) = &self.read().outbound {
            if tx.send(line).is_err() {
                debug!("irc session writer gone, dropping line");
            }
        } else {
            debug!("no irc session, dropping line");
        }
    }

    pub(crate) fn privmsg(&self, target: &str, text: &str) {
        self.raw(format!("PRIVMSG {target} :{text}"));
    }

    pub(crate) fn request_names(&self) {
        self.raw(format!("NAMES {}", self.config.channel));
    }
}
