//! Bridge-facing state and the [`BridgeAdapter`] implementation.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use {
    async_trait::async_trait,
    teloxide::{Bot, prelude::Requester, types::ChatId},
    tracing::warn,
};

use {
    partyline_broadcast::{BridgeAdapter, Envelope, HubHandle, PresenceDebouncer, PresenceSource},
    partyline_config::TelegramBridgeConfig,
};

use crate::bot::run_polling;

/// One bridged Telegram group chat.
pub struct TelegramBridge {
    shared: Arc<Shared>,
}

impl TelegramBridge {
    pub fn new(config: TelegramBridgeConfig) -> Self {
        Self {
            shared: Arc::new(Shared::new(config)),
        }
    }

    /// Spawn the long-polling loop. Returns immediately.
    pub fn start(&self, hub: HubHandle, debounce: PresenceDebouncer, roster_command: String) {
        tokio::spawn(run_polling(
            Arc::clone(&self.shared),
            hub,
            debounce,
            roster_command,
        ));
    }
}

#[async_trait]
impl BridgeAdapter for TelegramBridge {
    fn id(&self) -> String {
        self.shared.config.id.clone()
    }

    async fn send(&self, envelope: &Envelope) {
        let Some(bot) = self.shared.bot() else {
            warn!(bridge = %self.shared.config.id, "telegram not connected, dropping outbound message");
            return;
        };
        let chat = ChatId(self.shared.config.chat_id);
        if let Err(e) = bot.send_message(chat, envelope.render()).await {
            warn!(bridge = %self.shared.config.id, error = %e, "telegram send failed");
        }
    }

    async fn local_names(&self) -> Vec<String> {
        self.shared.online_names()
    }

    async fn set_global_names(&self, names: String) {
        self.shared.write().global_names = names;
    }
}

/// A group member we have seen. Never deleted; filtered by the online flag
/// during aggregation.
struct Peer {
    name: String,
    online: bool,
}

#[derive(Default)]
struct Runtime {
    bot: Option<Bot>,
    peers: HashMap<u64, Peer>,
    global_names: String,
}

/// State shared between the adapter surface and the polling task. Guarded
/// by a std `RwLock`; nothing holds a guard across an await point.
pub(crate) struct Shared {
    pub(crate) config: TelegramBridgeConfig,
    inner: RwLock<Runtime>,
}

impl Shared {
    pub(crate) fn new(config: TelegramBridgeConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(Runtime::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Runtime> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Runtime> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn bot(&self) -> Option<Bot> {
        self.read().bot.clone()
    }

    pub(crate) fn set_bot(&self, bot: Bot) {
        self.write().bot = Some(bot);
    }

    pub(crate) fn global_names(&self) -> String {
        self.read().global_names.clone()
    }

    /// Record a participant seen alive (message activity). Returns true if
    /// the roster changed: a brand-new peer, a rename, or a comeback.
    pub(crate) fn note_peer(&self, id: u64, name: String) -> bool {
        let mut runtime = self.write();
        match runtime.peers.get_mut(&id) {
            Some(peer) => {
                let changed = peer.name != name || !peer.online;
                peer.name = name;
                peer.online = true;
                changed
            },
            None => {
                runtime.peers.insert(id, Peer { name, online: true });
                true
            },
        }
    }

    /// Record an observed join/leave transition.
    pub(crate) fn set_peer(&self, id: u64, name: String, online: bool) {
        let mut runtime = self.write();
        runtime.peers.insert(id, Peer { name, online });
    }

    fn online_names(&self) -> Vec<String> {
        self.read()
            .peers
            .values()
            .filter(|peer| peer.online)
            .map(|peer| peer.name.clone())
            .collect()
    }
}

impl PresenceSource for Shared {
    fn is_online(&self, participant_id: u64) -> Option<bool> {
        self.read().peers.get(&participant_id).map(|p| p.online)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared() -> Shared {
        Shared::new(TelegramBridgeConfig::default())
    }

    #[test]
    fn first_sighting_changes_roster() {
        let s = shared();
        assert!(s.note_peer(1, "ann".to_string()));
        assert!(!s.note_peer(1, "ann".to_string()));
        assert_eq!(s.online_names(), vec!["ann"]);
    }

    #[test]
    fn rename_changes_roster() {
        let s = shared();
        s.note_peer(1, "ann".to_string());
        assert!(s.note_peer(1, "annie".to_string()));
        assert_eq!(s.online_names(), vec!["annie"]);
    }

    #[test]
    fn offline_peers_are_kept_but_hidden() {
        let s = shared();
        s.note_peer(1, "ann".to_string());
        s.set_peer(1, "ann".to_string(), false);
        assert!(s.online_names().is_empty());
        assert_eq!(s.is_online(1), Some(false));
        // A message from them counts as a comeback.
        assert!(s.note_peer(1, "ann".to_string()));
        assert_eq!(s.is_online(1), Some(true));
    }

    #[test]
    fn unknown_peer_has_no_flag() {
        assert_eq!(shared().is_online(42), None);
    }
}
