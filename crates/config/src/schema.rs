//! Typed configuration for the hub and every bridge kind.

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Top-level partyline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat command that returns the cached global roster (exact
    /// case-sensitive full-text match).
    pub roster_command: String,

    /// Delay in seconds between starting consecutive bridges, so external
    /// networks don't see a thundering herd of simultaneous connects.
    pub stagger_secs: u64,

    /// Quiet period in seconds before a presence change is announced.
    pub debounce_secs: u64,

    /// IRC bridges.
    pub irc: Vec<IrcBridgeConfig>,

    /// Telegram bridges.
    pub telegram: Vec<TelegramBridgeConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            roster_command: "!on".to_string(),
            stagger_secs: 3,
            debounce_secs: 5,
            irc: Vec::new(),
            telegram: Vec::new(),
        }
    }
}

/// One IRC network bridge.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IrcBridgeConfig {
    /// Bridge identifier. Leave empty to adopt the server name from the
    /// IRC welcome reply.
    pub id: String,

    /// `host:port` of the IRC server.
    pub server: String,

    pub nick: String,
    pub user: String,
    pub realname: String,

    /// Server password (PASS), if the network requires one.
    #[serde(serialize_with = "serialize_secret")]
    pub server_password: Secret<String>,

    /// Connect over TLS.
    pub tls: bool,

    /// Skip certificate verification (self-signed IRC networks).
    pub accept_invalid_certs: bool,

    /// Extra PEM CA bundle to trust in addition to the system roots.
    pub ca_file: Option<std::path::PathBuf>,

    /// Channel to bridge, including the leading `#`.
    pub channel: String,
}

impl Default for IrcBridgeConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            server: String::new(),
            nick: "partyline".to_string(),
            user: "partyline".to_string(),
            realname: "partyline bridge".to_string(),
            server_password: Secret::new(String::new()),
            tls: false,
            accept_invalid_certs: false,
            ca_file: None,
            channel: String::new(),
        }
    }
}

impl std::fmt::Debug for IrcBridgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IrcBridgeConfig")
            .field("id", &self.id)
            .field("server", &self.server)
            .field("nick", &self.nick)
            .field("channel", &self.channel)
            .field("server_password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// One Telegram group-chat bridge.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramBridgeConfig {
    /// Bridge identifier.
    pub id: String,

    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Identifier of the bridged group chat.
    pub chat_id: i64,
}

impl Default for TelegramBridgeConfig {
    fn default() -> Self {
        Self {
            id: "telegram".to_string(),
            token: Secret::new(String::new()),
            chat_id: 0,
        }
    }
}

impl std::fmt::Debug for TelegramBridgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBridgeConfig")
            .field("id", &self.id)
            .field("chat_id", &self.chat_id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
