//! Sanity checks run on a loaded config before any bridge starts.

use secrecy::ExposeSecret;

use crate::schema::Config;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no bridges configured")]
    NoBridges,

    #[error("duplicate bridge id: {id}")]
    DuplicateBridgeId { id: String },

    #[error("irc bridge {index}: {message}")]
    Irc { index: usize, message: String },

    #[error("telegram bridge {index}: {message}")]
    Telegram { index: usize, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Validate a loaded config. Returns the first problem found.
pub fn validate(config: &Config) -> Result<()> {
    if config.irc.is_empty() && config.telegram.is_empty() {
        return Err(Error::NoBridges);
    }

    let irc_err = |index: usize, message: &str| Error::Irc {
        index,
        message: message.to_string(),
    };
    for (index, irc) in config.irc.iter().enumerate() {
        if irc.server.is_empty() {
            return Err(irc_err(index, "server is required"));
        }
        if !irc.server.contains(':') {
            return Err(irc_err(index, "server must be host:port"));
        }
        if irc.nick.is_empty() {
            return Err(irc_err(index, "nick is required"));
        }
        if irc.channel.is_empty() {
            return Err(irc_err(index, "channel is required"));
        }
    }

    let tg_err = |index: usize, message: &str| Error::Telegram {
        index,
        message: message.to_string(),
    };
    for (index, tg) in config.telegram.iter().enumerate() {
        if tg.id.is_empty() {
            return Err(tg_err(index, "id is required"));
        }
        if tg.token.expose_secret().is_empty() {
            return Err(tg_err(index, "token is required"));
        }
        if tg.chat_id == 0 {
            return Err(tg_err(index, "chat_id is required"));
        }
    }

    // Empty IRC ids are allowed (filled in after the welcome reply), but
    // configured ids must be unique; they are the routing key.
    let mut seen = std::collections::HashSet::new();
    let ids = config
        .irc
        .iter()
        .map(|b| b.id.as_str())
        .chain(config.telegram.iter().map(|b| b.id.as_str()))
        .filter(|id| !id.is_empty());
    for id in ids {
        if !seen.insert(id) {
            return Err(Error::DuplicateBridgeId { id: id.to_string() });
        }
    }

    Ok(())
}
