//! Configuration schema, discovery, and loading for partyline.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{discover_and_load, load_config},
    schema::{Config, IrcBridgeConfig, TelegramBridgeConfig},
};
