//! Config file discovery and parsing.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{env_subst::substitute_env, schema::Config};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["partyline.toml", "partyline.json"];

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("unsupported config format: {} (expected .toml or .json)", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("no config file found (looked for partyline.toml / partyline.json)")]
    NotFound,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Load config from an explicit path, with `${ENV_VAR}` substitution.
pub fn load_config(path: &Path) -> Result<Config> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./partyline.{toml,json}` (project-local)
/// 2. `~/.config/partyline/partyline.{toml,json}` (user-global)
pub fn discover_and_load() -> Result<Config> {
    let path = find_config_file().ok_or(Error::NotFound)?;
    debug!(path = %path.display(), "loading config");
    load_config(&path)
}

fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    if let Some(dirs) = directories::ProjectDirs::from("", "", "partyline") {
        for name in CONFIG_FILENAMES {
            let p = dirs.config_dir().join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

fn parse_config(raw: &str, path: &Path) -> Result<Config> {
    let parse_err = |message: String| Error::Parse {
        path: path.to_path_buf(),
        message,
    };

    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(raw).map_err(|e| parse_err(e.to_string())),
        Some("json") => serde_json::from_str(raw).map_err(|e| parse_err(e.to_string())),
        _ => Err(Error::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}
