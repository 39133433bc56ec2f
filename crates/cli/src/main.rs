//! The `partyline` binary: load config, wire every bridge into the hub,
//! run until interrupted.

use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    anyhow::Context,
    clap::Parser,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    partyline_broadcast::{BroadcastHub, HubHandle, PresenceDebouncer},
    partyline_config::{Config, loader, validate},
    partyline_irc::IrcBridge,
    partyline_telegram::TelegramBridge,
};

#[derive(Parser)]
#[command(name = "partyline", about = "Partyline chat network relay hub")]
struct Cli {
    /// Path to the config file (default: discover partyline.toml/.json).
    #[arg(long, env = "PARTYLINE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = match &cli.config {
        Some(path) => loader::load_config(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => loader::discover_and_load().context("loading config")?,
    };
    validate::validate(&config)?;

    run(config).await;
    Ok(())
}

async fn run(config: Config) {
    let (mut hub, handle) = BroadcastHub::new();
    let debounce =
        PresenceDebouncer::with_window(handle.clone(), Duration::from_secs(config.debounce_secs));

    let mut irc_bridges = Vec::new();
    for bridge_config in config.irc {
        let bridge = Arc::new(IrcBridge::new(bridge_config));
        hub.register(bridge.clone());
        irc_bridges.push(bridge);
    }

    let mut telegram_bridges = Vec::new();
    for bridge_config in config.telegram {
        let bridge = Arc::new(TelegramBridge::new(bridge_config));
        hub.register(bridge.clone());
        telegram_bridges.push(bridge);
    }

    info!(
        irc = irc_bridges.len(),
        telegram = telegram_bridges.len(),
        "partyline hub starting"
    );

    tokio::spawn(start_bridges(
        irc_bridges,
        telegram_bridges,
        handle,
        debounce,
        config.roster_command,
        Duration::from_secs(config.stagger_secs),
    ));

    tokio::select! {
        _ = hub.run() => {},
        _ = tokio::signal::ctrl_c() => info!("interrupted, shutting down"),
    }
}

/// Start bridges one at a time with a delay in between, so external
/// networks don't all see us connect in the same instant.
async fn start_bridges(
    irc_bridges: Vec<Arc<IrcBridge>>,
    telegram_bridges: Vec<Arc<TelegramBridge>>,
    handle: HubHandle,
    debounce: PresenceDebouncer,
    roster_command: String,
    stagger: Duration,
) {
    let mut first = true;
    for bridge in &irc_bridges {
        if !std::mem::take(&mut first) {
            tokio::time::sleep(stagger).await;
        }
        bridge.start(handle.clone(), roster_command.clone());
    }
    for bridge in &telegram_bridges {
        if !std::mem::take(&mut first) {
            tokio::time::sleep(stagger).await;
        }
        bridge.start(handle.clone(), debounce.clone(), roster_command.clone());
    }
}

fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}
