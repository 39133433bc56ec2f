//! The contract every bridged network implements.

use async_trait::async_trait;

use crate::envelope::Envelope;

/// Chat command that asks a bridge for the cached global roster.
///
/// Matched case-sensitively against the full message text; text that merely
/// contains it is ordinary content. Overridable in config.
pub const DEFAULT_ROSTER_COMMAND: &str = "!on";

/// One connected chat network, as seen by the hub.
///
/// Adapters run their own session loops and own all per-participant state;
/// the hub only ever calls these four operations. None of them may block on
/// network I/O; slow writes happen inside the adapter's own tasks.
#[async_trait]
pub trait BridgeAdapter: Send + Sync {
    /// Stable bridge identifier. May be empty until the adapter finishes its
    /// own handshake (an IRC bridge learns its server name from the welcome
    /// reply); empty-id bridges are skipped during roster aggregation.
    fn id(&self) -> String;

    /// Write an envelope out to this network. A disconnected adapter logs
    /// and drops the envelope; it never surfaces an error to the hub.
    async fn send(&self, envelope: &Envelope);

    /// Point-in-time snapshot of the raw display names currently online on
    /// this network.
    async fn local_names(&self) -> Vec<String>;

    /// Cache the latest aggregated global roster so the adapter can answer
    /// roster queries locally without a round trip through the hub.
    async fn set_global_names(&self, names: String);
}
