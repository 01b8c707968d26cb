//! Replica configuration. The teacher's `DatabaseConfig` is a plain struct
//! with a `Default` impl and hand-assembled fields in `main.rs`; this crate
//! needs an actual CLI (multiple peers, the sequential/linearizable toggle,
//! bandit strategy selection) so it reaches for `clap`'s derive + `env`
//! features the way the `kv-rs` example workspace does, giving every flag an
//! environment-variable fallback per `spec.md` §6.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::error::{ReplicaError, Result};

/// Which `Store` implementation a replica runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    Linearizable,
    Sequential,
}

/// Which `BanditStrategy` a replica's anti-entropy loop uses to pick peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BanditKind {
    Uniform,
    Epsilon,
    Annealing,
}

/// Flags for the `honu-server` binary. Every flag has an `env` fallback
/// under the `HONU_` prefix, e.g. `--addr` / `HONU_ADDR`.
#[derive(Debug, Clone, Parser)]
#[command(name = "honu-server", about = "Replicated gossip key/value store replica")]
pub struct ReplicaConfig {
    /// Address this replica listens on and is dialed at by peers.
    #[arg(long, env = "HONU_ADDR", default_value = "127.0.0.1:3264")]
    pub addr: String,

    /// Numeric replica identifier, used as the `pid` half of every version
    /// this replica mints.
    #[arg(long, env = "HONU_PID")]
    pub pid: u64,

    /// Storage consistency variant.
    #[arg(long, value_enum, env = "HONU_STORE", default_value = "sequential")]
    pub store: StoreKind,

    /// Peer addresses to gossip with. May be empty, which disables
    /// anti-entropy entirely; reads and writes still work.
    #[arg(long = "peer", env = "HONU_PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,

    /// Delay between the end of one anti-entropy cycle and the start of the
    /// next.
    #[arg(long, env = "HONU_DELAY_MS", default_value_t = 1000)]
    pub delay_ms: u64,

    /// Optional uptime limit; the replica shuts down cleanly once exceeded.
    /// Zero means run until signaled.
    #[arg(long, env = "HONU_UPTIME_SECS", default_value_t = 0)]
    pub uptime_secs: u64,

    /// Where to append JSON-lines stats snapshots on shutdown.
    #[arg(long, env = "HONU_STATS_PATH", default_value = "stats.jsonl")]
    pub stats_path: PathBuf,

    /// Where to append the history snapshot on shutdown.
    #[arg(long, env = "HONU_HISTORY_PATH", default_value = "history.jsonl")]
    pub history_path: PathBuf,

    /// Where to append visibility records, if any write requests visibility
    /// tracking. Omit to disable visibility tracking entirely.
    #[arg(long, env = "HONU_VISIBILITY_PATH")]
    pub visibility_path: Option<PathBuf>,

    /// Peer-selection bandit strategy.
    #[arg(long, value_enum, env = "HONU_BANDIT", default_value = "epsilon")]
    pub bandit: BanditKind,

    /// Exploration probability for the `epsilon` bandit strategy. Ignored
    /// by `uniform` and `annealing`.
    #[arg(long, env = "HONU_EPSILON", default_value_t = 0.1)]
    pub epsilon: f64,
}

impl ReplicaConfig {
    pub fn anti_entropy_delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn uptime_limit(&self) -> Option<Duration> {
        if self.uptime_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.uptime_secs))
        }
    }

    /// Reject configurations that would be nonsensical at runtime, surfaced
    /// as `ReplicaError::Configuration` (fatal at startup, per `spec.md`
    /// §7's "Malformed input ... fatal at configuration time").
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(ReplicaError::Configuration(format!(
                "epsilon must be in [0, 1], got {}",
                self.epsilon
            )));
        }
        // Self-address in the peer list is not a configuration error: it's
        // a runtime miss/penalty case handled by the anti-entropy loop.
        Ok(())
    }
}
