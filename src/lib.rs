//! A replicated, in-memory key/value store whose replicas converge through
//! bilateral anti-entropy gossip.
//!
//! Clients read and write against any replica; replicas reconcile
//! divergent writes in the background via a peer-selection bandit and a
//! pull-then-push gossip exchange. Two storage consistency variants are
//! offered: [`store::LinearizableStore`], which totally orders writes
//! across the whole keyspace, and [`store::SequentialStore`], which orders
//! writes per key only.

pub mod bandit;
pub mod config;
pub mod entry;
pub mod error;
pub mod history;
pub mod net;
pub mod replica;
pub mod results;
pub mod stats;
pub mod store;
pub mod version;
pub mod visibility;

pub use config::ReplicaConfig;
pub use entry::Entry;
pub use error::{ReplicaError, Result};
pub use replica::Replica;
pub use store::Store;
pub use version::Version;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
