//! `Store` — the keyspace. Two variants (`Linearizable`, `Sequential`)
//! share the contract in this module. See `spec.md` §4.4–§4.6.

pub mod linearizable;
pub mod sequential;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::entry::Entry;
use crate::error::Result;
use crate::history::History;
use crate::version::Version;
use crate::visibility::VisibilityLogger;

pub use linearizable::LinearizableStore;
pub use sequential::SequentialStore;

/// The common contract both store variants implement. See `spec.md` §4.4.
pub trait Store: Send + Sync {
    /// Current value and version for `key`, or `ReplicaError::NotFound`.
    fn get(&self, key: &str) -> Result<(Vec<u8>, Version)>;

    /// Write `value` to `key`, minting a new version under this store's
    /// ordering discipline, and return it.
    fn put(&self, key: &str, value: Vec<u8>, track_visibility: bool) -> Result<Version>;

    /// The current entry for `key`, if any. No lock is held across the
    /// return — callers that need a consistent read/mutate pair use
    /// `put_entry` or the variant-specific handle APIs instead.
    fn get_entry(&self, key: &str) -> Option<Entry>;

    /// Apply a remote entry, accepting it only if strictly newer than the
    /// current version for its key. Returns whether it was accepted.
    fn put_entry(&self, entry: Entry) -> bool;

    /// A snapshot of every key's current version.
    fn view(&self) -> HashMap<String, Version>;

    /// Advance this store's Lamport clock to observe a remote version,
    /// without necessarily storing a value for it (used by Pull before a
    /// push arrives; see `spec.md` §4.7's "Pull semantics detail").
    fn update(&self, key: &str, version: Version);

    /// Number of keys currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persist the store's history to `path`.
    fn snapshot(&self, path: &Path) -> std::io::Result<()>;

    /// The append-only history feed this store writes to.
    fn history(&self) -> &History;
}

/// Shared helper: emit a visibility record for an accepted write, if
/// tracking was requested and a logger is installed.
pub(crate) fn maybe_log_visibility(visibility: &Option<Arc<VisibilityLogger>>, entry: &Entry) {
    if entry.track_visibility {
        if let Some(logger) = visibility {
            logger.log(entry.key.clone(), entry.version.to_string());
        }
    }
}
