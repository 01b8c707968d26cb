//! `Entry` — a versioned value. See `spec.md` §3 and §4.2.

use serde::{Deserialize, Serialize};

use crate::version::Version;

/// A single versioned write, as carried over the wire and stored by both
/// `Store` variants. The Sequential variant's per-key minting counter is
/// *not* part of this type — it is bookkeeping local to that store (see
/// `store::sequential::EntryCell`), not something that is synchronized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Entry {
    pub key: String,
    pub version: Version,
    pub parent: Version,
    pub value: Vec<u8>,
    pub track_visibility: bool,
}

impl Entry {
    pub fn new(key: impl Into<String>, version: Version, parent: Version, value: Vec<u8>, track_visibility: bool) -> Self {
        Self {
            key: key.into(),
            version,
            parent,
            value,
            track_visibility,
        }
    }
}
