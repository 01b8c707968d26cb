//! Wire message shapes for the storage and gossip services. See
//! `spec.md` §6.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entry::Entry;
use crate::version::Version;

/// Storage and gossip requests, multiplexed over one connection.
#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub enum Request {
    /// Storage service: `GetValue`.
    Get { key: String },
    /// Storage service: `PutValue`.
    Put {
        key: String,
        value: Vec<u8>,
        track_visibility: bool,
    },
    /// Gossip service: `Pull`.
    Pull { versions: HashMap<String, Version> },
    /// Gossip service: `Push`.
    Push { entries: HashMap<String, Entry> },
}

#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct GetReply {
    pub success: bool,
    pub key: String,
    pub version: Option<String>,
    pub value: Option<Vec<u8>>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct PutReply {
    pub success: bool,
    pub key: String,
    pub version: Option<String>,
    pub error: Option<String>,
}

/// A `Pull` reply carries entries that are strictly newer on this replica,
/// plus an optional nested pull request asking the initiator to push back
/// anything strictly newer on its side.
#[derive(Debug, Clone, Default, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct PullReply {
    pub success: bool,
    pub entries: HashMap<String, Entry>,
    pub pull: HashMap<String, Version>,
}

#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct PushReply {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub enum Response {
    Get(GetReply),
    Put(PutReply),
    Pull(PullReply),
    Push(PushReply),
}
