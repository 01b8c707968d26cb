//! `History` — an append-only log of `(key, parent, version)` triples
//! recording the version DAG edges. See `spec.md` §3 and §4.3.
//!
//! Writers never see history directly: `Store::put`/`Store::put_entry`
//! enqueue a node and move on. A single background thread drains the
//! bounded queue into an in-memory vector, matching the "backpressure, not
//! loss" contract from §9 — `crossbeam_channel::bounded` blocks the calling
//! thread when the queue is full, which is the specified behavior, not a
//! workaround for it.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crossbeam::channel::{bounded, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::version::Version;

/// Minimum queue capacity per §4.3 ("bounded queue, capacity >= 1000").
pub const MIN_HISTORY_QUEUE_CAPACITY: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryNode {
    pub key: String,
    pub parent: Version,
    pub version: Version,
}

/// Append-only history log fed by a bounded channel and drained by a single
/// background consumer.
pub struct History {
    tx: Option<Sender<HistoryNode>>,
    nodes: Arc<Mutex<Vec<HistoryNode>>>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_HISTORY_QUEUE_CAPACITY);
        let (tx, rx) = bounded::<HistoryNode>(capacity);
        let nodes = Arc::new(Mutex::new(Vec::new()));

        let worker_nodes = nodes.clone();
        let worker = std::thread::spawn(move || {
            for node in rx.iter() {
                worker_nodes.lock().push(node);
            }
        });

        Self {
            tx: Some(tx),
            nodes,
            worker: Some(worker),
        }
    }

    /// Record one accepted write. Blocks the caller if the queue is full —
    /// this is the intended backpressure, not an error path.
    pub fn record(&self, key: impl Into<String>, parent: Version, version: Version) {
        let node = HistoryNode {
            key: key.into(),
            parent,
            version,
        };
        // The only way `send` fails is if the consumer thread has been
        // dropped, which only happens after `History` itself is dropped.
        if let Some(tx) = &self.tx {
            let _ = tx.send(node);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn nodes(&self) -> Vec<HistoryNode> {
        self.nodes.lock().clone()
    }

    /// Persist the current history to `path` as newline-delimited JSON, one
    /// node per line, re-parseable into the same sequence.
    pub fn snapshot(&self, path: &Path) -> std::io::Result<()> {
        let mut file = std::fs::File::create(path)?;
        for node in self.nodes.lock().iter() {
            let line = serde_json::to_string(node)?;
            writeln!(file, "{line}")?;
        }
        file.sync_all()
    }

    /// Re-parse a snapshot written by `snapshot`.
    pub fn load_snapshot(path: &Path) -> std::io::Result<Vec<HistoryNode>> {
        let contents = std::fs::read_to_string(path)?;
        contents
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(std::io::Error::from))
            .collect()
    }
}

impl Drop for History {
    fn drop(&mut self) {
        // Struct fields drop only after this method body returns, so the
        // sender must be dropped explicitly here to close the channel —
        // otherwise the drainer's `rx.iter()` never ends and `join` hangs.
        self.tx.take();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}
