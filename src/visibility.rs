//! `VisibilityLogger` — asynchronous sink recording the wall-clock moment a
//! flagged write becomes visible on this replica. See `spec.md` §4.9.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use crossbeam::channel::{bounded, Sender};
use serde::{Deserialize, Serialize};

/// Minimum queue capacity per §4.9 ("bounded queue, capacity >= 10,000").
pub const MIN_VISIBILITY_QUEUE_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibilityRecord {
    pub key: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Records one line per tracked write. Producers block when the queue
/// saturates rather than dropping records; any write error is captured and
/// surfaced at `close()`, never mid-flight.
pub struct VisibilityLogger {
    tx: Option<Sender<VisibilityRecord>>,
    worker: Option<std::thread::JoinHandle<std::io::Result<()>>>,
}

impl VisibilityLogger {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().append(true).create(true).open(path)?;
        let (tx, rx) = bounded::<VisibilityRecord>(MIN_VISIBILITY_QUEUE_CAPACITY);

        let worker = std::thread::spawn(move || Self::drain(file, rx));

        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
        })
    }

    fn drain(mut file: File, rx: crossbeam::channel::Receiver<VisibilityRecord>) -> std::io::Result<()> {
        for record in rx.iter() {
            let line = serde_json::to_string(&record).map_err(std::io::Error::from)?;
            writeln!(file, "{line}")?;
        }
        file.sync_all()
    }

    /// Log that `key`'s write at `version` became visible now.
    pub fn log(&self, key: impl Into<String>, version: impl Into<String>) {
        if let Some(tx) = &self.tx {
            let record = VisibilityRecord {
                key: key.into(),
                version: version.into(),
                timestamp: Utc::now(),
            };
            // Blocks if the queue is saturated — the specified contract.
            let _ = tx.send(record);
        }
    }

    /// Close the input, wait for the drainer to flush and close the file,
    /// and surface any write error it observed.
    pub fn close(mut self) -> std::io::Result<()> {
        self.tx.take();
        if let Some(handle) = self.worker.take() {
            return handle.join().unwrap_or(Ok(()));
        }
        Ok(())
    }
}

impl Drop for VisibilityLogger {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logs_are_flushed_to_disk_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visibility.ndjson");

        let logger = VisibilityLogger::open(&path).unwrap();
        logger.log("x", "1.1");
        logger.log("y", "2.1");
        logger.close().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: VisibilityRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.key, "x");
        assert_eq!(first.version, "1.1");
    }

    #[test]
    fn appends_across_multiple_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visibility.ndjson");

        let logger = VisibilityLogger::open(&path).unwrap();
        logger.log("x", "1.1");
        logger.close().unwrap();

        let logger = VisibilityLogger::open(&path).unwrap();
        logger.log("y", "2.1");
        logger.close().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
