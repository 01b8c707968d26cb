//! `SequentialStore` — per-key total order, no inter-key order. See
//! `spec.md` §4.6.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::{ArcRwLockReadGuard, ArcRwLockWriteGuard, RawRwLock, RwLock};

use crate::entry::Entry;
use crate::error::{ReplicaError, Result};
use crate::history::History;
use crate::version::Version;
use crate::visibility::VisibilityLogger;

use super::{maybe_log_visibility, Store};

/// An entry plus the per-key scalar counter that mints its next version.
/// This counter is local bookkeeping — it never crosses the wire.
pub struct EntryCell {
    entry: Entry,
    current: u64,
}

impl EntryCell {
    fn empty(key: &str) -> Self {
        Self {
            entry: Entry::new(key, Version::NULL, Version::NULL, Vec::new(), false),
            current: 0,
        }
    }
}

/// A handle on one key's cell, locked in the mode the caller asked for.
/// Dropping the handle is the unlock — Rust's ownership model standing in
/// for the original's "caller owns the unlock obligation."
pub enum EntryHandle {
    Read(ArcRwLockReadGuard<RawRwLock, EntryCell>),
    Write(ArcRwLockWriteGuard<RawRwLock, EntryCell>),
}

impl EntryHandle {
    pub fn entry(&self) -> &Entry {
        match self {
            EntryHandle::Read(g) => &g.entry,
            EntryHandle::Write(g) => &g.entry,
        }
    }

    fn expect_write(&mut self) -> &mut EntryCell {
        match self {
            EntryHandle::Write(g) => g,
            EntryHandle::Read(_) => unreachable!("internal caller always asks for a mutable handle here"),
        }
    }
}

/// Two-level locking: an outer reader/writer lock guards the keyspace map,
/// taken only to look up or insert a key's cell; each cell carries its own
/// lock guarding its fields, released before the key lookup lock is ever
/// held again. Writes to different keys run in parallel.
pub struct SequentialStore {
    pid: u64,
    cells: RwLock<HashMap<String, Arc<RwLock<EntryCell>>>>,
    history: Arc<History>,
    visibility: Option<Arc<VisibilityLogger>>,
}

impl SequentialStore {
    pub fn new(pid: u64, history: Arc<History>, visibility: Option<Arc<VisibilityLogger>>) -> Self {
        Self {
            pid,
            cells: RwLock::new(HashMap::new()),
            history,
            visibility,
        }
    }

    /// Look up `key`'s cell and lock it in the requested mode. The
    /// store-level lock is released (it's only a read lock here) before
    /// the entry lock is acquired.
    fn locked(&self, key: &str, mutable: bool) -> Option<EntryHandle> {
        let cell = {
            let map = self.cells.read();
            map.get(key).cloned()
        }?;

        Some(if mutable {
            EntryHandle::Write(cell.write_arc())
        } else {
            EntryHandle::Read(cell.read_arc())
        })
    }

    /// Insert a fresh, empty, write-locked cell for `key` and return it
    /// still locked. The store-level write lock (needed only to insert the
    /// new map entry) is released before returning.
    fn make(&self, key: &str) -> EntryHandle {
        let cell = {
            let mut map = self.cells.write();
            map.entry(key.to_string())
                .or_insert_with(|| Arc::new(RwLock::new(EntryCell::empty(key))))
                .clone()
        };
        EntryHandle::Write(cell.write_arc())
    }

    fn locked_or_created(&self, key: &str) -> EntryHandle {
        match self.locked(key, true) {
            Some(handle) => handle,
            None => self.make(key),
        }
    }
}

impl Store for SequentialStore {
    fn get(&self, key: &str) -> Result<(Vec<u8>, Version)> {
        let handle = self
            .locked(key, false)
            .ok_or_else(|| ReplicaError::NotFound(key.to_string()))?;

        let entry = handle.entry();
        if entry.version.is_zero() {
            return Err(ReplicaError::NotFound(key.to_string()));
        }
        Ok((entry.value.clone(), entry.version))
    }

    fn put(&self, key: &str, value: Vec<u8>, track_visibility: bool) -> Result<Version> {
        let entry = {
            let mut handle = self.locked_or_created(key);
            let cell = handle.expect_write();

            cell.current += 1;
            let version = Version::new(cell.current, self.pid);
            let parent = cell.entry.version;

            let entry = Entry::new(key, version, parent, value, track_visibility);
            cell.entry = entry.clone();
            entry
        };

        self.history.record(entry.key.clone(), entry.parent, entry.version);
        maybe_log_visibility(&self.visibility, &entry);

        Ok(entry.version)
    }

    fn get_entry(&self, key: &str) -> Option<Entry> {
        self.locked(key, false).map(|h| h.entry().clone())
    }

    fn put_entry(&self, entry: Entry) -> bool {
        let accepted = {
            let mut handle = self.locked_or_created(&entry.key);
            let cell = handle.expect_write();

            let newer = entry.version > cell.entry.version;
            if newer {
                cell.current = cell.current.max(entry.version.scalar);
                cell.entry = entry.clone();
            }
            newer
        };

        if accepted {
            self.history.record(entry.key.clone(), entry.parent, entry.version);
            maybe_log_visibility(&self.visibility, &entry);
        }

        accepted
    }

    fn view(&self) -> HashMap<String, Version> {
        let map = self.cells.read();
        map.iter()
            .map(|(key, cell)| (key.clone(), cell.read().entry.version))
            .collect()
    }

    fn update(&self, key: &str, version: Version) {
        let mut handle = self.locked_or_created(key);
        let cell = handle.expect_write();
        cell.current = cell.current.max(version.scalar);
    }

    fn len(&self) -> usize {
        self.cells.read().len()
    }

    fn snapshot(&self, path: &Path) -> std::io::Result<()> {
        self.history.snapshot(path)
    }

    fn history(&self) -> &History {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(pid: u64) -> SequentialStore {
        SequentialStore::new(pid, Arc::new(History::new(16)), None)
    }

    #[test]
    fn per_key_versions_are_strictly_monotonic() {
        let s = store(1);
        let v1 = s.put("x", b"1".to_vec(), false).unwrap();
        let v2 = s.put("x", b"2".to_vec(), false).unwrap();
        assert!(v2 > v1);
    }

    #[test]
    fn unrelated_keys_do_not_share_a_counter() {
        let s = store(1);
        let vx = s.put("x", b"1".to_vec(), false).unwrap();
        let vy = s.put("y", b"2".to_vec(), false).unwrap();
        // Both mint (1, pid) independently — no cross-key ordering implied.
        assert_eq!(vx, Version::new(1, 1));
        assert_eq!(vy, Version::new(1, 1));
    }

    #[test]
    fn parent_chain_is_scoped_per_key() {
        let s = store(1);
        s.put("x", b"1".to_vec(), false).unwrap();
        s.put("y", b"2".to_vec(), false).unwrap();
        s.put("x", b"3".to_vec(), false).unwrap();

        let x = s.get_entry("x").unwrap();
        let y = s.get_entry("y").unwrap();
        assert_eq!(y.parent, Version::NULL);
        assert_eq!(x.version, Version::new(2, 1));
        assert_eq!(x.parent, Version::new(1, 1));
    }

    #[test]
    fn put_entry_rejects_stale_versions() {
        let s = store(1);
        let v = s.put("k", b"v".to_vec(), false).unwrap();

        let stale = Entry::new("k", v, Version::NULL, b"other".to_vec(), false);
        assert!(!s.put_entry(stale));
        assert_eq!(s.get("k").unwrap().0, b"v");
    }

    #[test]
    fn put_entry_accepts_first_ever_remote_write() {
        let s = store(1);
        let entry = Entry::new("k", Version::new(1, 2), Version::NULL, b"remote".to_vec(), false);
        assert!(s.put_entry(entry.clone()));
        assert_eq!(s.get("k").unwrap(), (b"remote".to_vec(), entry.version));
    }

    #[test]
    fn get_is_not_found_for_absent_key() {
        let s = store(1);
        assert!(matches!(s.get("nope"), Err(ReplicaError::NotFound(_))));
    }

    #[test]
    fn lamport_clock_advances_per_key() {
        let s = store(1);
        s.put("x", b"1".to_vec(), false).unwrap(); // current(x) = 1
        s.update("x", Version::new(7, 2));
        let v = s.put("x", b"2".to_vec(), false).unwrap();
        assert_eq!(v, Version::new(8, 1));

        // Unrelated key is unaffected.
        let vy = s.put("y", b"1".to_vec(), false).unwrap();
        assert_eq!(vy, Version::new(1, 1));
    }
}
