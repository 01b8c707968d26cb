//! `LinearizableStore` — single global write order across all keys on this
//! replica. See `spec.md` §4.5.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::entry::Entry;
use crate::error::{ReplicaError, Result};
use crate::history::History;
use crate::version::Version;
use crate::visibility::VisibilityLogger;

use super::{maybe_log_visibility, Store};

struct Inner {
    entries: HashMap<String, Entry>,
    current: u64,
    last_write: Version,
}

/// One reader/writer lock guards the entire namespace, enforcing a single
/// total write order across every key. `parent` pointers knit that order
/// into a chain: each write's parent is whatever the previous committed
/// write on this replica was, regardless of key.
pub struct LinearizableStore {
    pid: u64,
    inner: RwLock<Inner>,
    history: Arc<History>,
    visibility: Option<Arc<VisibilityLogger>>,
}

impl LinearizableStore {
    pub fn new(pid: u64, history: Arc<History>, visibility: Option<Arc<VisibilityLogger>>) -> Self {
        Self {
            pid,
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                current: 0,
                last_write: Version::NULL,
            }),
            history,
            visibility,
        }
    }
}

impl Store for LinearizableStore {
    fn get(&self, key: &str) -> Result<(Vec<u8>, Version)> {
        let inner = self.inner.read();
        inner
            .entries
            .get(key)
            .map(|e| (e.value.clone(), e.version))
            .ok_or_else(|| ReplicaError::NotFound(key.to_string()))
    }

    fn put(&self, key: &str, value: Vec<u8>, track_visibility: bool) -> Result<Version> {
        let entry = {
            let mut inner = self.inner.write();
            inner.current += 1;
            let version = Version::new(inner.current, self.pid);
            let parent = inner.last_write;

            let entry = Entry::new(key, version, parent, value, track_visibility);
            inner.entries.insert(key.to_string(), entry.clone());
            inner.last_write = version;
            entry
        };

        self.history.record(entry.key.clone(), entry.parent, entry.version);
        maybe_log_visibility(&self.visibility, &entry);

        Ok(entry.version)
    }

    fn get_entry(&self, key: &str) -> Option<Entry> {
        self.inner.read().entries.get(key).cloned()
    }

    fn put_entry(&self, entry: Entry) -> bool {
        let accepted = {
            let mut inner = self.inner.write();
            let newer = match inner.entries.get(&entry.key) {
                Some(current) => entry.version > current.version,
                None => true,
            };

            if newer {
                inner.current = inner.current.max(entry.version.scalar);
                inner.last_write = entry.version;
                inner.entries.insert(entry.key.clone(), entry.clone());
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
        self.inner
            .read()
            .entries
            .iter()
            .map(|(k, e)| (k.clone(), e.version))
            .collect()
    }

    fn update(&self, _key: &str, version: Version) {
        let mut inner = self.inner.write();
        inner.current = inner.current.max(version.scalar);
    }

    fn len(&self) -> usize {
        self.inner.read().entries.len()
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

    fn store(pid: u64) -> LinearizableStore {
        LinearizableStore::new(pid, Arc::new(History::new(16)), None)
    }

    #[test]
    fn put_mints_strictly_increasing_versions_across_keys() {
        let s = store(1);
        let v1 = s.put("x", b"1".to_vec(), false).unwrap();
        let v2 = s.put("y", b"2".to_vec(), false).unwrap();
        let v3 = s.put("x", b"3".to_vec(), false).unwrap();

        assert!(v2 > v1);
        assert!(v3 > v2);
    }

    #[test]
    fn parent_chain_threads_across_keys() {
        let s = store(1);
        s.put("x", b"1".to_vec(), false).unwrap();
        s.put("y", b"2".to_vec(), false).unwrap();
        s.put("x", b"3".to_vec(), false).unwrap();

        let x = s.get_entry("x").unwrap();
        let y = s.get_entry("y").unwrap();
        assert_eq!(y.parent, Version::new(1, 1));
        assert_eq!(x.version, Version::new(3, 1));
        assert_eq!(x.parent, Version::new(2, 1));
    }

    #[test]
    fn first_write_parents_on_the_zero_version() {
        let s = store(1);
        s.put("x", b"1".to_vec(), false).unwrap();
        assert_eq!(s.get_entry("x").unwrap().parent, Version::NULL);
    }

    #[test]
    fn get_returns_not_found_for_absent_key() {
        let s = store(1);
        assert!(matches!(s.get("missing"), Err(ReplicaError::NotFound(_))));
    }

    #[test]
    fn put_entry_rejects_stale_versions() {
        let s = store(1);
        let v = s.put("k", b"v".to_vec(), false).unwrap();

        let stale = Entry::new("k", v, Version::NULL, b"other".to_vec(), false);
        assert!(!s.put_entry(stale));

        let (value, version) = s.get("k").unwrap();
        assert_eq!(value, b"v");
        assert_eq!(version, v);
    }

    #[test]
    fn put_entry_accepts_strictly_newer_versions() {
        let s = store(1);
        s.put("k", b"v1".to_vec(), false).unwrap();

        let newer = Entry::new("k", Version::new(5, 2), Version::NULL, b"v2".to_vec(), false);
        assert!(s.put_entry(newer.clone()));

        let (value, version) = s.get("k").unwrap();
        assert_eq!(value, b"v2");
        assert_eq!(version, newer.version);
    }

    #[test]
    fn lamport_clock_advances_past_observed_remote_scalar() {
        let s = store(1);
        s.put("x", b"1".to_vec(), false).unwrap(); // current = 1
        s.update("x", Version::new(7, 2));
        let v = s.put("x", b"2".to_vec(), false).unwrap();
        assert_eq!(v, Version::new(8, 1));
    }
}
