//! `Version` — a totally ordered `(scalar, pid)` pair identifying a single
//! write. See `spec.md` §3 and §4.1.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ReplicaError, Result};

/// A single write's position in the replica's causal order.
///
/// Ordering compares `scalar` first, breaking ties on `pid`. The zero
/// version `(0, 0)` is the sentinel parent for first-ever writes and
/// compares less than every real version.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Version {
    pub scalar: u64,
    pub pid: u64,
}

impl Version {
    pub const NULL: Version = Version { scalar: 0, pid: 0 };

    pub fn new(scalar: u64, pid: u64) -> Self {
        Self { scalar, pid }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::NULL
    }

    pub fn eq_version(&self, other: &Version) -> bool {
        self == other
    }

    pub fn gt(&self, other: &Version) -> bool {
        self > other
    }

    pub fn ge(&self, other: &Version) -> bool {
        self >= other
    }

    pub fn lt(&self, other: &Version) -> bool {
        self < other
    }

    pub fn le(&self, other: &Version) -> bool {
        self <= other
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.scalar.cmp(&other.scalar).then(self.pid.cmp(&other.pid))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.scalar, self.pid)
    }
}

impl FromStr for Version {
    type Err = ReplicaError;

    fn from_str(s: &str) -> Result<Self> {
        let (scalar, pid) = s
            .split_once('.')
            .ok_or_else(|| ReplicaError::Malformed(format!("not a version: {s:?}")))?;

        let scalar: u64 = scalar
            .parse()
            .map_err(|_| ReplicaError::Malformed(format!("bad scalar in version: {s:?}")))?;
        let pid: u64 = pid
            .parse()
            .map_err(|_| ReplicaError::Malformed(format!("bad pid in version: {s:?}")))?;

        Ok(Version { scalar, pid })
    }
}
