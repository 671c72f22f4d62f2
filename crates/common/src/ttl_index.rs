//! The TTL index: a flat JSON object stored at `<repository>/ttl.json`
//! mapping artifact names to `{"expires_at": <unix seconds>}`.
//!
//! The file lives inside the repository tree, so it is versioned and
//! published together with the artifacts it describes. It is only ever
//! written from inside an open transaction and is re-read at the start of
//! every operation; nothing is cached between transactions.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, TimestampSecondsWithFrac};

use crate::repository::TTL_INDEX_FILENAME;

#[derive(Debug, thiserror::Error)]
pub enum TtlIndexError {
    #[error("failed to access ttl index at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed ttl index at {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlRecord {
    #[serde_as(as = "TimestampSecondsWithFrac<f64>")]
    pub expires_at: DateTime<Utc>,
}

impl TtlRecord {
    pub fn new(expires_at: DateTime<Utc>) -> Self {
        Self { expires_at }
    }

    /// Expired strictly after `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// In-memory view of one repository's index. Entries are kept ordered so
/// serialization is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TtlIndex {
    entries: BTreeMap<String, TtlRecord>,
}

impl TtlIndex {
    pub fn path(repository_path: &Path) -> PathBuf {
        repository_path.join(TTL_INDEX_FILENAME)
    }

    pub fn exists(repository_path: &Path) -> bool {
        Self::path(repository_path).is_file()
    }

    /// Read the index of the repository at `repository_path`. A repository
    /// that has never had a TTL-tracked upload has no file yet and yields an
    /// empty index.
    pub fn load(repository_path: &Path) -> Result<Self, TtlIndexError> {
        let path = Self::path(repository_path);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(TtlIndexError::Io { path, source }),
        };
        serde_json::from_slice(&bytes).map_err(|source| TtlIndexError::Malformed { path, source })
    }

    /// Overwrite the index file. Callers must hold an open transaction on
    /// the repository so the write lands in the same revision as the
    /// artifact change it accompanies.
    pub fn save(&self, repository_path: &Path) -> Result<(), TtlIndexError> {
        let path = Self::path(repository_path);
        let bytes = serde_json::to_vec(self).map_err(|source| TtlIndexError::Malformed {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, bytes).map_err(|source| TtlIndexError::Io { path, source })
    }

    pub fn get(&self, name: &str) -> Option<&TtlRecord> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, record: TtlRecord) -> Option<TtlRecord> {
        self.entries.insert(name.into(), record)
    }

    pub fn remove(&mut self, name: &str) -> Option<TtlRecord> {
        self.entries.remove(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TtlRecord)> {
        self.entries.iter().map(|(name, record)| (name.as_str(), record))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Names of every entry that has expired as of `now`. Returned as an
    /// owned snapshot so the caller can mutate the index while walking it.
    pub fn expired(&self, now: DateTime<Utc>) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, record)| record.is_expired(now))
            .map(|(name, _)| name.clone())
            .collect()
    }
}
