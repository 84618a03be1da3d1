//! Versioned secret entities stored by the backend gateway.
//!
//! Main types:
//! * [`Secret`]
//! * [`SecretVersion`]

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// One version of a path-addressed secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretVersion {
    /// The key/value payload of this version.
    pub data: HashMap<String, String>,
    /// Unix timestamp (seconds) this version was created.
    pub created_time: u64,
    /// Unix timestamp (seconds) this version was soft-deleted, if any.
    pub deleted_time: Option<u64>,
}

impl SecretVersion {
    /// Builds a fresh, non-deleted version.
    pub fn new(data: HashMap<String, String>, created_time: u64) -> Self {
        Self {
            data,
            created_time,
            deleted_time: None,
        }
    }

    /// Returns `true` iff this version has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_time.is_some()
    }
}

/// A path-addressed, versioned secret.
///
/// `current_version` and `oldest_version` are monotonically increasing
/// (`spec.md` §3): upsert always creates a new version, never overwrites an
/// existing one, and pruning only ever advances `oldest_version` forward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secret {
    /// The secret's path.
    pub path: String,
    /// The most recently created, non-pruned version number.
    pub current_version: u64,
    /// The oldest version number still retained (may be soft-deleted).
    pub oldest_version: u64,
    /// All retained versions, keyed by version number.
    pub versions: BTreeMap<u64, SecretVersion>,
}

impl Secret {
    /// Builds an empty secret at `path` with no versions.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            current_version: 0,
            oldest_version: 0,
            versions: BTreeMap::new(),
        }
    }

    /// Returns the version record for `version`, if retained.
    pub fn version(&self, version: u64) -> Option<&SecretVersion> {
        self.versions.get(&version)
    }

    /// Returns the current version record, if it is not soft-deleted.
    ///
    /// Per `spec.md` §4.3, `load_secret` on a path whose active version is
    /// deleted returns a not-found signal; this helper captures exactly
    /// that condition for backend implementations.
    pub fn active_current_version(&self) -> Option<&SecretVersion> {
        self.versions
            .get(&self.current_version)
            .filter(|v| !v.is_deleted())
    }

    /// Returns `true` iff no version is retained, or every retained version
    /// is soft-deleted.
    pub fn all_versions_deleted(&self) -> bool {
        !self.versions.is_empty() && self.versions.values().all(SecretVersion::is_deleted)
    }
}
