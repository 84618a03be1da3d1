//! Policy entities consumed by the policy evaluator.
//!
//! Main types:
//! * [`Permission`]
//! * [`Policy`]

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single permission a policy can grant.
///
/// Closed set per `spec.md` §4.5: `{read, write, list, super}`. `Super` is a
/// wildcard that satisfies any requested permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Read a secret.
    Read,
    /// Write (create/update) a secret.
    Write,
    /// List secrets under a path prefix.
    List,
    /// Wildcard: satisfies any requested permission.
    Super,
}

/// An access-control policy binding a SPIFFE-ID pattern and a path pattern
/// to a set of permissions.
///
/// `name` is the logical key used by upsert (`spec.md` §4.5): upserting a
/// policy with an existing name preserves its `id` and `created_at` and only
/// advances `updated_at`. The regexes themselves are stored as raw patterns
/// here; the policy evaluator is responsible for compiling and caching them
/// (see `nexus-policy::CompiledPolicy`), since this crate stays free of a
/// regex dependency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Unique id, minted on first insert and preserved across upserts by name.
    pub id: Uuid,
    /// Logical name; the upsert key.
    pub name: String,
    /// Regex pattern matched against the caller's SPIFFE ID.
    pub spiffe_id_pattern: String,
    /// Regex pattern matched against the requested secret path.
    pub path_pattern: String,
    /// Permissions granted when both patterns match.
    pub permissions: BTreeSet<Permission>,
    /// Unix timestamp (seconds) of first insert.
    pub created_at: u64,
    /// Unix timestamp (seconds) of the most recent upsert.
    pub updated_at: u64,
}

impl Policy {
    /// Returns `true` iff `permissions` contains [`Permission::Super`] or is
    /// a superset of `requested`.
    pub fn satisfies(&self, requested: &BTreeSet<Permission>) -> bool {
        self.permissions.contains(&Permission::Super)
            || requested.iter().all(|perm| self.permissions.contains(perm))
    }
}
