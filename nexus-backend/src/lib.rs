#![deny(missing_docs)]
//! Encrypted, versioned storage for secrets and policies, abstracted behind
//! the [`Backend`] trait.
//!
//! Four variants implement the trait: [`memory`] (no encryption, no
//! persistence), [`sqlite`] and [`lite`] (both SQLite-backed, differing only
//! in connection-pool sizing), and [`noop`] (accepts any root key, persists
//! nothing). Selection between them happens once at process startup based on
//! configuration, never per request, following `oprf-service`'s pattern of a
//! single trait object behind an `Arc`.
//!
//! Secret versioning (upsert/prune/delete/undelete) is identical across
//! variants and lives in [`versioning`], shared by every implementation so
//! that storage engine choice never changes observable semantics.

pub mod aead;
pub mod lite;
pub mod memory;
pub mod noop;
mod sql;
pub mod sqlite;
pub mod versioning;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use nexus_types::{NotFound, Policy, Secret};
use uuid::Uuid;

/// Dynamic trait object for a backend gateway, shared across the policy
/// evaluator and the Keeper protocol driver.
pub type BackendService = Arc<dyn Backend + Send + Sync>;

/// Errors raised by a [`Backend`] implementation.
///
/// Variants distinguish the taxonomy kinds `spec.md` §7 assigns to the
/// backend: corrupt/undecodable stored records are cryptographic failures,
/// I/O and query failures are persistence failures, and missing entities are
/// reported through [`NotFound`] rather than this enum so callers can
/// pattern-match the not-found case without inspecting an error variant.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A query against the underlying store failed.
    #[error("backend persistence failure: {0}")]
    Persistence(String),
    /// A stored record failed to decrypt or deserialize under the current
    /// root key.
    #[error("backend record is not decryptable under the current root key")]
    Cryptographic(#[from] aead::AeadError),
    /// The backend was asked to operate with a root key it does not accept
    /// (e.g. `memory` given a key, or `sqlite`/`lite` given none).
    #[error("backend does not accept the supplied root-key state: {0}")]
    InvalidRootKeyState(&'static str),
}

/// The storage abstraction consumed by the policy evaluator and the
/// bootstrap/recovery flows.
///
/// Implementations encrypt every persisted record under the root key handed
/// to [`initialize`](Backend::initialize); `memory` ignores it, `noop`
/// ignores it (and everything else), `sqlite`/`lite` require it.
#[async_trait]
pub trait Backend {
    /// Prepares the backend to serve requests, keying at-rest encryption
    /// (where applicable) with `root_key`.
    async fn initialize(&self, root_key: Option<[u8; 32]>) -> Result<(), Error>;

    /// Creates a new version of the secret at `path` with the given data,
    /// applying the versioning rules in [`versioning`].
    async fn store_secret(
        &self,
        path: &str,
        data: HashMap<String, String>,
        now: u64,
        max_versions: u64,
    ) -> Result<(), Error>;

    /// Loads the secret at `path`. Returns [`NotFound`] if the path has no
    /// retained versions or every retained version is soft-deleted.
    async fn load_secret(&self, path: &str) -> Result<Secret, LookupError>;

    /// Loads every retained secret, keyed by path.
    async fn load_all_secrets(&self) -> Result<HashMap<String, Secret>, Error>;

    /// Soft-deletes the given versions of the secret at `path`. `[0]` means
    /// "the current version"; an empty list is a no-op.
    async fn delete_secret_versions(
        &self,
        path: &str,
        versions: &[u64],
        now: u64,
    ) -> Result<(), LookupError>;

    /// Clears soft-delete markers on the given versions; an empty list
    /// restores the highest deleted version.
    async fn undelete_secret_versions(
        &self,
        path: &str,
        versions: &[u64],
    ) -> Result<(), LookupError>;

    /// Upserts `policy`, keyed by [`Policy::name`](nexus_types::Policy::name).
    async fn store_policy(&self, policy: Policy) -> Result<(), Error>;

    /// Loads the policy with the given id.
    async fn load_policy(&self, id: Uuid) -> Result<Policy, LookupError>;

    /// Deletes the policy with the given id.
    async fn delete_policy(&self, id: Uuid) -> Result<(), LookupError>;

    /// Loads every stored policy.
    async fn load_all_policies(&self) -> Result<Vec<Policy>, Error>;

    /// Releases any held resources (connection pools, file handles).
    async fn close(&self);
}

/// Either a genuine backend error, or a not-found signal.
///
/// Kept distinct from [`Error`] so call sites can match on
/// `LookupError::NotFound` without threading a `NotFound` variant through
/// every other fallible [`Backend`] method.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// The requested entity does not exist (or, for secrets, every retained
    /// version is soft-deleted).
    #[error(transparent)]
    NotFound(#[from] NotFound),
    /// A genuine backend failure.
    #[error(transparent)]
    Backend(#[from] Error),
}
