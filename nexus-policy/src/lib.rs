#![deny(missing_docs)]
//! The policy evaluator (`spec.md` §4.5): gates secret get/put and policy
//! CRUD by matching a caller's SPIFFE ID and the requested path against a
//! set of stored [`Policy`](nexus_types::Policy) records.
//!
//! Each policy's two regexes are compiled once, at upsert time, and cached
//! in [`CompiledPolicy`] — `nexus_types::Policy` itself stays free of a
//! `regex` dependency so the shared data-model crate doesn't carry a crypto-
//! adjacent subsystem's parsing concerns. Grounded on `regex::Regex`'s use
//! elsewhere in the retrieval pack for exactly this purpose (SPIFFE-ID/path
//! matching), e.g. `chainflip-io-chainflip-backend`'s `eth::utils`.

use std::collections::{BTreeSet, HashMap};

use nexus_backend::BackendService;
use nexus_types::{NotFound, Permission, Policy};
use parking_lot::RwLock;
use regex::Regex;
use uuid::Uuid;

/// Errors raised by the policy evaluator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A SPIFFE-ID or path pattern failed to compile as a regex.
    #[error("invalid policy pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    /// The requested policy does not exist.
    #[error(transparent)]
    NotFound(#[from] NotFound),
    /// The backend failed.
    #[error(transparent)]
    Backend(#[from] nexus_backend::Error),
}

impl From<nexus_backend::LookupError> for Error {
    fn from(err: nexus_backend::LookupError) -> Self {
        match err {
            nexus_backend::LookupError::NotFound(e) => Error::NotFound(e),
            nexus_backend::LookupError::Backend(e) => Error::Backend(e),
        }
    }
}

/// A [`Policy`] with its two patterns pre-compiled.
pub struct CompiledPolicy {
    policy: Policy,
    spiffe_id: Regex,
    path: Regex,
}

impl CompiledPolicy {
    fn compile(policy: Policy) -> Result<Self, Error> {
        let spiffe_id = Regex::new(&policy.spiffe_id_pattern)?;
        let path = Regex::new(&policy.path_pattern)?;
        Ok(Self {
            policy,
            spiffe_id,
            path,
        })
    }

    /// Returns `true` iff `peer_identity` and `path` both match this
    /// policy's patterns and its permission set satisfies `requested`.
    pub fn grants(&self, peer_identity: &str, path: &str, requested: &BTreeSet<Permission>) -> bool {
        self.spiffe_id.is_match(peer_identity)
            && self.path.is_match(path)
            && self.policy.satisfies(requested)
    }
}

/// Evaluates access requests against the policies held by a [`BackendService`].
///
/// A peer whose identity equals `trust_root_for_pilot` is granted
/// unconditionally (`spec.md` §4.5's "pilot" identity) without consulting
/// any stored policy.
pub struct PolicyEvaluator {
    backend: BackendService,
    trust_root_for_pilot: String,
    cache: RwLock<HashMap<Uuid, std::sync::Arc<CompiledPolicy>>>,
}

impl PolicyEvaluator {
    /// Builds an evaluator over `backend`, trusting `trust_root_for_pilot`
    /// as the pilot identity.
    pub fn new(backend: BackendService, trust_root_for_pilot: impl Into<String>) -> Self {
        Self {
            backend,
            trust_root_for_pilot: trust_root_for_pilot.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// `spec.md` §4.5's `check_access`: grants unconditionally for the
    /// pilot identity, else loads all policies and grants iff some policy
    /// matches both patterns and its permission set covers `requested`.
    /// Denies (and logs) on a backend load failure.
    pub async fn check_access(
        &self,
        peer_identity: &str,
        path: &str,
        requested: &BTreeSet<Permission>,
    ) -> bool {
        if peer_identity == self.trust_root_for_pilot {
            return true;
        }
        let policies = match self.backend.load_all_policies().await {
            Ok(policies) => policies,
            Err(err) => {
                tracing::error!("policy evaluator could not load policies: {err}");
                return false;
            }
        };
        for policy in policies {
            let compiled = match self.compiled(policy) {
                Ok(compiled) => compiled,
                Err(err) => {
                    tracing::error!("skipping policy with invalid pattern: {err}");
                    continue;
                }
            };
            if compiled.grants(peer_identity, path, requested) {
                tracing::info!(%peer_identity, %path, "access granted");
                return true;
            }
        }
        tracing::info!(%peer_identity, %path, "access denied");
        false
    }

    /// Returns the cached [`CompiledPolicy`] for `policy`, compiling and
    /// caching it first if this is the first time it has been seen (e.g.
    /// loaded cold from the backend rather than through [`upsert`](Self::upsert)).
    fn compiled(&self, policy: Policy) -> Result<std::sync::Arc<CompiledPolicy>, Error> {
        if let Some(cached) = self.cache.read().get(&policy.id) {
            if cached.policy.updated_at == policy.updated_at {
                return Ok(cached.clone());
            }
        }
        let compiled = std::sync::Arc::new(CompiledPolicy::compile(policy)?);
        self.cache.write().insert(compiled.policy.id, compiled.clone());
        Ok(compiled)
    }

    /// Upserts a policy by `name`: if one exists, its id and `created_at`
    /// are preserved and `updated_at` advances; otherwise a fresh id is
    /// minted. Rejects the upsert if either pattern fails to compile.
    pub async fn upsert(
        &self,
        name: &str,
        spiffe_id_pattern: &str,
        path_pattern: &str,
        permissions: BTreeSet<Permission>,
        now: u64,
    ) -> Result<Policy, Error> {
        let existing = self
            .backend
            .load_all_policies()
            .await?
            .into_iter()
            .find(|p| p.name == name);

        let policy = match existing {
            Some(existing) => Policy {
                id: existing.id,
                name: name.to_owned(),
                spiffe_id_pattern: spiffe_id_pattern.to_owned(),
                path_pattern: path_pattern.to_owned(),
                permissions,
                created_at: existing.created_at,
                updated_at: now,
            },
            None => Policy {
                id: Uuid::new_v4(),
                name: name.to_owned(),
                spiffe_id_pattern: spiffe_id_pattern.to_owned(),
                path_pattern: path_pattern.to_owned(),
                permissions,
                created_at: now,
                updated_at: now,
            },
        };

        let compiled = CompiledPolicy::compile(policy.clone())?;
        self.backend.store_policy(policy.clone()).await?;
        self.cache
            .write()
            .insert(policy.id, std::sync::Arc::new(compiled));
        Ok(policy)
    }

    /// Deletes the policy with `id`, evicting its cache entry.
    pub async fn delete(&self, id: Uuid) -> Result<(), Error> {
        self.backend.delete_policy(id).await?;
        self.cache.write().remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_backend::memory::MemoryBackend;
    use std::sync::Arc;

    fn perms(ps: &[Permission]) -> BTreeSet<Permission> {
        ps.iter().copied().collect()
    }

    async fn evaluator() -> PolicyEvaluator {
        let backend: BackendService = Arc::new(MemoryBackend::new());
        backend.initialize(None).await.unwrap();
        PolicyEvaluator::new(backend, "spiffe://ex.org/pilot".to_owned())
    }

    #[tokio::test]
    async fn pilot_identity_bypasses_policies() {
        let eval = evaluator().await;
        assert!(
            eval.check_access("spiffe://ex.org/pilot", "anything", &perms(&[Permission::Super]))
                .await
        );
    }

    #[tokio::test]
    async fn matching_policy_grants_access() {
        let eval = evaluator().await;
        eval.upsert(
            "svc-readers",
            r"^spiffe://ex\.org/svc-.*$",
            r"^app/.*$",
            perms(&[Permission::Read]),
            1,
        )
        .await
        .unwrap();

        assert!(
            eval.check_access("spiffe://ex.org/svc-a", "app/x", &perms(&[Permission::Read]))
                .await
        );
        assert!(
            !eval
                .check_access("spiffe://ex.org/svc-a", "app/x", &perms(&[Permission::Write]))
                .await
        );
        assert!(
            !eval
                .check_access("spiffe://other.org/svc-a", "app/x", &perms(&[Permission::Read]))
                .await
        );
    }

    #[tokio::test]
    async fn upsert_by_name_preserves_id_and_created_at() {
        let eval = evaluator().await;
        let first = eval
            .upsert("p", "^a$", "^b$", perms(&[Permission::Read]), 1)
            .await
            .unwrap();
        let second = eval
            .upsert(
                "p",
                "^a$",
                "^b$",
                perms(&[Permission::Read, Permission::Write]),
                2,
            )
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.created_at, 1);
        assert_eq!(second.updated_at, 2);
    }
}
