//! The `memory` backend variant: no encryption, no persistence.
//!
//! Used when Nexus runs without at-rest secrets (`spec.md` §4.2's
//! "memory-only mode"): the custodian is never installed, and this backend
//! rejects being handed a root key at all, since it has nothing to encrypt
//! records with and nothing to persist them to.

use std::collections::HashMap;

use async_trait::async_trait;
use nexus_types::{NotFound, Policy, Secret};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::{Backend, Error, LookupError, versioning};

/// An in-memory, unencrypted backend. Every record is lost on process exit.
#[derive(Default)]
pub struct MemoryBackend {
    secrets: RwLock<HashMap<String, Secret>>,
    policies: RwLock<HashMap<Uuid, Policy>>,
}

impl MemoryBackend {
    /// Builds an empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn initialize(&self, root_key: Option<[u8; 32]>) -> Result<(), Error> {
        if root_key.is_some() {
            return Err(Error::InvalidRootKeyState(
                "memory backend must be initialized without a root key",
            ));
        }
        Ok(())
    }

    async fn store_secret(
        &self,
        path: &str,
        data: HashMap<String, String>,
        now: u64,
        max_versions: u64,
    ) -> Result<(), Error> {
        let mut secrets = self.secrets.write();
        let secret = secrets
            .entry(path.to_owned())
            .or_insert_with(|| Secret::new(path));
        versioning::upsert(secret, data, now, max_versions);
        Ok(())
    }

    async fn load_secret(&self, path: &str) -> Result<Secret, LookupError> {
        let secrets = self.secrets.read();
        let secret = secrets.get(path).ok_or(NotFound)?;
        if secret.all_versions_deleted() {
            return Err(NotFound.into());
        }
        Ok(secret.clone())
    }

    async fn load_all_secrets(&self) -> Result<HashMap<String, Secret>, Error> {
        Ok(self.secrets.read().clone())
    }

    async fn delete_secret_versions(
        &self,
        path: &str,
        versions: &[u64],
        now: u64,
    ) -> Result<(), LookupError> {
        let mut secrets = self.secrets.write();
        let secret = secrets.get_mut(path).ok_or(NotFound)?;
        versioning::delete(secret, versions, now);
        Ok(())
    }

    async fn undelete_secret_versions(
        &self,
        path: &str,
        versions: &[u64],
    ) -> Result<(), LookupError> {
        let mut secrets = self.secrets.write();
        let secret = secrets.get_mut(path).ok_or(NotFound)?;
        versioning::undelete(secret, versions);
        Ok(())
    }

    async fn store_policy(&self, policy: Policy) -> Result<(), Error> {
        self.policies.write().insert(policy.id, policy);
        Ok(())
    }

    async fn load_policy(&self, id: Uuid) -> Result<Policy, LookupError> {
        self.policies.read().get(&id).cloned().ok_or(NotFound.into())
    }

    async fn delete_policy(&self, id: Uuid) -> Result<(), LookupError> {
        self.policies
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(NotFound.into())
    }

    async fn load_all_policies(&self) -> Result<Vec<Policy>, Error> {
        Ok(self.policies.read().values().cloned().collect())
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_a_root_key() {
        let backend = MemoryBackend::new();
        assert!(backend.initialize(Some([1u8; 32])).await.is_err());
        assert!(backend.initialize(None).await.is_ok());
    }

    #[tokio::test]
    async fn store_then_load_round_trips() {
        let backend = MemoryBackend::new();
        backend.initialize(None).await.unwrap();
        backend
            .store_secret(
                "/a",
                HashMap::from([("k".to_owned(), "v".to_owned())]),
                1,
                10,
            )
            .await
            .unwrap();
        let secret = backend.load_secret("/a").await.unwrap();
        assert_eq!(secret.current_version, 1);
        assert!(backend.load_secret("/missing").await.is_err());
    }
}
