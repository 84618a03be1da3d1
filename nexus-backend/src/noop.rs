//! The `noop` backend variant: accepts any root-key state, persists nothing.
//!
//! Used for dry-run deployments and for exercising the Keeper protocol
//! driver without standing up real storage.

use std::collections::HashMap;

use async_trait::async_trait;
use nexus_types::{NotFound, Policy, Secret};
use uuid::Uuid;

use crate::{Backend, Error, LookupError};

/// A backend that discards every write and reports every read as not-found.
#[derive(Default)]
pub struct NoopBackend;

impl NoopBackend {
    /// Builds a no-op backend.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Backend for NoopBackend {
    async fn initialize(&self, _root_key: Option<[u8; 32]>) -> Result<(), Error> {
        Ok(())
    }

    async fn store_secret(
        &self,
        _path: &str,
        _data: HashMap<String, String>,
        _now: u64,
        _max_versions: u64,
    ) -> Result<(), Error> {
        Ok(())
    }

    async fn load_secret(&self, _path: &str) -> Result<Secret, LookupError> {
        Err(NotFound.into())
    }

    async fn load_all_secrets(&self) -> Result<HashMap<String, Secret>, Error> {
        Ok(HashMap::new())
    }

    async fn delete_secret_versions(
        &self,
        _path: &str,
        _versions: &[u64],
        _now: u64,
    ) -> Result<(), LookupError> {
        Ok(())
    }

    async fn undelete_secret_versions(
        &self,
        _path: &str,
        _versions: &[u64],
    ) -> Result<(), LookupError> {
        Ok(())
    }

    async fn store_policy(&self, _policy: Policy) -> Result<(), Error> {
        Ok(())
    }

    async fn load_policy(&self, _id: Uuid) -> Result<Policy, LookupError> {
        Err(NotFound.into())
    }

    async fn delete_policy(&self, _id: Uuid) -> Result<(), LookupError> {
        Ok(())
    }

    async fn load_all_policies(&self) -> Result<Vec<Policy>, Error> {
        Ok(Vec::new())
    }

    async fn close(&self) {}
}
