//! The two-endpoint Keeper wire protocol (`spec.md` §6): `contribute` and
//! `shard`, colocated with their request/response bodies the way
//! `oprf-types::api` colocates wire types with the service that consumes
//! them.

use nexus_types::KeeperId;
use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Serialize)]
struct ContributeRequest {
    keeper_id: String,
    shard: [u8; 32],
}

#[derive(Deserialize)]
struct ShardResponse {
    shard: [u8; 32],
}

/// A client for a single Keeper's HTTP endpoints.
///
/// The `reqwest::Client` is injected by the hosting application, already
/// configured for mutual TLS with a SPIFFE-style identity (`spec.md` §1
/// places that configuration out of scope for this crate).
pub struct KeeperClient {
    http: reqwest::Client,
    base_url: String,
}

impl KeeperClient {
    /// Builds a client for the Keeper at `base_url`.
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Pushes `shard` to this Keeper's `contribute` endpoint. Any 2xx is
    /// success; non-2xx and transport failures are reported as
    /// [`Error::Transient`].
    pub async fn contribute(&self, keeper_id: KeeperId, shard: [u8; 32]) -> Result<(), Error> {
        let body = ContributeRequest {
            keeper_id: keeper_id.to_string(),
            shard,
        };
        let response = self
            .http
            .post(format!("{}/contribute", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|err| Error::Transient(format!("contribute request failed: {err}")))?;
        if !response.status().is_success() {
            return Err(Error::Transient(format!(
                "contribute returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Calls this Keeper's `shard` endpoint. Returns `Ok(None)` if the
    /// Keeper reports an all-zero shard, meaning it has not yet been seeded.
    pub async fn shard(&self) -> Result<Option<[u8; 32]>, Error> {
        let response = self
            .http
            .post(format!("{}/shard", self.base_url))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|err| Error::Transient(format!("shard request failed: {err}")))?;
        if !response.status().is_success() {
            return Err(Error::Transient(format!(
                "shard returned {}",
                response.status()
            )));
        }
        let body: ShardResponse = response
            .json()
            .await
            .map_err(|err| Error::Transient(format!("shard response decode failed: {err}")))?;
        if body.shard == [0u8; 32] {
            return Ok(None);
        }
        Ok(Some(body.shard))
    }
}
