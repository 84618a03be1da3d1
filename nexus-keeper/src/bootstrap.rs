//! First-ever-start bootstrap (`spec.md` §4.4 "Bootstrap").
//!
//! Precondition (checked by [`crate::driver::Driver`], not here): no
//! tombstone, backend reports empty, custodian is zero, directory has at
//! least `N` entries.

use std::collections::HashSet;

use nexus_backend::BackendService;
use nexus_core::RootKeyCustodian;
use rand::RngCore;
use tokio_util::sync::CancellationToken;
use zeroize::Zeroize;

use crate::client::KeeperClient;
use crate::{Error, KeeperConfig};

/// Generates a fresh root key, splits it, installs it and the backend, and
/// pushes shares to every Keeper until all have acknowledged at least once,
/// then writes the tombstone.
pub async fn bootstrap(
    config: &KeeperConfig,
    http: reqwest::Client,
    custodian: &RootKeyCustodian,
    backend: &BackendService,
    cancellation_token: &CancellationToken,
) -> Result<(), Error> {
    if !config.directory.meets_minimum(config.shamir.total()) {
        return Err(Error::CorruptInput(format!(
            "keeper directory has {} entries, need at least {}",
            config.directory.len(),
            config.shamir.total()
        )));
    }

    let mut root_key = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut root_key);

    custodian.install(root_key)?;
    backend.initialize(Some(root_key)).await?;

    let shares = nexus_core::shamir::split(&root_key, config.shamir)?;
    root_key.zeroize();

    let mut acknowledged = HashSet::with_capacity(config.directory.len());
    loop {
        for (keeper_id, base_url) in config.directory.iter() {
            if acknowledged.contains(&keeper_id) {
                continue;
            }
            let Some(share) = shares.iter().find(|s| s.id() == keeper_id.into_inner()) else {
                tracing::warn!(%keeper_id, "no share with matching id for this keeper");
                continue;
            };
            let client = KeeperClient::new(http.clone(), base_url);
            match client.contribute(keeper_id, *share.value()).await {
                Ok(()) => {
                    tracing::info!(%keeper_id, "keeper acknowledged bootstrap contribution");
                    acknowledged.insert(keeper_id);
                }
                Err(err) => {
                    tracing::warn!(%keeper_id, "bootstrap contribution failed, will retry next pass: {err}");
                }
            }
        }

        if acknowledged.len() == config.directory.len() {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(config.bootstrap_retry_interval) => {}
            _ = cancellation_token.cancelled() => {
                return Err(Error::Transient("bootstrap cancelled before all keepers acknowledged".into()));
            }
        }
    }

    crate::tombstone::write(&config.tombstone_path).await?;
    tracing::info!("bootstrap complete, tombstone written");
    Ok(())
}
