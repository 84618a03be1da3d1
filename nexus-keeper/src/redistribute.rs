//! Periodic redistribution of shares to Keepers while Nexus is live
//! (`spec.md` §4.4 "Periodic redistribution").
//!
//! Heals Keepers that restarted with empty storage and tolerates transient
//! transport failures, since the shares recomputed each tick are bitwise
//! identical to the ones generated at bootstrap (`nexus_core::shamir::split`
//! is deterministic in the root key).

use std::sync::Arc;

use nexus_core::RootKeyCustodian;
use tokio_util::sync::CancellationToken;

use crate::KeeperConfig;
use crate::client::KeeperClient;

/// Runs the redistribution timer until `cancellation_token` is cancelled.
///
/// Intended to be spawned as a background task alongside the rest of the
/// Keeper protocol driver once the custodian has entered the `steady`
/// state.
pub async fn run(
    config: KeeperConfig,
    http: reqwest::Client,
    custodian: Arc<RootKeyCustodian>,
    cancellation_token: CancellationToken,
) {
    let mut interval = tokio::time::interval(config.redistribution_interval);
    interval.tick().await; // first tick fires instantly; skip it

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = cancellation_token.cancelled() => {
                tracing::info!("redistribution task cancelled");
                return;
            }
        }
        tick(&config, &http, &custodian).await;
    }
}

async fn tick(config: &KeeperConfig, http: &reqwest::Client, custodian: &RootKeyCustodian) {
    let shares = match custodian.with_key(|key| nexus_core::shamir::split(key, config.shamir)) {
        Ok(Ok(shares)) => shares,
        Ok(Err(err)) => {
            tracing::error!("redistribution: failed to re-split shares: {err}");
            return;
        }
        Err(_locked) => {
            tracing::debug!("redistribution: custodian is zero, skipping tick");
            return;
        }
    };

    for (keeper_id, base_url) in config.directory.iter() {
        let Some(share) = shares.iter().find(|s| s.id() == keeper_id.into_inner()) else {
            tracing::warn!(%keeper_id, "no share with matching id for this keeper");
            continue;
        };
        let client = KeeperClient::new(http.clone(), base_url);
        if let Err(err) = client.contribute(keeper_id, *share.value()).await {
            tracing::warn!(%keeper_id, "redistribution contribution failed: {err}");
        }
    }
}
