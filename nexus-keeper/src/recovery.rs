//! Reconstructing the root key from Keeper shares after a restart
//! (`spec.md` §4.4 "Recovery").
//!
//! In memory-only mode this is a no-op handled by the caller
//! ([`crate::driver::Driver`]); this module is only invoked when a durable
//! backend needs its encryption key back. Absent enough reachable Keepers,
//! [`recover`] retries forever with capped exponential back-off — the
//! system genuinely cannot serve secrets without the key, so there is no
//! fallback to degrade to.

use std::collections::HashMap;

use backon::{BackoffBuilder, ExponentialBuilder};
use nexus_backend::BackendService;
use nexus_core::RootKeyCustodian;
use nexus_types::{KeeperId, Share};
use tokio_util::sync::CancellationToken;
use zeroize::Zeroize;

use crate::client::KeeperClient;
use crate::{Error, KeeperConfig};

/// Polls Keepers until `T` distinct, non-zero shares have been collected,
/// reconstructs the root key, and installs it into `custodian` and
/// `backend`.
pub async fn recover(
    config: &KeeperConfig,
    http: reqwest::Client,
    custodian: &RootKeyCustodian,
    backend: &BackendService,
    cancellation_token: &CancellationToken,
) -> Result<(), Error> {
    let threshold = usize::from(config.shamir.threshold());
    let mut collected: HashMap<KeeperId, [u8; 32]> = HashMap::with_capacity(threshold);
    let deadline = config
        .recovery_operation_timeout
        .map(|timeout| tokio::time::Instant::now() + timeout);
    let mut backoff = ExponentialBuilder::new()
        .with_min_delay(config.recovery_retry_floor)
        .without_max_times()
        .build();

    loop {
        for (keeper_id, base_url) in config.directory.iter() {
            if collected.contains_key(&keeper_id) {
                continue;
            }
            let client = KeeperClient::new(http.clone(), base_url);
            match client.shard().await {
                Ok(Some(value)) => {
                    tracing::info!(%keeper_id, "collected share from keeper");
                    collected.insert(keeper_id, value);
                }
                Ok(None) => {
                    tracing::debug!(%keeper_id, "keeper has no stored share yet");
                }
                Err(err) => {
                    tracing::warn!(%keeper_id, "could not fetch shard, will retry: {err}");
                }
            }
            if collected.len() >= threshold {
                break;
            }
        }

        if collected.len() >= threshold {
            break;
        }

        if let Some(deadline) = deadline {
            if tokio::time::Instant::now() >= deadline {
                return Err(Error::Transient(
                    "recovery timed out before collecting a threshold of shares".into(),
                ));
            }
        }

        let delay = backoff.next().unwrap_or(config.recovery_retry_floor);
        tracing::info!(collected = collected.len(), needed = threshold, ?delay, "retrying recovery pass");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancellation_token.cancelled() => {
                return Err(Error::Transient("recovery cancelled".into()));
            }
        }
    }

    let shares = collected
        .into_iter()
        .map(|(id, value)| {
            Share::new(id.into_inner(), value)
                .expect("keeper ids are already validated non-zero")
        })
        .collect::<Vec<_>>();

    let mut root_key = nexus_core::shamir::reconstruct(&shares, config.shamir.threshold())?;
    custodian.install(root_key)?;
    backend.initialize(Some(root_key)).await?;
    root_key.zeroize();
    tracing::info!("recovery complete, root key installed");
    Ok(())
}
