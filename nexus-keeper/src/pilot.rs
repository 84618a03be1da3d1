//! The operator ("pilot") break-glass recovery path (`spec.md` §4.4
//! "Operator (pilot) path"): emitting shares for offline storage, and
//! reconstructing from operator-supplied shares without waiting on Keepers.

use std::collections::HashMap;

use nexus_backend::BackendService;
use nexus_core::RootKeyCustodian;
use nexus_types::Share;
use zeroize::Zeroize;

use crate::client::KeeperClient;
use crate::{Error, KeeperConfig};

/// Produces the full set of shares as `id -> 32 bytes` for the operator to
/// store offline in separate locations.
///
/// Emits nothing (an empty map) if the custodian is zero.
pub fn emit_recovery_shards(
    custodian: &RootKeyCustodian,
    shamir: nexus_types::ShamirParameters,
) -> Result<HashMap<u64, [u8; 32]>, Error> {
    match custodian.with_key(|key| nexus_core::shamir::split(key, shamir)) {
        Ok(Ok(shares)) => Ok(shares
            .into_iter()
            .map(|share| (share.id(), *share.value()))
            .collect()),
        Ok(Err(err)) => Err(err.into()),
        Err(_locked) => Ok(HashMap::new()),
    }
}

/// Reconstructs the root key from operator-supplied `(id, value)` pairs,
/// installs it, initializes the backend, then eagerly pushes shares to
/// every Keeper once (without waiting for the next periodic redistribution
/// tick).
///
/// Each pair is validated to have a non-zero id and a non-zero value before
/// reconstruction is attempted; a violation is fatal corrupt input.
pub async fn restore_from_pilot_shards(
    shards: Vec<(u64, [u8; 32])>,
    config: &KeeperConfig,
    http: reqwest::Client,
    custodian: &RootKeyCustodian,
    backend: &BackendService,
) -> Result<(), Error> {
    let mut shares = Vec::with_capacity(shards.len());
    for (id, value) in shards {
        if id == 0 {
            return Err(Error::CorruptInput(
                "pilot shard has id 0, which is reserved for \"no share\"".into(),
            ));
        }
        if value == [0u8; 32] {
            return Err(Error::CorruptInput(format!(
                "pilot shard {id} has an all-zero value"
            )));
        }
        shares.push(
            Share::new(id, value).expect("id was just checked non-zero"),
        );
    }

    let mut root_key = nexus_core::shamir::reconstruct(&shares, config.shamir.threshold())?;
    custodian.install(root_key)?;
    backend.initialize(Some(root_key)).await?;

    // recompute the full N-share set so every keeper, not just the ones the
    // operator happened to supply, gets pushed to.
    let full_shares = nexus_core::shamir::split(&root_key, config.shamir)?;
    for (keeper_id, base_url) in config.directory.iter() {
        let Some(share) = full_shares.iter().find(|s| s.id() == keeper_id.into_inner()) else {
            tracing::warn!(%keeper_id, "no share with matching id for this keeper");
            continue;
        };
        let client = KeeperClient::new(http.clone(), base_url);
        if let Err(err) = client.contribute(keeper_id, *share.value()).await {
            tracing::warn!(%keeper_id, "eager post-restore push failed: {err}");
        }
    }

    root_key.zeroize();
    tracing::info!("restored root key from pilot shards");
    Ok(())
}
