//! Ties bootstrap, recovery and periodic redistribution into the single
//! state machine `spec.md` §4.4 describes: `uninit -> bootstrapping ->
//! steady <-> recovering -> terminated`.

use std::sync::Arc;

use nexus_backend::BackendService;
use nexus_core::RootKeyCustodian;
use tokio_util::sync::CancellationToken;

use crate::{Error, KeeperConfig, bootstrap, recovery, redistribute, tombstone};

/// A label for the driver's current phase, surfaced to logs and to the
/// hosting application's health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Bootstrap or recovery has not yet run.
    Uninit,
    /// Generating a fresh root key and distributing its shares for the
    /// first time.
    Bootstrapping,
    /// Polling Keepers to reconstruct a previously-distributed root key.
    Recovering,
    /// The root key is installed; the periodic redistribution timer is
    /// running.
    Steady,
}

/// Owns everything the Keeper protocol driver needs and drives it from
/// `uninit` through bootstrap-or-recovery into `steady`.
pub struct Driver {
    config: KeeperConfig,
    custodian: Arc<RootKeyCustodian>,
    backend: BackendService,
    http: reqwest::Client,
    memory_mode: bool,
}

impl Driver {
    /// Builds a driver. `memory_mode` must be `true` iff the configured
    /// backend variant is `memory` (`spec.md` §4.2: the custodian is never
    /// installed in that mode).
    pub fn new(
        config: KeeperConfig,
        custodian: Arc<RootKeyCustodian>,
        backend: BackendService,
        http: reqwest::Client,
        memory_mode: bool,
    ) -> Self {
        Self {
            config,
            custodian,
            backend,
            http,
            memory_mode,
        }
    }

    /// Runs bootstrap-or-recovery to completion, then spawns the periodic
    /// redistribution task and returns its `JoinHandle`.
    ///
    /// Mirrors the teacher's `key_event_watcher_task` being spawned and
    /// then awaited by the hosting application during shutdown: the caller
    /// is expected to hold onto the returned handle and join it after
    /// cancelling `cancellation_token`.
    pub async fn start(
        self,
        cancellation_token: CancellationToken,
    ) -> Result<tokio::task::JoinHandle<()>, Error> {
        if self.memory_mode {
            tracing::info!(state = ?DriverState::Uninit, "memory-only mode, skipping bootstrap/recovery");
        } else if !tombstone::exists(&self.config.tombstone_path).await {
            tracing::info!(state = ?DriverState::Bootstrapping, "no tombstone found");
            bootstrap::bootstrap(
                &self.config,
                self.http.clone(),
                &self.custodian,
                &self.backend,
                &cancellation_token,
            )
            .await?;
        } else {
            tracing::info!(state = ?DriverState::Recovering, "tombstone found");
            recovery::recover(
                &self.config,
                self.http.clone(),
                &self.custodian,
                &self.backend,
                &cancellation_token,
            )
            .await?;
        }

        tracing::info!(state = ?DriverState::Steady, "entering steady state");
        Ok(tokio::spawn(redistribute::run(
            self.config,
            self.http,
            self.custodian,
            cancellation_token,
        )))
    }
}
