#![deny(missing_docs)]
//! Process wiring for a Nexus instance: selects a backend variant, builds
//! the root-key custodian and Keeper protocol driver, and exposes a health
//! router, mirroring the shape of the teacher's `OprfServiceBuilder`/
//! `oprf_key_gen::start` but over the Nexus root-of-trust components
//! instead of the OPRF protocol.

use std::sync::Arc;

use axum::Router;
use eyre::Context as _;
use nexus_backend::BackendService;
use nexus_core::RootKeyCustodian;
use nexus_keeper::{Driver, KeeperConfig};
use nexus_policy::PolicyEvaluator;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;

use config::{BackendStore, NexusConfig};

/// Everything [`start`] assembles: the `axum::Router` to serve and the
/// handle the caller must await (after cancelling the token it was started
/// with) for a graceful shutdown.
pub struct NexusService {
    /// The health-check router; the hosting binary serves this directly.
    pub router: Router,
    /// The Keeper protocol driver's background task (bootstrap/recovery
    /// followed by periodic redistribution).
    pub keeper_driver: tokio::task::JoinHandle<()>,
    /// The backend gateway, shared with any front-end the hosting
    /// application wires in alongside this router.
    pub backend: BackendService,
    /// The policy evaluator, shared likewise.
    pub policy: Arc<PolicyEvaluator>,
    /// The root-key custodian, shared likewise.
    pub custodian: Arc<RootKeyCustodian>,
}

fn backend_variant_label(store: BackendStore) -> &'static str {
    match store {
        BackendStore::Sqlite => "sqlite",
        BackendStore::Memory => "memory",
        BackendStore::Lite => "lite",
        BackendStore::Noop => "noop",
    }
}

async fn open_backend(config: &NexusConfig) -> eyre::Result<BackendService> {
    let backend: BackendService = match config.backend_store {
        BackendStore::Sqlite => Arc::new(
            nexus_backend::sqlite::open(&config.database_url, 5)
                .await
                .context("while opening sqlite backend")?,
        ),
        BackendStore::Lite => Arc::new(
            nexus_backend::lite::open(&config.database_url)
                .await
                .context("while opening lite backend")?,
        ),
        BackendStore::Memory => Arc::new(nexus_backend::memory::MemoryBackend::new()),
        BackendStore::Noop => Arc::new(nexus_backend::noop::NoopBackend::new()),
    };
    Ok(backend)
}

/// Assembles a [`NexusService`]: opens the configured backend, builds the
/// root-key custodian and policy evaluator, and starts the Keeper protocol
/// driver (bootstrap-or-recovery, then periodic redistribution).
///
/// The caller owns `cancellation_token` and is expected to cancel it and
/// await `keeper_driver` for a graceful shutdown, exactly as
/// `oprf-key-gen`'s binary awaits its `KeyGenTasks`.
pub async fn start(
    config: NexusConfig,
    cancellation_token: CancellationToken,
) -> eyre::Result<NexusService> {
    let memory_mode = matches!(config.backend_store, BackendStore::Memory);

    tracing::info!("opening {:?} backend", config.backend_store);
    let backend = open_backend(&config).await?;

    let shamir = config
        .shamir_parameters()
        .context("invalid shamir parameters")?;
    let directory = config.keeper_directory();
    if !memory_mode && directory.len() != usize::from(shamir.total()) {
        eyre::bail!(
            "keeper_peers lists {} entries, but shamir_shares is configured as {}",
            directory.len(),
            shamir.total()
        );
    }
    if !memory_mode && !directory.meets_minimum(shamir.total()) {
        eyre::bail!(
            "keeper directory has {} entries, fewer than the configured total {}",
            directory.len(),
            shamir.total()
        );
    }

    let custodian = Arc::new(RootKeyCustodian::new());
    let http = reqwest::Client::new();

    let keeper_config = KeeperConfig {
        directory,
        shamir,
        tombstone_path: config.tombstone_path.clone(),
        bootstrap_retry_interval: std::time::Duration::from_secs(5),
        recovery_retry_floor: std::time::Duration::from_secs(1),
        recovery_operation_timeout: if config.recovery_operation_timeout.is_zero() {
            None
        } else {
            Some(config.recovery_operation_timeout)
        },
        redistribution_interval: config.recovery_keeper_update_interval,
    };

    tracing::info!("starting keeper protocol driver..");
    let driver = Driver::new(
        keeper_config,
        custodian.clone(),
        backend.clone(),
        http,
        memory_mode,
    );
    let keeper_driver = driver
        .start(cancellation_token)
        .await
        .context("while starting keeper protocol driver")?;

    let policy = Arc::new(PolicyEvaluator::new(
        backend.clone(),
        config.trust_root_for_pilot.clone(),
    ));

    let health_state = api::health::HealthState {
        custodian: custodian.clone(),
        memory_mode,
        backend_variant: backend_variant_label(config.backend_store),
    };
    let router = api::health::routes(health_state).layer(TraceLayer::new_for_http());

    Ok(NexusService {
        router,
        keeper_driver,
        backend,
        policy,
        custodian,
    })
}
