//! End-to-end bootstrap/recover cycle (`spec.md` §8 scenario 1), against an
//! in-process mock Keeper HTTP server and a real file-backed SQLite
//! database, following the teacher's `axum-test`/in-process-server pattern
//! for its own integration suites.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use axum_test::TestServer;
use nexus_backend::Backend as _;
use nexus_service::config::{BackendStore, NexusConfig};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

#[derive(Deserialize)]
struct ContributeRequest {
    #[allow(dead_code)]
    keeper_id: String,
    shard: [u8; 32],
}

#[derive(Serialize)]
struct ShardResponse {
    shard: [u8; 32],
}

#[derive(Clone, Default)]
struct MockKeeperState {
    shard: Arc<Mutex<[u8; 32]>>,
}

async fn contribute(State(state): State<MockKeeperState>, Json(req): Json<ContributeRequest>) {
    *state.shard.lock().unwrap() = req.shard;
}

async fn shard(State(state): State<MockKeeperState>) -> Json<ShardResponse> {
    Json(ShardResponse {
        shard: *state.shard.lock().unwrap(),
    })
}

struct MockKeeper {
    addr: SocketAddr,
    state: MockKeeperState,
    handle: tokio::task::JoinHandle<()>,
}

async fn spawn_mock_keeper() -> MockKeeper {
    let state = MockKeeperState::default();
    let router = Router::new()
        .route("/contribute", post(contribute))
        .route("/shard", post(shard))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    MockKeeper { addr, state, handle }
}

fn base_config(keeper_peers: Vec<String>, database_url: String, tombstone_path: std::path::PathBuf) -> NexusConfig {
    NexusConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        backend_store: BackendStore::Sqlite,
        database_url,
        keeper_peers,
        shamir_threshold: 2,
        shamir_shares: 3,
        tombstone_path,
        recovery_operation_timeout: Duration::ZERO,
        recovery_keeper_update_interval: Duration::from_secs(3600),
        max_secret_versions: std::num::NonZeroU64::new(10).unwrap(),
        trust_root_for_pilot: "spiffe://ex.org/pilot".to_owned(),
        max_wait_time_shutdown: Duration::from_secs(5),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bootstrap_then_recover_reconstructs_the_same_root_key() {
    let keeper_a = spawn_mock_keeper().await;
    let keeper_b = spawn_mock_keeper().await;
    let keeper_c = spawn_mock_keeper().await;

    let db_path = std::env::temp_dir().join(format!(
        "nexus-bootstrap-recover-{}-{}.db",
        std::process::id(),
        rand_suffix()
    ));
    let tombstone_path = std::env::temp_dir().join(format!(
        "nexus-bootstrap-recover-{}-{}.tombstone",
        std::process::id(),
        rand_suffix()
    ));
    let _ = std::fs::remove_file(&db_path);
    let _ = std::fs::remove_file(&tombstone_path);
    let database_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let keeper_peers = vec![
        format!("http://{}", keeper_a.addr),
        format!("http://{}", keeper_b.addr),
        format!("http://{}", keeper_c.addr),
    ];

    // First run: no tombstone yet, so this bootstraps a fresh root key and
    // pushes shares to all three mock keepers.
    let config_a = base_config(keeper_peers.clone(), database_url.clone(), tombstone_path.clone());
    let token_a = CancellationToken::new();
    let service_a = nexus_service::start(config_a, token_a.clone())
        .await
        .expect("bootstrap run should start cleanly");

    let server_a = TestServer::new(service_a.router).unwrap();
    let health = server_a.get("/healthz").await;
    health.assert_status_ok();

    let original_key = service_a
        .custodian
        .with_key(|key| *key)
        .expect("custodian should hold the freshly bootstrapped key");

    service_a
        .backend
        .store_secret(
            "/a",
            HashMap::from([("k".to_owned(), "v".to_owned())]),
            1,
            10,
        )
        .await
        .expect("storing a secret under the fresh root key should succeed");

    token_a.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), service_a.keeper_driver).await;
    assert!(
        tombstone_path.exists(),
        "bootstrap must leave a tombstone behind"
    );

    // Simulate "only two of three keepers are reachable" by killing keeper
    // C before the second run starts its recovery pass.
    keeper_c.handle.abort();

    let config_b = base_config(keeper_peers, database_url, tombstone_path);
    let token_b = CancellationToken::new();
    let service_b = nexus_service::start(config_b, token_b.clone())
        .await
        .expect("recovery run should reconstruct the root key from keepers A and B alone");

    let recovered_key = service_b
        .custodian
        .with_key(|key| *key)
        .expect("custodian should hold the recovered key");
    assert_eq!(
        original_key, recovered_key,
        "recovery must reconstruct the exact bootstrapped root key"
    );

    let secret = service_b
        .backend
        .load_secret("/a")
        .await
        .expect("the secret written before restart must still be readable");
    let current = secret
        .active_current_version()
        .expect("current version should not be deleted");
    assert_eq!(current.data["k"], "v");

    token_b.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), service_b.keeper_driver).await;
    keeper_a.handle.abort();
    keeper_b.handle.abort();
    let _ = std::fs::remove_file(&db_path);
    let _ = std::fs::remove_file(&tombstone_path);
}

/// A small process-local counter, standing in for a random suffix so two
/// concurrent test runs on the same machine don't collide on a shared temp
/// file path. Not a security-sensitive use of randomness.
fn rand_suffix() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}
