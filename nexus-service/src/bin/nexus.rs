//! Nexus binary.
//!
//! The main entry point for a Nexus root-of-trust instance. Initializes
//! tracing, parses configuration, starts the Keeper protocol driver and
//! serves the health endpoint, shutting down gracefully on `SIGINT`/`SIGTERM`.
//!
//! Grounded on `oprf-key-gen`'s `main.rs`, with `nodes_observability`'s
//! tracing setup replaced by `tracing_subscriber` directly (that crate has
//! no public counterpart outside the teacher's own workspace) and
//! `nodes_common`'s shutdown helpers replaced by a `CancellationToken` built
//! from `tokio::signal` directly.

use std::process::ExitCode;

use clap::Parser;
use eyre::Context;
use nexus_service::config::NexusConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("can install");

    let config = NexusConfig::parse();
    tracing::info!("starting nexus with config: {config:#?}");

    let cancellation_token = CancellationToken::new();
    let bind_addr = config.bind_addr;
    let max_wait_time_shutdown = config.max_wait_time_shutdown;

    let service = nexus_service::start(config, cancellation_token.clone())
        .await
        .context("while starting nexus service")?;

    let tcp_listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .context("while binding tcp listener")?;

    let axum_cancel_token = cancellation_token.clone();
    let server = tokio::spawn(async move {
        tracing::info!("starting axum server on {bind_addr}");
        let axum_result = axum::serve(tcp_listener, service.router)
            .with_graceful_shutdown(async move { axum_cancel_token.cancelled().await })
            .await;
        tracing::info!("axum server shutdown");
        if let Err(err) = axum_result {
            tracing::error!("got error from axum: {err:?}");
        }
    });

    tracing::info!("everything started successfully - waiting for shutdown signal..");
    tokio::select! {
        _ = shutdown_signal() => {
            tracing::info!("received shutdown signal");
        }
        _ = cancellation_token.cancelled() => {
            tracing::warn!("a background task cancelled the token, shutting down");
        }
    }
    cancellation_token.cancel();

    let graceful = tokio::time::timeout(max_wait_time_shutdown, async {
        tokio::join!(server, service.keeper_driver)
    })
    .await
    .is_ok();

    tracing::info!("good night!");
    if graceful {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::warn!("could not finish shutdown in time");
        Ok(ExitCode::FAILURE)
    }
}
