//! Health check endpoint.
//!
//! Reports whether the root-key custodian has left the *zero* state (or is
//! exempt from ever doing so, in memory-only mode) and which backend
//! variant is in use. This is observability surface only, not the
//! secret/policy CRUD API, which `spec.md` §1 places out of scope.
//!
//! Grounded on `oprf-key-gen::api::health`: same `200`/`"healthy"` vs.
//! `503`/`"starting"` contract and `Cache-Control: no-cache` header.

use std::sync::Arc;

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use nexus_core::RootKeyCustodian;
use serde::Serialize;
use tower_http::set_header::SetResponseHeaderLayer;

/// State the health endpoint needs: the custodian to probe and a label for
/// the configured backend variant.
#[derive(Clone)]
pub struct HealthState {
    /// The process-singleton root-key custodian.
    pub custodian: Arc<RootKeyCustodian>,
    /// `true` iff the backend variant is `memory` (the custodian is never
    /// installed in that mode, so its zero state never resolves).
    pub memory_mode: bool,
    /// The configured backend variant, for diagnostics only.
    pub backend_variant: &'static str,
}

#[derive(Serialize)]
struct HealthBody {
    custodian: &'static str,
    backend: &'static str,
}

/// Builds the `/healthz` route with a `Cache-Control: no-cache` header.
pub fn routes(state: HealthState) -> Router {
    Router::new()
        .route("/healthz", get(move || healthz(state)))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        ))
}

/// Returns `200 OK` once the custodian holds a live root key (or is in
/// memory-only mode, where it never needs one); `503 Service Unavailable`
/// while bootstrap or recovery is still in progress.
async fn healthz(state: HealthState) -> impl IntoResponse {
    let live = state.memory_mode || !state.custodian.is_zero();
    let body = HealthBody {
        custodian: if live { "live" } else { "zero" },
        backend: state.backend_variant,
    };
    let status = if live {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}
