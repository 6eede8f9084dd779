//! Liveness, readiness and metrics endpoint.
//!
//! - `GET /healthz` → `ok` while the process serves requests
//! - `GET /readyz` → 200 once schemas are bootstrapped and every controller
//!   is running, 503 otherwise
//! - `GET /metrics` → Prometheus text format

use crate::error::ControllerError;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use informer::{ControllerState, StateHandle};
use prometheus::{Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Readiness inputs shared between the orchestrator and the probe server.
#[derive(Debug, Clone, Default)]
pub struct Readiness {
    bootstrapped: Arc<AtomicBool>,
    controllers: Vec<StateHandle>,
}

impl Readiness {
    /// Track the given controllers.
    pub fn new(controllers: Vec<StateHandle>) -> Self {
        Self {
            bootstrapped: Arc::new(AtomicBool::new(false)),
            controllers,
        }
    }

    /// Record that every schema has been confirmed.
    pub fn mark_bootstrapped(&self) {
        self.bootstrapped.store(true, Ordering::SeqCst);
    }

    /// Whether the process should receive traffic.
    pub fn is_ready(&self) -> bool {
        self.bootstrapped.load(Ordering::SeqCst)
            && self
                .controllers
                .iter()
                .all(|state| state.get() == ControllerState::Running)
    }
}

#[derive(Clone)]
struct ProbeState {
    registry: Registry,
    readiness: Readiness,
}

/// Build the probe router.
pub fn router(registry: Registry, readiness: Readiness) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(ProbeState { registry, readiness })
}

async fn readyz(State(state): State<ProbeState>) -> (StatusCode, &'static str) {
    if state.readiness.is_ready() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}

async fn metrics(State(state): State<ProbeState>) -> Response {
    match TextEncoder::new().encode_to_string(&state.registry.gather()) {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Serve the probe router on `addr` until `cancel` fires.
pub async fn serve(
    addr: SocketAddr,
    registry: Registry,
    readiness: Readiness,
    cancel: CancellationToken,
) -> Result<(), ControllerError> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Starting probe server");
    axum::serve(listener, router(registry, readiness))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    Ok(())
}
