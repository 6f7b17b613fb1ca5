//! Probe and metrics HTTP server.
//!
//! - `/healthz`: liveness, always 200 while the process serves requests
//! - `/readyz`: 200 once the CAPI cluster cache has synced, 503 before
//! - `/metrics`: Prometheus text format

use crate::error::ControllerError;
use crate::metrics;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Readiness flag shared between the watcher and the probe server.
#[derive(Debug, Clone, Default)]
pub struct Readiness(Arc<AtomicBool>);

impl Readiness {
    pub fn set_ready(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Build the probe router.
pub fn router(readiness: Readiness) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(readiness)
}

async fn readyz(State(readiness): State<Readiness>) -> Response {
    if readiness.is_ready() {
        (StatusCode::OK, "ok").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "cache not synced").into_response()
    }
}

async fn metrics_handler() -> Response {
    let Some(metrics) = metrics::global_metrics() else {
        return (StatusCode::OK, String::new()).into_response();
    };
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Serve probes on `addr` until the task is dropped.
pub async fn serve(addr: SocketAddr, readiness: Readiness) -> Result<(), ControllerError> {
    let listener = TcpListener::bind(addr).await?;
    info!("Probe server listening on {}", addr);
    axum::serve(listener, router(readiness)).await?;
    Ok(())
}
