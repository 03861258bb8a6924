//! Routes for the operational HTTP surface.
//!
//! - GET /healthz  -> liveness
//! - GET /readyz   -> readiness, tied to the service controller state
//! - GET /metrics  -> Prometheus text exposition
//!
//! The router carries the shared service handle so `/readyz` can read the
//! controller's readiness flag.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        metrics_handlers::metrics,
    },
    services::dedup_service::DedupService,
};
use axum::{Router, routing::get};
use std::sync::Arc;

/// Build and return the router for the health/metrics endpoints.
pub fn routes() -> Router<Arc<DedupService>> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
}
