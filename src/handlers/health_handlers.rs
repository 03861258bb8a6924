//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness reflecting the processing loop state

use crate::services::dedup_service::DedupService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::sync::Arc;

/// `GET /healthz`
///
/// Very small liveness probe — always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe tied to the service controller: 200 while the processing
/// loop is running, 503 before schema initialization succeeds and after the
/// run has stopped.
pub async fn readyz(State(service): State<Arc<DedupService>>) -> impl IntoResponse {
    let ready = service.is_ready();
    let body = ReadyResponse {
        status: if ready { "ok".into() } else { "not ready".into() },
        ready,
    };
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    ready: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        dedup_service::DedupOptions, fs_store::FsObjectStore, index::FingerprintIndex,
    };
    use sqlx::sqlite::SqlitePoolOptions;
    use tempfile::TempDir;

    #[tokio::test]
    async fn readyz_reports_not_ready_before_the_run_starts() {
        let dir = TempDir::new().expect("tempdir");
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory database");
        let service = Arc::new(DedupService::new(
            Arc::new(FsObjectStore::new(dir.path())),
            FingerprintIndex::new(Arc::new(pool)),
            DedupOptions {
                src_bucket: "src".into(),
                dst_bucket: "dst".into(),
                filter: None,
                limit: 0,
            },
        ));

        let response = readyz(State(service)).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
