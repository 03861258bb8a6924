//! Prometheus text exposition for the default registry.

use crate::errors::AppError;
use axum::{http::StatusCode, response::IntoResponse};
use prometheus::{Encoder, TextEncoder};

/// `GET /metrics`
pub async fn metrics() -> Result<impl IntoResponse, AppError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|err| AppError::internal(format!("failed to encode metrics: {}", err)))?;
    let body = String::from_utf8(buffer)
        .map_err(|err| AppError::internal(format!("metrics are not valid UTF-8: {}", err)))?;
    Ok((StatusCode::OK, body))
}
