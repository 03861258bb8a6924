//! HTTP handlers for the health and metrics surface.

pub mod health_handlers;
pub mod metrics_handlers;
