//! Process-wide Prometheus counters.

use once_cell::sync::Lazy;
use prometheus::{IntCounterVec, register_int_counter_vec};

/// One increment per processed object. `status` is `success` or `error`;
/// `operation` is `copy` when a destination write was attempted, `skip`
/// otherwise.
pub static OBJECTS_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "images_objects_processed_total",
        "Total objects processed by the dedup pipeline",
        &["status", "operation"]
    )
    .expect("Failed to register images_objects_processed_total metric")
});
