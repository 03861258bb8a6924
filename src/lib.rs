//! Deduplicating copy pipeline for bucketed image collections.
//!
//! The pipeline enumerates every object in a source bucket, records a metadata
//! row for it in a durable fingerprint index, and copies the first occurrence
//! of each distinct content fingerprint into a destination bucket. Duplicate
//! detection is two-layered: the index count steers whether a copy is worth
//! attempting, while the destination's must-not-exist precondition is the
//! authoritative at-most-once guard.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod services;
