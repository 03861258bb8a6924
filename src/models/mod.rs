//! Core data models for the dedup pipeline.
//!
//! A listing produces [`descriptor::ObjectDescriptor`]s; the processor turns
//! each one into an [`record::ObjectRecord`], which maps to the index table
//! via `sqlx::FromRow`.

pub mod descriptor;
pub mod record;
