//! Conditional source-to-destination copy.
//!
//! The destination's must-not-exist precondition is the authoritative
//! at-most-once guard: a violation means a prior or concurrent run already
//! populated the object, which is a benign no-op here, never an error.

use crate::services::object_store::{ObjectStore, StoreError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("copy of `{name}` failed: {source}")]
pub struct CopyError {
    pub name: String,
    #[source]
    pub source: StoreError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    /// The destination object was created by this call.
    Copied,
    /// The destination object already existed; nothing was written.
    AlreadyPresent,
}

pub struct Copier {
    store: Arc<dyn ObjectStore>,
    src_bucket: String,
    dst_bucket: String,
}

impl Copier {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        src_bucket: impl Into<String>,
        dst_bucket: impl Into<String>,
    ) -> Self {
        Self {
            store,
            src_bucket: src_bucket.into(),
            dst_bucket: dst_bucket.into(),
        }
    }

    /// Copy `name` into the destination bucket unless it is already there.
    pub async fn copy_if_absent(&self, name: &str) -> Result<CopyOutcome, CopyError> {
        match self
            .store
            .copy_object(&self.src_bucket, &self.dst_bucket, name)
            .await
        {
            Ok(()) => Ok(CopyOutcome::Copied),
            Err(StoreError::PreconditionFailed(_)) => {
                tracing::debug!(name, "destination already populated, copy is a no-op");
                Ok(CopyOutcome::AlreadyPresent)
            }
            Err(source) => Err(CopyError {
                name: name.to_string(),
                source,
            }),
        }
    }
}
