//! Pluggable object-store abstraction.
//!
//! The pipeline consumes bucketed storage exclusively through [`ObjectStore`],
//! so a cloud backend can replace the filesystem one without touching the
//! processing loop. Listing is paginated and forward-only; copying is guarded
//! by a destination-must-not-exist precondition.

use crate::models::descriptor::ObjectDescriptor;
use async_trait::async_trait;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bucket `{0}` not found")]
    BucketNotFound(String),
    #[error("destination object `{0}` already exists")]
    PreconditionFailed(String),
    #[error("object `{name}` could not be read: {source}")]
    ObjectUnreadable {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One page of a bucket listing.
///
/// Entries are per-object results: an unreadable object is carried as an
/// `Err` in its slot rather than failing the whole page, so the caller can
/// skip it and keep iterating. `next_token` is the opaque continuation
/// cursor; `None` means the listing is exhausted after this page.
#[derive(Debug)]
pub struct ListPage {
    pub entries: Vec<StoreResult<ObjectDescriptor>>,
    pub next_token: Option<String>,
}

/// Contract for bucketed object storage backends.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one page of object descriptors from `bucket`, in the backend's
    /// native listing order, starting strictly after `start_after`.
    async fn list_page(
        &self,
        bucket: &str,
        start_after: Option<&str>,
        limit: usize,
    ) -> StoreResult<ListPage>;

    /// Copy `name` from `src_bucket` to `dst_bucket`, failing with
    /// [`StoreError::PreconditionFailed`] when the destination object
    /// already exists. The destination is never overwritten.
    async fn copy_object(&self, src_bucket: &str, dst_bucket: &str, name: &str)
    -> StoreResult<()>;
}
