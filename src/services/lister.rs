//! Lazy, forward-only iteration over a source bucket.
//!
//! Buffers one listing page at a time and applies the optional glob filter
//! per item. A per-item error is returned with the cursor already advanced
//! past the offending object, so a caller that logs-and-continues is
//! guaranteed to make progress.

use crate::models::descriptor::ObjectDescriptor;
use crate::services::object_store::{ObjectStore, StoreError};
use glob::Pattern;
use std::{collections::VecDeque, sync::Arc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ListError {
    #[error("invalid name filter `{pattern}`: {source}")]
    InvalidFilter {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Objects fetched per backend call.
const PAGE_SIZE: usize = 256;

pub struct ObjectLister {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    filter: Option<Pattern>,
    buffered: VecDeque<Result<ObjectDescriptor, StoreError>>,
    next_token: Option<String>,
    exhausted: bool,
}

impl std::fmt::Debug for ObjectLister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectLister")
            .field("bucket", &self.bucket)
            .field("filter", &self.filter)
            .field("buffered", &self.buffered)
            .field("next_token", &self.next_token)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

impl ObjectLister {
    /// Build a lister over `bucket`, optionally restricted to names matching
    /// `filter`. An invalid pattern fails construction.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        filter: Option<&str>,
    ) -> Result<Self, ListError> {
        let filter = filter
            .map(|pattern| {
                Pattern::new(pattern).map_err(|source| ListError::InvalidFilter {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .transpose()?;
        Ok(Self {
            store,
            bucket: bucket.into(),
            filter,
            buffered: VecDeque::new(),
            next_token: None,
            exhausted: false,
        })
    }

    /// Next matching object, `Ok(None)` on exhaustion.
    ///
    /// An `Err` covers a single unreadable object (or a failed page, which
    /// also ends the listing); calling again continues behind it.
    pub async fn next(&mut self) -> Result<Option<ObjectDescriptor>, ListError> {
        loop {
            while let Some(entry) = self.buffered.pop_front() {
                match entry {
                    Ok(descriptor) => {
                        if self.matches(&descriptor.name) {
                            return Ok(Some(descriptor));
                        }
                    }
                    Err(err) => return Err(err.into()),
                }
            }

            if self.exhausted {
                return Ok(None);
            }

            let token = self.next_token.take();
            let page = match self
                .store
                .list_page(&self.bucket, token.as_deref(), PAGE_SIZE)
                .await
            {
                Ok(page) => page,
                Err(err) => {
                    self.exhausted = true;
                    return Err(err.into());
                }
            };
            self.exhausted = page.next_token.is_none();
            self.next_token = page.next_token;
            self.buffered = page.entries.into();
        }
    }

    fn matches(&self, name: &str) -> bool {
        self.filter
            .as_ref()
            .is_none_or(|pattern| pattern.matches(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fs_store::FsObjectStore;
    use std::path::Path;
    use tempfile::TempDir;

    fn seed(root: &Path, bucket: &str, name: &str, contents: &[u8]) {
        let path = root.join(bucket).join(name);
        std::fs::create_dir_all(path.parent().expect("object path has a parent"))
            .expect("create bucket directories");
        std::fs::write(path, contents).expect("write object");
    }

    async fn collect(lister: &mut ObjectLister) -> Vec<String> {
        let mut names = Vec::new();
        loop {
            match lister.next().await {
                Ok(Some(descriptor)) => names.push(descriptor.name),
                Ok(None) => break,
                Err(err) => panic!("unexpected listing error: {err}"),
            }
        }
        names
    }

    #[tokio::test]
    async fn enumerates_all_objects_without_a_filter() {
        let dir = TempDir::new().expect("tempdir");
        seed(dir.path(), "src", "A/1/x.jpg", b"x");
        seed(dir.path(), "src", "B/2/y.jpg", b"y");

        let store = Arc::new(FsObjectStore::new(dir.path()));
        let mut lister = ObjectLister::new(store, "src", None).expect("lister");
        assert_eq!(collect(&mut lister).await, vec!["A/1/x.jpg", "B/2/y.jpg"]);

        // A drained lister stays exhausted.
        assert!(lister.next().await.expect("exhausted").is_none());
    }

    #[tokio::test]
    async fn glob_filter_restricts_the_listing() {
        let dir = TempDir::new().expect("tempdir");
        seed(dir.path(), "src", "A/1/x.jpg", b"x");
        seed(dir.path(), "src", "A/2/y.jpg", b"y");
        seed(dir.path(), "src", "B/2/z.jpg", b"z");

        let store = Arc::new(FsObjectStore::new(dir.path()));
        let mut lister = ObjectLister::new(store, "src", Some("A/**")).expect("lister");
        assert_eq!(collect(&mut lister).await, vec!["A/1/x.jpg", "A/2/y.jpg"]);
    }

    #[tokio::test]
    async fn invalid_pattern_fails_construction() {
        let dir = TempDir::new().expect("tempdir");
        let store = Arc::new(FsObjectStore::new(dir.path()));
        let err = ObjectLister::new(store, "src", Some("a[")).unwrap_err();
        assert!(matches!(err, ListError::InvalidFilter { pattern, .. } if pattern == "a["));
    }

    #[tokio::test]
    async fn missing_bucket_surfaces_once_then_ends_the_listing() {
        let dir = TempDir::new().expect("tempdir");
        let store = Arc::new(FsObjectStore::new(dir.path()));
        let mut lister = ObjectLister::new(store, "absent", None).expect("lister");

        let err = lister.next().await.unwrap_err();
        assert!(matches!(
            err,
            ListError::Store(StoreError::BucketNotFound(_))
        ));
        assert!(lister.next().await.expect("ended").is_none());
    }
}
