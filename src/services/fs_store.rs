//! Filesystem-backed object store.
//!
//! Buckets are subdirectories of a configured root; objects are plain files
//! beneath their bucket. Listing walks a bucket recursively and paginates
//! over lexicographically ordered names with a `name > start_after` cursor.
//! The content fingerprint is the CRC32 checksum of the file bytes.

use crate::models::descriptor::ObjectDescriptor;
use crate::services::object_store::{ListPage, ObjectStore, StoreError, StoreResult};
use async_trait::async_trait;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use uuid::Uuid;
use walkdir::WalkDir;

const MAX_PAGE_LEN: usize = 1000;

pub struct FsObjectStore {
    /// Directory containing one subdirectory per bucket.
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bucket_root(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket)
    }

    /// Read an object's content and build its descriptor.
    async fn describe(&self, bucket_root: &Path, name: &str) -> StoreResult<ObjectDescriptor> {
        let bytes = fs::read(bucket_root.join(name))
            .await
            .map_err(|source| StoreError::ObjectUnreadable {
                name: name.to_string(),
                source,
            })?;
        Ok(ObjectDescriptor {
            name: name.to_string(),
            size: bytes.len() as u64,
            fingerprint: crc32fast::hash(&bytes),
        })
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn list_page(
        &self,
        bucket: &str,
        start_after: Option<&str>,
        limit: usize,
    ) -> StoreResult<ListPage> {
        let bucket_root = self.bucket_root(bucket);
        if !bucket_root.is_dir() {
            return Err(StoreError::BucketNotFound(bucket.to_string()));
        }

        let limit = limit.clamp(1, MAX_PAGE_LEN);
        let names = walk_bucket(&bucket_root)?;
        let mut remaining = names
            .into_iter()
            .filter(|name| start_after.is_none_or(|cursor| name.as_str() > cursor));
        let page: Vec<String> = remaining.by_ref().take(limit).collect();
        let next_token = if remaining.next().is_some() {
            page.last().cloned()
        } else {
            None
        };

        let mut entries = Vec::with_capacity(page.len());
        for name in &page {
            entries.push(self.describe(&bucket_root, name).await);
        }

        Ok(ListPage {
            entries,
            next_token,
        })
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        dst_bucket: &str,
        name: &str,
    ) -> StoreResult<()> {
        let src_root = self.bucket_root(src_bucket);
        if !src_root.is_dir() {
            return Err(StoreError::BucketNotFound(src_bucket.to_string()));
        }

        let bytes = fs::read(src_root.join(name))
            .await
            .map_err(|source| StoreError::ObjectUnreadable {
                name: name.to_string(),
                source,
            })?;

        let dst_path = self.bucket_root(dst_bucket).join(name);
        let parent = dst_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StoreError::Io(io::Error::new(
                ErrorKind::Other,
                "destination path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;

        // Write through a temporary sibling, then link into place. The link
        // step fails atomically when the destination already exists, so a
        // concurrent or prior copy can never be overwritten.
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;
        if let Err(err) = file.write_all(&bytes).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        drop(file);

        let linked = fs::hard_link(&tmp_path, &dst_path).await;
        let _ = fs::remove_file(&tmp_path).await;
        match linked {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                Err(StoreError::PreconditionFailed(name.to_string()))
            }
            Err(err) => Err(StoreError::Io(err)),
        }
    }
}

/// Collect the relative, `/`-separated names of all files in a bucket,
/// lexicographically sorted. In-flight copy temporaries are not objects.
fn walk_bucket(bucket_root: &Path) -> StoreResult<Vec<String>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(bucket_root).min_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with(".tmp-") {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(bucket_root)
            .map_err(|err| StoreError::Io(io::Error::new(ErrorKind::Other, err)))?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        names.push(name);
    }
    names.sort();
    Ok(names)
}
