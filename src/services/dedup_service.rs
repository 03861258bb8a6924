//! The deduplicating processor and its lifecycle.
//!
//! A single worker drives the loop: fetch the next object, consult the
//! fingerprint index, record metadata, and conditionally copy first-seen
//! content to the destination bucket. Every object is independent, so no
//! per-object failure stops the run; only iterator exhaustion, the
//! configured limit, or an external stop request ends it.

use crate::metrics::OBJECTS_PROCESSED;
use crate::models::{descriptor::ObjectDescriptor, record::ObjectRecord};
use crate::services::{
    copier::{Copier, CopyOutcome},
    index::FingerprintIndex,
    lister::ObjectLister,
    object_store::ObjectStore,
};
use anyhow::{Context, Result};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Per-object processing result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// First occurrence of the fingerprint; the object was copied.
    Copied,
    /// Duplicate fingerprint or already-populated destination; metadata
    /// recorded, destination untouched.
    Skipped,
    /// Index or copy failure; nothing irreversible was done beyond what
    /// already succeeded.
    Failed,
}

/// Totals for one service run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub attempted: u64,
    pub copied: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Service-specific inputs, typically taken from the CLI.
#[derive(Debug, Clone)]
pub struct DedupOptions {
    pub src_bucket: String,
    pub dst_bucket: String,
    pub filter: Option<String>,
    pub limit: u64,
}

/// The dedup pipeline service.
///
/// Lifecycle is `Stopped -> Running -> Stopped`, terminal: [`Self::run`]
/// consumes the listing once and the service is not restartable. Readiness
/// reflects exactly the running state and is the sole health signal.
pub struct DedupService {
    store: Arc<dyn ObjectStore>,
    index: FingerprintIndex,
    copier: Copier,
    src_bucket: String,
    filter: Option<String>,
    limit: u64,
    ready: AtomicBool,
    cancel: CancellationToken,
}

impl DedupService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        index: FingerprintIndex,
        options: DedupOptions,
    ) -> Self {
        let copier = Copier::new(
            store.clone(),
            options.src_bucket.clone(),
            options.dst_bucket,
        );
        Self {
            store,
            index,
            copier,
            src_bucket: options.src_bucket,
            filter: options.filter,
            limit: options.limit,
            ready: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// True while the processing loop is running.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Request a cooperative stop; observed at the top of each iteration.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Token cancelled when the service is asked to stop.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drive the pipeline to completion.
    ///
    /// Schema initialization failure is fatal: the service never becomes
    /// ready and the error is returned. Everything after that is
    /// per-object: failures are logged, counted, and skipped over.
    pub async fn run(&self) -> Result<RunSummary> {
        self.index
            .ensure_schema()
            .await
            .context("initializing fingerprint index schema")?;

        let mut lister =
            ObjectLister::new(self.store.clone(), &self.src_bucket, self.filter.as_deref())
                .context("building source bucket lister")?;

        self.ready.store(true, Ordering::SeqCst);
        info!(
            src = %self.src_bucket,
            filter = self.filter.as_deref().unwrap_or("<none>"),
            limit = self.limit,
            "service ready"
        );

        let mut summary = RunSummary::default();
        loop {
            if self.cancel.is_cancelled() {
                info!("stop requested");
                break;
            }
            if self.limit != 0 && summary.attempted >= self.limit {
                info!(limit = self.limit, "limit reached");
                break;
            }

            let descriptor = match lister.next().await {
                Ok(Some(descriptor)) => descriptor,
                Ok(None) => {
                    info!("source listing exhausted");
                    break;
                }
                Err(err) => {
                    error!(error = %err, "failed to list next object");
                    continue;
                }
            };

            summary.attempted += 1;
            match self.process_one(&descriptor).await {
                Outcome::Copied => summary.copied += 1,
                Outcome::Skipped => summary.skipped += 1,
                Outcome::Failed => summary.failed += 1,
            }
        }

        self.ready.store(false, Ordering::SeqCst);
        Ok(summary)
    }

    /// Process a single listed object: count, record, conditionally copy.
    ///
    /// The count is taken strictly before this object's own insert, so
    /// reprocessing a name can never misclassify itself as new. Copy is only
    /// attempted after a successful metadata insert, keeping the invariant
    /// that every destination object has an index entry.
    async fn process_one(&self, descriptor: &ObjectDescriptor) -> Outcome {
        let record = ObjectRecord::from_descriptor(descriptor);

        let count = match self.index.count_by_fingerprint(descriptor.fingerprint).await {
            Ok(count) => count,
            Err(err) => {
                error!(name = %descriptor.name, error = %err, "failed to count existing fingerprints");
                OBJECTS_PROCESSED.with_label_values(&["error", "skip"]).inc();
                return Outcome::Failed;
            }
        };
        debug!(
            section = %record.section,
            name = %record.name,
            count,
            fingerprint = record.fingerprint,
            "fingerprint count"
        );

        if let Err(err) = self.index.insert(&record).await {
            error!(name = %descriptor.name, error = %err, "failed to record object metadata");
            OBJECTS_PROCESSED.with_label_values(&["error", "skip"]).inc();
            return Outcome::Failed;
        }

        let (outcome, operation) = if count == 0 {
            match self.copier.copy_if_absent(&descriptor.name).await {
                Ok(CopyOutcome::Copied) => (Outcome::Copied, "copy"),
                Ok(CopyOutcome::AlreadyPresent) => (Outcome::Skipped, "skip"),
                Err(err) => {
                    error!(name = %descriptor.name, error = %err, "failed to copy object");
                    OBJECTS_PROCESSED.with_label_values(&["error", "copy"]).inc();
                    return Outcome::Failed;
                }
            }
        } else {
            (Outcome::Skipped, "skip")
        };

        OBJECTS_PROCESSED.with_label_values(&["success", operation]).inc();
        info!(
            section = %record.section,
            name = %record.name,
            count,
            fingerprint = record.fingerprint,
            status = operation,
            "object processed"
        );
        outcome
    }
}
