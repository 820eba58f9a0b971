//! Upload queue and the tracker that drives it.
//!
//! Every selected file becomes an [`UploadItem`] that moves through
//! `pending → uploading → {success | error}`. The [`UploadQueue`] owns the
//! items and enforces the transitions; the [`UploadTracker`] runs the match
//! lookup and the upload for each item against an [`IngestApi`].
//!
//! ## Limits
//!
//! A batch may hold at most [`MAX_FILES_PER_BATCH`] files and each file at
//! most [`MAX_FILE_SIZE_BYTES`]. An oversized batch is refused whole; an
//! oversized file is refused on its own. Refused files never enter the queue.
//!
//! ## Cancellation
//!
//! Each item carries a [`CancellationToken`]. Removing an item cancels it,
//! which abandons whichever request the item is waiting on. Removed items
//! produce no notification.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

use crate::api::{IngestApi, UploadFile};
use crate::error::{Error, Result};
use crate::id::UploadId;
use crate::model::Dataset;
use crate::notify::{Notification, Notifier};
use crate::observability::upload_span;

/// Maximum number of files accepted in one selection.
pub const MAX_FILES_PER_BATCH: usize = 10;

/// Maximum size of a single file (300 MiB).
pub const MAX_FILE_SIZE_BYTES: u64 = 300 * 1024 * 1024;

/// Upper bound on concurrently processed items.
pub const MAX_CONCURRENCY: usize = MAX_FILES_PER_BATCH;

/// Upload item state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UploadStatus {
    /// Queued, nothing sent yet.
    #[default]
    Pending,
    /// File bytes are being sent.
    Uploading,
    /// The service accepted the file.
    Success,
    /// The upload failed.
    Error,
}

impl UploadStatus {
    /// Returns true if this is a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }

    /// Returns true if the transition from self to target is valid.
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        match self {
            Self::Pending => matches!(target, Self::Uploading),
            Self::Uploading => matches!(target, Self::Success | Self::Error),
            Self::Success | Self::Error => false,
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Uploading => write!(f, "uploading"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One selected file and its upload progress.
#[derive(Debug, Clone)]
pub struct UploadItem {
    id: UploadId,
    file: UploadFile,
    status: UploadStatus,
    progress: u8,
    matched: Option<Dataset>,
    error: Option<String>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    cancel: CancellationToken,
}

impl UploadItem {
    fn new(file: UploadFile) -> Self {
        Self {
            id: UploadId::generate(),
            file,
            status: UploadStatus::Pending,
            progress: 0,
            matched: None,
            error: None,
            started_at: None,
            finished_at: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Queue-unique identifier.
    #[must_use]
    pub fn id(&self) -> UploadId {
        self.id
    }

    /// The selected file.
    #[must_use]
    pub fn file(&self) -> &UploadFile {
        &self.file
    }

    /// Current state.
    #[must_use]
    pub fn status(&self) -> UploadStatus {
        self.status
    }

    /// Completion percentage; 100 once the upload succeeded.
    #[must_use]
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Dataset the service matched the file name to, once known.
    #[must_use]
    pub fn matched(&self) -> Option<&Dataset> {
        self.matched.as_ref()
    }

    /// Failure cause for items in the error state.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns "Matched dataset: <name>" once a match is attached.
    #[must_use]
    pub fn match_label(&self) -> Option<String> {
        self.matched
            .as_ref()
            .map(|d| format!("Matched dataset: {}", d.dataset_name))
    }

    /// When the upload request started.
    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// When the item reached a terminal state.
    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Time from upload start to completion, for finished items.
    #[must_use]
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        Some(self.finished_at? - self.started_at?)
    }

    /// Whether removal has cancelled this item.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn transition(&mut self, target: UploadStatus) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(Error::InvalidTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        self.status = target;
        match target {
            UploadStatus::Uploading => self.started_at = Some(Utc::now()),
            UploadStatus::Success => {
                self.progress = 100;
                self.finished_at = Some(Utc::now());
            }
            UploadStatus::Error => self.finished_at = Some(Utc::now()),
            UploadStatus::Pending => {}
        }
        Ok(())
    }
}

impl fmt::Display for UploadItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.2} MB) {}",
            self.file.name(),
            self.file.size_mb(),
            self.status
        )?;
        if let Some(label) = self.match_label() {
            write!(f, " - {label}")?;
        }
        Ok(())
    }
}

/// Why a selected file did not enter the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// The selection held more files than a batch allows.
    TooManyFiles {
        /// Files in the selection.
        count: usize,
        /// Allowed maximum.
        max: usize,
    },
    /// The file exceeded the size limit.
    FileTooLarge {
        /// File size in bytes.
        size: u64,
        /// Allowed maximum in bytes.
        max: u64,
    },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyFiles { count, max } => {
                write!(f, "too many files: {count} selected, at most {max} allowed")
            }
            Self::FileTooLarge { size, max } => {
                write!(f, "file too large: {size} bytes, at most {max} allowed")
            }
        }
    }
}

/// A file refused at admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Name of the refused file.
    pub file_name: String,
    /// Why it was refused.
    pub reason: RejectionReason,
}

/// Outcome of admitting a selection into the queue.
#[derive(Debug, Clone, Default)]
pub struct BatchAdmission {
    /// IDs of the queued items, in selection order.
    pub accepted: Vec<UploadId>,
    /// Files that were refused.
    pub rejected: Vec<Rejection>,
}

/// Item counts by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueSummary {
    /// Items in the queue.
    pub total: usize,
    /// Items not yet started.
    pub pending: usize,
    /// Items being sent.
    pub uploading: usize,
    /// Items accepted by the service.
    pub succeeded: usize,
    /// Items that failed.
    pub failed: usize,
}

impl QueueSummary {
    /// Items in a terminal state.
    #[must_use]
    pub fn terminal(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Returns true when no item is pending or uploading.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.pending == 0 && self.uploading == 0
    }

    /// Share of items in a terminal state, from 0.0 to 100.0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.terminal() as f64 / self.total as f64) * 100.0
        }
    }
}

/// Ordered collection of upload items.
#[derive(Debug, Default)]
pub struct UploadQueue {
    items: Vec<UploadItem>,
}

impl UploadQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a selection and appends the accepted files as pending items.
    pub fn admit(&mut self, files: Vec<UploadFile>) -> BatchAdmission {
        let mut admission = BatchAdmission::default();

        if files.len() > MAX_FILES_PER_BATCH {
            let count = files.len();
            admission.rejected = files
                .into_iter()
                .map(|file| Rejection {
                    file_name: file.name().to_string(),
                    reason: RejectionReason::TooManyFiles {
                        count,
                        max: MAX_FILES_PER_BATCH,
                    },
                })
                .collect();
            return admission;
        }

        for file in files {
            if file.size() > MAX_FILE_SIZE_BYTES {
                admission.rejected.push(Rejection {
                    file_name: file.name().to_string(),
                    reason: RejectionReason::FileTooLarge {
                        size: file.size(),
                        max: MAX_FILE_SIZE_BYTES,
                    },
                });
                continue;
            }
            let item = UploadItem::new(file);
            admission.accepted.push(item.id);
            self.items.push(item);
        }

        admission
    }

    /// Items in queue order.
    #[must_use]
    pub fn items(&self) -> &[UploadItem] {
        &self.items
    }

    /// Looks up one item.
    #[must_use]
    pub fn get(&self, id: UploadId) -> Option<&UploadItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the queue holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Moves an item to `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the item is gone or the transition is not allowed.
    pub fn transition(&mut self, id: UploadId, target: UploadStatus) -> Result<()> {
        self.get_mut(id)?.transition(target)
    }

    /// Attaches the match lookup result to an item.
    ///
    /// # Errors
    ///
    /// Returns an error if the item is gone.
    pub fn attach_match(&mut self, id: UploadId, matched: Option<Dataset>) -> Result<()> {
        self.get_mut(id)?.matched = matched;
        Ok(())
    }

    /// Marks an item as failed and records the cause.
    ///
    /// # Errors
    ///
    /// Returns an error if the item is gone or already terminal.
    pub fn fail(&mut self, id: UploadId, cause: impl Into<String>) -> Result<()> {
        let item = self.get_mut(id)?;
        item.transition(UploadStatus::Error)?;
        item.error = Some(cause.into());
        Ok(())
    }

    /// Removes exactly one item, cancelling any work it has in flight.
    pub fn remove(&mut self, id: UploadId) -> Option<UploadItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        let item = self.items.remove(index);
        item.cancel.cancel();
        Some(item)
    }

    /// Removes every item in a terminal state and returns how many went.
    pub fn clear_finished(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !item.status.is_terminal());
        before - self.items.len()
    }

    /// Counts items by state.
    #[must_use]
    pub fn summary(&self) -> QueueSummary {
        let mut summary = QueueSummary {
            total: self.items.len(),
            ..QueueSummary::default()
        };
        for item in &self.items {
            match item.status {
                UploadStatus::Pending => summary.pending += 1,
                UploadStatus::Uploading => summary.uploading += 1,
                UploadStatus::Success => summary.succeeded += 1,
                UploadStatus::Error => summary.failed += 1,
            }
        }
        summary
    }

    fn get_mut(&mut self, id: UploadId) -> Result<&mut UploadItem> {
        self.items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| Error::not_found("upload", id))
    }
}

/// Drives queued items through match lookup and upload.
///
/// The queue lives behind a mutex shared with in-flight item tasks; the lock
/// is never held across an await.
#[derive(Clone)]
pub struct UploadTracker {
    api: Arc<dyn IngestApi>,
    notifier: Arc<dyn Notifier>,
    queue: Arc<Mutex<UploadQueue>>,
    concurrency: usize,
    metadata: Option<String>,
}

impl fmt::Debug for UploadTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadTracker")
            .field("concurrency", &self.concurrency)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl UploadTracker {
    /// Creates a tracker that processes one item at a time.
    #[must_use]
    pub fn new(api: Arc<dyn IngestApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            queue: Arc::new(Mutex::new(UploadQueue::new())),
            concurrency: 1,
            metadata: None,
        }
    }

    /// Sets how many items may be processed at once, clamped to
    /// `1..=MAX_CONCURRENCY`.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    /// Sets the metadata string sent with every upload.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Option<String>) -> Self {
        self.metadata = metadata.filter(|m| !m.is_empty());
        self
    }

    /// Effective concurrency.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Admits a selection into the queue without starting any work.
    pub fn enqueue(&self, files: Vec<UploadFile>) -> BatchAdmission {
        let admission = self.lock().admit(files);
        for rejection in &admission.rejected {
            warn!(file = %rejection.file_name, reason = %rejection.reason, "file rejected");
        }
        admission
    }

    /// Admits a selection and processes the accepted items to completion.
    pub async fn submit(&self, files: Vec<UploadFile>) -> BatchAdmission {
        let admission = self.enqueue(files);
        self.process(&admission.accepted).await;
        admission
    }

    /// Processes the given items; returns the queue summary afterwards.
    ///
    /// Items that were removed, or are no longer pending, are skipped.
    pub async fn process(&self, ids: &[UploadId]) -> QueueSummary {
        futures::stream::iter(ids.iter().copied())
            .for_each_concurrent(self.concurrency, |id| self.process_item(id))
            .await;
        self.summary()
    }

    /// Removes one item from the queue, cancelling its in-flight request.
    pub fn remove(&self, id: UploadId) -> Option<UploadItem> {
        let removed = self.lock().remove(id);
        if let Some(item) = &removed {
            debug!(id = %id, file = %item.file().name(), status = %item.status(), "upload removed");
        }
        removed
    }

    /// Removes every finished item.
    pub fn clear_finished(&self) -> usize {
        self.lock().clear_finished()
    }

    /// Copy of the current queue contents.
    #[must_use]
    pub fn snapshot(&self) -> Vec<UploadItem> {
        self.lock().items().to_vec()
    }

    /// Copy of one item.
    #[must_use]
    pub fn item(&self, id: UploadId) -> Option<UploadItem> {
        self.lock().get(id).cloned()
    }

    /// Current counts by state.
    #[must_use]
    pub fn summary(&self) -> QueueSummary {
        self.lock().summary()
    }

    fn lock(&self) -> MutexGuard<'_, UploadQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn process_item(&self, id: UploadId) {
        let claimed = {
            let queue = self.lock();
            queue
                .get(id)
                .filter(|item| item.status == UploadStatus::Pending)
                .map(|item| (item.file.clone(), item.cancel.clone()))
        };
        let Some((file, cancel)) = claimed else {
            debug!(id = %id, "upload skipped: item removed or already started");
            return;
        };

        let span = upload_span(id, file.name());
        self.run_item(id, file, cancel).instrument(span).await;
    }

    async fn run_item(&self, id: UploadId, file: UploadFile, cancel: CancellationToken) {
        let name = file.name().to_string();

        let lookup = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("cancelled during match lookup");
                return;
            }
            result = self.api.find_match(&name) => result,
        };
        match lookup {
            Ok(matched) => {
                if let Some(dataset) = &matched {
                    info!(dataset = %dataset.dataset_name, "file matched dataset");
                }
                if self.lock().attach_match(id, matched).is_err() {
                    return;
                }
            }
            Err(err) => warn!(error = %err, "match lookup failed; uploading anyway"),
        }

        if let Err(err) = self.lock().transition(id, UploadStatus::Uploading) {
            debug!(error = %err, "upload not started");
            return;
        }

        let uploaded = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("cancelled during upload");
                return;
            }
            result = self.api.upload_file(&name, &file, self.metadata.as_deref()) => result,
        };

        match uploaded {
            Ok(_) => {
                if self.lock().transition(id, UploadStatus::Success).is_ok() {
                    info!(size = file.size(), "upload succeeded");
                    self.notifier
                        .notify(Notification::success(format!("Successfully uploaded {name}")));
                }
            }
            Err(err) => {
                if self.lock().fail(id, err.to_string()).is_ok() {
                    warn!(error = %err, "upload failed");
                    self.notifier
                        .notify(Notification::error(format!("Failed to upload {name}")));
                }
            }
        }
    }
}
