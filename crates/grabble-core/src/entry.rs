//! Queue entry: the unit of work for one captured URL.
//!
//! An entry is a small state machine. Its status is the only externally
//! observable progress signal; the manager fires a change notification
//! after every transition. The sticky cancel hook and the process handle
//! are how cooperative cancellation and the watchdog meet.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::downloader::{Downloader, MediaAction, ProcessHandle};
use crate::filter::UrlFilter;

/// Status of a queue entry.
///
/// `Stopped` loops back through `Queued` on requeue; `Failed`, `NoMethod`
/// and `Complete` are terminal until an explicit user-triggered restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    /// Metadata query in flight.
    Querying,
    /// Waiting in the pending queue.
    Queued,
    /// Picked up by a worker; the backend is executing.
    Starting,
    /// Stopped by the user or a retryable failure; will requeue.
    Stopped,
    /// No download method is enabled; terminal.
    NoMethod,
    /// Failed for good; terminal.
    Failed,
    /// Finished successfully; terminal.
    Complete,
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Querying => write!(f, "Querying"),
            Self::Queued => write!(f, "Queued"),
            Self::Starting => write!(f, "Starting"),
            Self::Stopped => write!(f, "Stopped"),
            Self::NoMethod => write!(f, "No method"),
            Self::Failed => write!(f, "Failed"),
            Self::Complete => write!(f, "Complete"),
        }
    }
}

impl DownloadStatus {
    /// Whether this status is terminal (only exited by an explicit restart).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::NoMethod | Self::Failed | Self::Complete)
    }
}

/// Display metadata a backend may populate during the query phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Media title.
    pub title: Option<String>,
    /// Thumbnail URL.
    pub thumbnail_url: Option<String>,
}

/// One captured URL's in-flight download job and its state.
pub struct QueueEntry {
    id: u64,
    original_url: String,
    filtered_url: String,
    filter: Arc<dyn UrlFilter>,
    downloaders: Vec<Arc<dyn Downloader>>,

    status: Mutex<(DownloadStatus, String)>,
    metadata: Mutex<MediaMetadata>,

    process: Mutex<Option<Arc<dyn ProcessHandle>>>,
    running: AtomicBool,
    cancel_requested: AtomicBool,
    closed: AtomicBool,

    retry_counter: AtomicU32,

    media_files: Mutex<Vec<PathBuf>>,
    actions: Mutex<HashMap<String, MediaAction>>,
}

impl QueueEntry {
    /// Create a new entry for a captured URL.
    #[must_use]
    pub fn new(
        id: u64,
        original_url: impl Into<String>,
        filtered_url: impl Into<String>,
        filter: Arc<dyn UrlFilter>,
        downloaders: Vec<Arc<dyn Downloader>>,
    ) -> Self {
        Self {
            id,
            original_url: original_url.into(),
            filtered_url: filtered_url.into(),
            filter,
            downloaders,
            status: Mutex::new((DownloadStatus::Querying, String::new())),
            metadata: Mutex::new(MediaMetadata::default()),
            process: Mutex::new(None),
            running: AtomicBool::new(false),
            cancel_requested: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            retry_counter: AtomicU32::new(0),
            media_files: Mutex::new(Vec::new()),
            actions: Mutex::new(HashMap::new()),
        }
    }

    /// Unique, monotonically increasing id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// The URL exactly as captured.
    #[must_use]
    pub fn original_url(&self) -> &str {
        &self.original_url
    }

    /// The canonicalized URL the backends operate on.
    #[must_use]
    pub fn filtered_url(&self) -> &str {
        &self.filtered_url
    }

    /// The filter matched at capture time.
    #[must_use]
    pub fn filter(&self) -> &Arc<dyn UrlFilter> {
        &self.filter
    }

    /// Compatible backends, in priority order, fixed at capture time.
    #[must_use]
    pub fn downloaders(&self) -> &[Arc<dyn Downloader>] {
        &self.downloaders
    }

    /// Current status code and detail message.
    #[must_use]
    pub fn status(&self) -> (DownloadStatus, String) {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current status code.
    #[must_use]
    pub fn download_status(&self) -> DownloadStatus {
        self.status.lock().unwrap_or_else(PoisonError::into_inner).0
    }

    /// Transition to a new status with a detail message.
    pub fn update_status(&self, status: DownloadStatus, detail: impl Into<String>) {
        let detail = detail.into();
        debug!(id = self.id, %status, detail, "status change");
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = (status, detail);
    }

    /// Display metadata populated by the query phase.
    #[must_use]
    pub fn metadata(&self) -> MediaMetadata {
        self.metadata
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the display metadata.
    pub fn set_metadata(&self, metadata: MediaMetadata) {
        *self.metadata.lock().unwrap_or_else(PoisonError::into_inner) = metadata;
    }

    /// Attach the handle of the currently executing process.
    pub fn attach_process(&self, process: Arc<dyn ProcessHandle>) {
        *self.process.lock().unwrap_or_else(PoisonError::into_inner) = Some(process);
    }

    /// Drop the process handle.
    pub fn detach_process(&self) {
        *self.process.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Handle to the running process, when one exists.
    #[must_use]
    pub fn process(&self) -> Option<Arc<dyn ProcessHandle>> {
        self.process
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a worker is executing this entry right now.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Set or clear the running flag.
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    /// Request cooperative cancellation. Sticky until a reset.
    pub fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    /// Mark the owning UI handle as closed; the entry is being destroyed.
    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Whether the owning UI handle was closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Increment the retry counter and return the new value.
    pub fn increment_retries(&self) -> u32 {
        self.retry_counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Current retry counter value.
    #[must_use]
    pub fn retries(&self) -> u32 {
        self.retry_counter.load(Ordering::SeqCst)
    }

    /// Reset the retry counter.
    ///
    /// Only explicit full resets (retry-all-failed, single restart) do
    /// this; ordinary requeues keep the counter.
    pub fn reset_retries(&self) {
        self.retry_counter.store(0, Ordering::SeqCst);
    }

    /// Clear transient run state so the entry can go through the queue
    /// again: process handle, cancel hook, running flag.
    pub fn reset_for_restart(&self) {
        self.detach_process();
        self.cancel_requested.store(false, Ordering::SeqCst);
        self.running.store(false, Ordering::Release);
    }

    /// Clean up transient resources after a terminal transition.
    pub fn clean(&self) {
        self.detach_process();
    }

    /// Register a final media file produced by the backend.
    pub fn add_media_file(&self, path: PathBuf) {
        self.media_files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path);
    }

    /// Final media files registered so far.
    #[must_use]
    pub fn media_files(&self) -> Vec<PathBuf> {
        self.media_files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Delete the registered media files from disk.
    pub fn delete_media_files(&self) {
        let files = {
            let mut guard = self
                .media_files
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };

        for path in files {
            if let Err(err) = std::fs::remove_file(&path) {
                warn!(id = self.id, path = %path.display(), %err, "failed to delete media file");
            }
        }
    }

    /// Replace the post-processing action map.
    pub fn set_actions(&self, actions: HashMap<String, MediaAction>) {
        *self.actions.lock().unwrap_or_else(PoisonError::into_inner) = actions;
    }

    /// Post-processing actions exposed to the host by name.
    #[must_use]
    pub fn actions(&self) -> HashMap<String, MediaAction> {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for QueueEntry {}

impl std::fmt::Debug for QueueEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueEntry")
            .field("id", &self.id)
            .field("original_url", &self.original_url)
            .field("status", &self.download_status())
            .field("running", &self.is_running())
            .field("retries", &self.retries())
            .finish_non_exhaustive()
    }
}
