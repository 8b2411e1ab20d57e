//! Downloader backend capability contract.
//!
//! Concrete adapters (yt-dlp, gallery-dl, spotdl) live outside the core.
//! The scheduler depends only on this trait: a backend can test URL
//! compatibility, query display metadata, execute the download, and
//! post-process the resulting media files.
//!
//! The outcome a backend reports is an advisory signal; where the entry
//! ends up (retry, failed, completed, requeued) is the scheduler's call.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::entry::QueueEntry;
use crate::error::Result;

/// Identifier for a downloader backend implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DownloaderId {
    /// The yt-dlp adapter.
    YtDlp,
    /// The gallery-dl adapter.
    GalleryDl,
    /// The spotdl adapter.
    SpotDl,
}

impl std::fmt::Display for DownloaderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::YtDlp => write!(f, "yt-dlp"),
            Self::GalleryDl => write!(f, "gallery-dl"),
            Self::SpotDl => write!(f, "spotdl"),
        }
    }
}

/// Outcome of a single download attempt by one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// This backend cannot handle the URL; the scheduler tries the next one.
    Unsupported,
    /// The download failed in a way eligible for bounded automatic retry.
    MainCategoryFailed,
    /// The download was stopped by the user.
    Stopped,
    /// The download finished successfully.
    Success,
}

impl std::fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsupported => write!(f, "unsupported"),
            Self::MainCategoryFailed => write!(f, "main category failed"),
            Self::Stopped => write!(f, "stopped"),
            Self::Success => write!(f, "success"),
        }
    }
}

/// Result of a download attempt: the outcome signal plus the last output
/// captured from the backing process.
#[derive(Debug, Clone)]
pub struct DownloadResult {
    /// Outcome reported by the backend.
    pub outcome: AttemptOutcome,
    /// Last captured process output, used for failure diagnostics.
    pub last_output: String,
}

impl DownloadResult {
    /// The backend does not support this URL.
    #[must_use]
    pub const fn unsupported() -> Self {
        Self {
            outcome: AttemptOutcome::Unsupported,
            last_output: String::new(),
        }
    }

    /// The download failed with a retryable main-category failure.
    #[must_use]
    pub const fn main_category_failed(last_output: String) -> Self {
        Self {
            outcome: AttemptOutcome::MainCategoryFailed,
            last_output,
        }
    }

    /// The download was stopped before completion.
    #[must_use]
    pub const fn stopped() -> Self {
        Self {
            outcome: AttemptOutcome::Stopped,
            last_output: String::new(),
        }
    }

    /// The download completed successfully.
    #[must_use]
    pub const fn success(last_output: String) -> Self {
        Self {
            outcome: AttemptOutcome::Success,
            last_output,
        }
    }
}

/// A zero-argument post-processing action exposed to the host by name.
pub type MediaAction = Arc<dyn Fn() + Send + Sync>;

/// Handle to an external downloader process.
///
/// A backend attaches one to the entry while the process runs. The watchdog
/// is the only component that terminates through it: graceful first, then a
/// force-kill after the configured grace period.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessHandle: Send + Sync {
    /// OS process id, for logging.
    fn pid(&self) -> u32;

    /// Whether the process is still running.
    fn is_alive(&self) -> bool;

    /// Ask the process to exit gracefully.
    fn terminate(&self);

    /// Forcefully kill the process.
    fn kill(&self);
}

/// A downloader backend tried in priority order for each entry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Which backend this is.
    fn id(&self) -> DownloaderId;

    /// Whether this backend recognizes the URL at all.
    fn can_consume_url(&self, url: &str) -> bool;

    /// Query display metadata for the entry.
    ///
    /// Returns true when this backend definitively handled the query, in
    /// which case no further backends are asked.
    async fn try_query(&self, entry: &Arc<QueueEntry>) -> bool;

    /// Execute the download for the entry.
    ///
    /// # Errors
    ///
    /// Returns an error for faults outside the normal outcome taxonomy,
    /// such as a failure to spawn the external process.
    async fn try_download(&self, entry: &Arc<QueueEntry>) -> Result<DownloadResult>;

    /// Post-process the downloaded media files.
    ///
    /// Returns a map of user-facing action names to zero-argument actions
    /// the host may expose (open file, open directory, and so on).
    async fn process_media_files(&self, entry: &Arc<QueueEntry>) -> HashMap<String, MediaAction>;
}
