//! Download manager configuration.
//!
//! Settings that govern scheduling (concurrency cap, auto-start), the retry
//! policy, download method selection, and the process watchdog timings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default maximum number of simultaneous downloads.
pub const DEFAULT_MAX_SIMULTANEOUS_DOWNLOADS: usize = 3;

/// Default ceiling for automatic retries of a single entry.
pub const DEFAULT_MAX_DOWNLOAD_RETRIES: u32 = 10;

/// Default interval between watchdog scans of the running set.
pub const DEFAULT_WATCHDOG_INTERVAL_MS: u64 = 300;

/// Default grace period before a terminated process is forcefully killed.
pub const DEFAULT_TERMINATION_GRACE_MS: u64 = 5_000;

/// Configuration for the download manager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Maximum number of downloads executing at the same time.
    #[serde(default = "default_max_simultaneous")]
    pub max_simultaneous_downloads: usize,
    /// Whether capturing a URL starts the scheduler when it is idle.
    #[serde(default = "default_true")]
    pub auto_download_start: bool,
    /// Whether main-category failures are retried automatically.
    #[serde(default = "default_true")]
    pub auto_download_retry: bool,
    /// Maximum number of automatic retries per entry.
    #[serde(default = "default_max_retries")]
    pub max_download_retries: u32,
    /// Whether audio downloading is enabled.
    #[serde(default = "default_true")]
    pub download_audio: bool,
    /// Whether video downloading is enabled.
    #[serde(default = "default_true")]
    pub download_video: bool,
    /// Whether backends may read cookies from the browser.
    #[serde(default)]
    pub read_cookies_from_browser: bool,
    /// Interval in milliseconds between watchdog scans.
    #[serde(default = "default_watchdog_interval")]
    pub watchdog_interval_ms: u64,
    /// Milliseconds to wait for graceful termination before a force-kill.
    #[serde(default = "default_termination_grace")]
    pub termination_grace_ms: u64,
}

const fn default_max_simultaneous() -> usize {
    DEFAULT_MAX_SIMULTANEOUS_DOWNLOADS
}

const fn default_true() -> bool {
    true
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_DOWNLOAD_RETRIES
}

const fn default_watchdog_interval() -> u64 {
    DEFAULT_WATCHDOG_INTERVAL_MS
}

const fn default_termination_grace() -> u64 {
    DEFAULT_TERMINATION_GRACE_MS
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_simultaneous_downloads: DEFAULT_MAX_SIMULTANEOUS_DOWNLOADS,
            auto_download_start: true,
            auto_download_retry: true,
            max_download_retries: DEFAULT_MAX_DOWNLOAD_RETRIES,
            download_audio: true,
            download_video: true,
            read_cookies_from_browser: false,
            watchdog_interval_ms: DEFAULT_WATCHDOG_INTERVAL_MS,
            termination_grace_ms: DEFAULT_TERMINATION_GRACE_MS,
        }
    }
}

impl ManagerConfig {
    /// Validate and clamp settings to workable values.
    pub fn validate(&mut self) {
        self.max_simultaneous_downloads = self.max_simultaneous_downloads.max(1);
        self.watchdog_interval_ms = self.watchdog_interval_ms.max(10);
    }

    /// Interval between watchdog scans.
    #[must_use]
    pub const fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }

    /// Grace period before a terminated process is forcefully killed.
    #[must_use]
    pub const fn termination_grace(&self) -> Duration {
        Duration::from_millis(self.termination_grace_ms)
    }
}
