//! Download manager: capture gate, queue scheduler, and process watchdog.
//!
//! The manager owns the four entry collections (pending, running, failed,
//! completed), the dedup sets, and the global run/block flags. Worker tasks
//! execute download attempts on the shared Tokio runtime; a dedicated
//! watchdog task force-terminates processes whose entries were cancelled or
//! whose global run flag was cleared. An entry lives in at most one
//! collection at any time; moving between them is the only way status
//! changes become visible.
//!
//! Listener fan-out is a broadcast channel of unit notifications: receivers
//! re-read whatever state they care about, and a slow receiver can never
//! stall the scheduler.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::collections::{RearrangeableDeque, RunningSet, TerminalQueue};
use crate::config::ManagerConfig;
use crate::downloader::{AttemptOutcome, Downloader, ProcessHandle};
use crate::entry::{DownloadStatus, QueueEntry};
use crate::error::{Error, Result};
use crate::filter::{AudioBitrate, GenericFilter, UrlFilter};

/// Sink for faults that escape a download attempt, forwarded to the host's
/// global error handler.
pub type FaultHandler = Arc<dyn Fn(&Error) + Send + Sync>;

/// Coordinates URL capture, download scheduling, and process supervision.
///
/// Must be created inside a Tokio runtime; construction spawns the
/// watchdog task.
pub struct DownloadManager {
    inner: Arc<ManagerInner>,
    watchdog: Mutex<Option<JoinHandle<()>>>,
}

struct ManagerInner {
    config: ManagerConfig,

    downloaders: RwLock<Vec<Arc<dyn Downloader>>>,
    filters: RwLock<Vec<Arc<dyn UrlFilter>>>,

    captured_links: Mutex<HashSet<String>>,
    captured_playlists: Mutex<HashSet<String>>,

    pending: RearrangeableDeque<Arc<QueueEntry>>,
    running: RunningSet<Arc<QueueEntry>>,
    completed: TerminalQueue<Arc<QueueEntry>>,
    failed: TerminalQueue<Arc<QueueEntry>>,

    running_downloads: AtomicUsize,
    download_counter: AtomicU64,

    downloads_blocked: AtomicBool,
    downloads_running: AtomicBool,

    notifier: broadcast::Sender<()>,
    fault_handler: Mutex<Option<FaultHandler>>,
}

impl DownloadManager {
    /// Create a manager and spawn its watchdog task.
    #[must_use]
    pub fn new(mut config: ManagerConfig) -> Self {
        config.validate();

        let (notifier, _) = broadcast::channel(256);

        let inner = Arc::new(ManagerInner {
            config,
            downloaders: RwLock::new(Vec::new()),
            filters: RwLock::new(Vec::new()),
            captured_links: Mutex::new(HashSet::new()),
            captured_playlists: Mutex::new(HashSet::new()),
            pending: RearrangeableDeque::new(),
            running: RunningSet::new(),
            completed: TerminalQueue::new(),
            failed: TerminalQueue::new(),
            running_downloads: AtomicUsize::new(0),
            download_counter: AtomicU64::new(0),
            // Blocked until the host finishes its own initialization.
            downloads_blocked: AtomicBool::new(true),
            downloads_running: AtomicBool::new(false),
            notifier,
            fault_handler: Mutex::new(None),
        });

        let watchdog = ManagerInner::spawn_watchdog(&inner);

        Self {
            inner,
            watchdog: Mutex::new(Some(watchdog)),
        }
    }

    /// Register a downloader backend. Order determines priority.
    pub fn register_downloader(&self, downloader: Arc<dyn Downloader>) {
        self.inner
            .downloaders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(downloader);
    }

    /// Register a URL filter. Order determines match priority.
    pub fn register_filter(&self, filter: Arc<dyn UrlFilter>) {
        self.inner
            .filters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(filter);
    }

    /// Subscribe to change notifications.
    ///
    /// A notification carries no payload; it means "something changed,
    /// re-read state". Receivers that lag simply miss intermediate
    /// notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.inner.notifier.subscribe()
    }

    /// Install the host's global fault sink.
    pub fn set_fault_handler(&self, handler: FaultHandler) {
        *self
            .inner
            .fault_handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    /// Capture a URL and enqueue it for download.
    ///
    /// Returns `None` when the capture is rejected: downloads blocked, no
    /// compatible backend, no matching filter (unless `force` falls back
    /// to a registered generic filter), canonicalization refused, or the
    /// URL was already captured.
    pub fn capture_url(&self, url: &str, force: bool) -> Option<Arc<QueueEntry>> {
        self.inner.capture_url(url, force)
    }

    /// Whether the capture gate is blocked.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.inner.downloads_blocked.load(Ordering::SeqCst)
    }

    /// Block the capture gate.
    pub fn block(&self) {
        self.inner.downloads_blocked.store(true, Ordering::SeqCst);
        self.inner.notify_listeners();
    }

    /// Unblock the capture gate.
    pub fn unblock(&self) {
        self.inner.downloads_blocked.store(false, Ordering::SeqCst);
        self.inner.notify_listeners();
    }

    /// Whether the scheduler is advancing the pending queue.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    /// Start the scheduler. No-op while blocked.
    pub fn start_downloads(&self) {
        self.inner.start_downloads();
    }

    /// Stop the scheduler. Queued entries are kept; the watchdog tears
    /// down in-flight processes.
    pub fn stop_downloads(&self) {
        self.inner.stop_downloads();
    }

    /// Start when stopped, stop when running.
    pub fn toggle_downloads(&self) {
        if self.is_running() {
            self.stop_downloads();
        } else {
            self.start_downloads();
        }
    }

    /// Run the dispatcher: fill free concurrency slots from the pending
    /// queue. Safe to call from any task; queue primitives lock
    /// internally.
    pub fn process_queue(&self) {
        self.inner.process_queue();
    }

    /// Requeue every failed entry with a fresh retry budget and start.
    pub fn retry_failed_downloads(&self) {
        self.inner.retry_failed_downloads();
    }

    /// Clear pending, failed, and completed entries plus the dedup URL
    /// sets. Currently-running entries are untouched.
    pub fn clear_queue(&self) {
        self.inner.clear_queue();
    }

    /// Per-entry restart hook: pull a terminal entry back into the queue
    /// with a fresh retry budget.
    pub fn restart_entry(&self, entry: &Arc<QueueEntry>) {
        self.inner.restart_entry(entry);
    }

    /// Per-entry close hook: the owning UI handle is gone. Cancels any
    /// running process (via the watchdog) and purges the entry from all
    /// collections and dedup sets.
    pub fn close_entry(&self, entry: &Arc<QueueEntry>) {
        self.inner.close_entry(entry);
    }

    /// Reorder hook: move a pending entry to the given index, clamped to
    /// the queue bounds. Returns false when the entry is not pending.
    pub fn move_entry(&self, entry: &Arc<QueueEntry>, index: usize) -> bool {
        self.inner.move_entry(entry, index)
    }

    /// Number of pending entries.
    #[must_use]
    pub fn queue_size(&self) -> usize {
        self.inner.pending.len()
    }

    /// Number of entries currently downloading.
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.inner.running_downloads.load(Ordering::SeqCst)
    }

    /// Number of failed entries.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.inner.failed.len()
    }

    /// Number of completed entries.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.inner.completed.len()
    }

    /// Snapshot of the pending queue, head first.
    #[must_use]
    pub fn pending_entries(&self) -> Vec<Arc<QueueEntry>> {
        self.inner.pending.snapshot()
    }

    /// Snapshot of the failed queue, oldest first.
    #[must_use]
    pub fn failed_entries(&self) -> Vec<Arc<QueueEntry>> {
        self.inner.failed.snapshot()
    }

    /// Snapshot of the completed queue, oldest first.
    #[must_use]
    pub fn completed_entries(&self) -> Vec<Arc<QueueEntry>> {
        self.inner.completed.snapshot()
    }

    /// Stop the watchdog task. Called automatically on drop.
    pub fn shutdown(&self) {
        if let Some(handle) = self
            .watchdog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

impl Drop for DownloadManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for DownloadManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadManager")
            .field("queue_size", &self.queue_size())
            .field("running", &self.running_count())
            .field("failed", &self.failed_count())
            .field("completed", &self.completed_count())
            .finish_non_exhaustive()
    }
}

impl ManagerInner {
    fn is_running(&self) -> bool {
        self.downloads_running.load(Ordering::SeqCst)
    }

    fn notify_listeners(&self) {
        let _ = self.notifier.send(());
    }

    fn report_fault(&self, err: &Error) {
        let handler = self
            .fault_handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(handler) = handler {
            handler(err);
        }
    }

    fn start_downloads(self: &Arc<Self>) {
        if self.downloads_blocked.load(Ordering::SeqCst) {
            return;
        }
        self.downloads_running.store(true, Ordering::SeqCst);
        self.notify_listeners();
        self.process_queue();
    }

    fn stop_downloads(&self) {
        self.downloads_running.store(false, Ordering::SeqCst);
        self.notify_listeners();
    }

    // ------------------------------------------------------------------
    // Capture
    // ------------------------------------------------------------------

    fn capture_url(self: &Arc<Self>, url: &str, force: bool) -> Option<Arc<QueueEntry>> {
        if self.downloads_blocked.load(Ordering::SeqCst) {
            debug!(url, "downloads are blocked, ignoring capture");
            return None;
        }

        let compatible: Vec<Arc<dyn Downloader>> = {
            let downloaders = self
                .downloaders
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            downloaders
                .iter()
                .filter(|downloader| downloader.can_consume_url(url))
                .cloned()
                .collect()
        };

        if compatible.is_empty() {
            debug!(url, "no downloader can consume this url");
            return None;
        }

        if self
            .captured_links
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(url)
        {
            return None;
        }

        let filter = self.filter_for_url(url, force)?;

        let Some(filtered_url) = filter.filter_url(url) else {
            error!(url, "filter refused to canonicalize url");
            return None;
        };

        if filter.is_playlist(url) {
            self.captured_playlists
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(filtered_url.clone());
        }

        {
            let mut links = self
                .captured_links
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !links.insert(filtered_url.clone()) {
                return None;
            }
            links.insert(url.to_string());
        }

        info!(url, "captured");

        let id = self.download_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let entry = Arc::new(QueueEntry::new(id, url, filtered_url, filter, compatible));
        entry.update_status(DownloadStatus::Querying, "querying metadata");

        self.spawn_query(Arc::clone(&entry));

        self.pending.offer_last(Arc::clone(&entry));
        self.notify_listeners();

        if self.config.auto_download_start && !self.is_running() {
            self.start_downloads();
        } else {
            self.process_queue();
        }

        Some(entry)
    }

    fn filter_for_url(&self, url: &str, force: bool) -> Option<Arc<dyn UrlFilter>> {
        let filters = self.filters.read().unwrap_or_else(PoisonError::into_inner);

        if let Some(filter) = filters.iter().find(|filter| filter.matches(url)) {
            return Some(Arc::clone(filter));
        }

        if force
            && let Some(filter) = filters.iter().find(|filter| filter.id() == GenericFilter::ID)
        {
            return Some(Arc::clone(filter));
        }

        error!(url, "no filter found for url, ignoring");
        None
    }

    fn spawn_query(self: &Arc<Self>, entry: Arc<QueueEntry>) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            if entry.is_cancel_requested() {
                return;
            }

            for downloader in entry.downloaders() {
                if downloader.try_query(&entry).await {
                    break;
                }
            }

            if entry.download_status() == DownloadStatus::Querying {
                entry.update_status(DownloadStatus::Queued, "not started");
                inner.notify_listeners();
            }
        });
    }

    // ------------------------------------------------------------------
    // Dispatcher
    // ------------------------------------------------------------------

    fn process_queue(self: &Arc<Self>) {
        while self.is_running()
            && self.running_downloads.load(Ordering::SeqCst) < self.config.max_simultaneous_downloads
        {
            let Some(entry) = self.pending.poll() else {
                break;
            };

            if entry.is_closed() {
                // Being destroyed elsewhere; do not requeue.
                break;
            }

            // The cap check and this increment are separate steps; concurrent
            // dispatchers can overshoot the cap by one for a moment.
            self.running_downloads.fetch_add(1, Ordering::SeqCst);
            self.notify_listeners();

            let inner = Arc::clone(self);
            tokio::spawn(async move {
                inner.run_entry(entry).await;
            });
        }

        // Nothing was runnable and nothing is in flight: stop rather than
        // leave the run flag dangling.
        if self.is_running() && self.running_downloads.load(Ordering::SeqCst) == 0 {
            self.stop_downloads();
        }
    }

    async fn run_entry(self: Arc<Self>, entry: Arc<QueueEntry>) {
        if let Err(err) = self.download_attempt(&entry).await {
            error!(url = entry.original_url(), %err, "download attempt faulted");

            entry.update_status(DownloadStatus::Failed, err.to_string());
            entry.reset_for_restart();

            // Requeue at the tail: one more chance instead of losing it.
            self.pending.offer_last(Arc::clone(&entry));
            self.notify_listeners();

            self.report_fault(&err);
        }

        entry.set_running(false);
        self.running_downloads.fetch_sub(1, Ordering::SeqCst);
        self.notify_listeners();

        // A slot was freed.
        self.process_queue();
    }

    async fn download_attempt(self: &Arc<Self>, entry: &Arc<QueueEntry>) -> Result<()> {
        if !self.is_running() {
            // Keep its position for when downloads resume.
            self.pending.offer_first(Arc::clone(entry));
            return Ok(());
        }

        let filter = Arc::clone(entry.filter());

        if filter.requires_cookies() && !self.config.read_cookies_from_browser {
            warn!(
                url = entry.original_url(),
                "cookies are required for this website but cookie reading is disabled"
            );
        }

        let audio = self.config.download_audio;
        let video = self.config.download_video;

        if !audio && !video {
            self.fail_no_method(entry, "no download method enabled");
            return Ok(());
        }

        if !video && audio && filter.quality_settings().audio_bitrate == AudioBitrate::NoAudio {
            self.fail_no_method(entry, "audio-only download with no audio quality selected");
            return Ok(());
        }

        entry.set_running(true);
        entry.update_status(DownloadStatus::Starting, "starting download");
        self.notify_listeners();

        self.running.offer(Arc::clone(entry));
        let outcome = self.run_downloader_chain(entry).await;
        self.running.remove(entry);

        outcome
    }

    fn fail_no_method(&self, entry: &Arc<QueueEntry>, detail: &str) {
        entry.update_status(DownloadStatus::NoMethod, detail);
        entry.reset_for_restart();
        self.failed.offer(Arc::clone(entry));

        error!(url = entry.original_url(), detail, "no download method");

        // With nothing else runnable the scheduler would spin over
        // misconfigured entries.
        if self.pending.len() <= 1 {
            self.stop_downloads();
        }

        self.notify_listeners();
    }

    async fn run_downloader_chain(self: &Arc<Self>, entry: &Arc<QueueEntry>) -> Result<()> {
        for downloader in entry.downloaders() {
            let result = downloader.try_download(entry).await?;
            let last_output = result.last_output;

            if result.outcome == AttemptOutcome::Unsupported {
                continue;
            }

            if result.outcome == AttemptOutcome::MainCategoryFailed {
                let exhausted = !self.config.auto_download_retry
                    || entry.increment_retries() > self.config.max_download_retries
                    || last_output.contains("Unsupported URL");

                if exhausted {
                    error!(
                        url = entry.original_url(),
                        output = %last_output,
                        "download failed, no retry attempts left"
                    );

                    entry.update_status(DownloadStatus::Failed, last_output);
                    entry.reset_for_restart();
                    self.failed.offer(Arc::clone(entry));
                } else {
                    warn!(
                        url = entry.original_url(),
                        retries = entry.retries(),
                        max_retries = self.config.max_download_retries,
                        output = %last_output,
                        "download failed, retrying"
                    );

                    entry.update_status(DownloadStatus::Stopped, "waiting to retry");
                    entry.reset_for_restart();
                    // Head of the queue so the retry happens soon.
                    self.pending.offer_first(Arc::clone(entry));
                }

                self.notify_listeners();
                return Ok(());
            }

            if !self.is_running()
                || entry.is_cancel_requested()
                || result.outcome == AttemptOutcome::Stopped
            {
                entry.update_status(DownloadStatus::Stopped, "not started");
                entry.reset_for_restart();

                self.pending.offer_first(Arc::clone(entry));
                self.notify_listeners();
                return Ok(());
            }

            // Only Success is left at this point.
            let actions = downloader.process_media_files(entry).await;
            entry.set_actions(actions);

            entry.update_status(DownloadStatus::Complete, "finished");
            entry.clean();

            self.completed.offer(Arc::clone(entry));
            self.notify_listeners();
            return Ok(());
        }

        // Every backend passed on the entry. Park it in the failed queue
        // rather than dropping it from all collections.
        entry.update_status(DownloadStatus::Failed, "no downloader accepted the URL");
        entry.reset_for_restart();
        self.failed.offer(Arc::clone(entry));
        self.notify_listeners();

        Ok(())
    }

    // ------------------------------------------------------------------
    // Queue maintenance
    // ------------------------------------------------------------------

    fn retry_failed_downloads(self: &Arc<Self>) {
        while let Some(entry) = self.failed.poll() {
            entry.update_status(DownloadStatus::Queued, "not started");
            // Manual retry clears the budget; automatic requeues keep it.
            entry.reset_retries();
            entry.reset_for_restart();

            self.pending.offer_last(entry);
        }

        self.start_downloads();
        self.notify_listeners();
    }

    fn restart_entry(self: &Arc<Self>, entry: &Arc<QueueEntry>) {
        entry.update_status(DownloadStatus::Queued, "not started");
        entry.reset_retries();
        entry.reset_for_restart();

        self.completed.remove(entry);
        self.failed.remove(entry);
        self.pending.offer_last(Arc::clone(entry));

        self.notify_listeners();
        self.process_queue();
    }

    fn close_entry(&self, entry: &Arc<QueueEntry>) {
        entry.mark_closed();
        // The watchdog kills any process still backing this entry.
        entry.request_cancel();

        {
            let mut links = self
                .captured_links
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            links.remove(entry.original_url());
            links.remove(entry.filtered_url());
        }
        {
            let mut playlists = self
                .captured_playlists
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            playlists.remove(entry.original_url());
            playlists.remove(entry.filtered_url());
        }

        self.pending.remove(entry);
        self.failed.remove(entry);
        self.completed.remove(entry);

        self.notify_listeners();
    }

    fn move_entry(&self, entry: &Arc<QueueEntry>, index: usize) -> bool {
        if !self.pending.contains(entry) {
            return false;
        }

        let moved = self.pending.move_to_position(entry, index);
        if moved {
            self.notify_listeners();
        }
        moved
    }

    fn clear_queue(&self) {
        self.captured_links
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.captured_playlists
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        // Active downloads are intentionally immune to this.
        while let Some(entry) = self.pending.poll() {
            if !entry.is_running() {
                entry.clean();
            }
        }
        while let Some(entry) = self.failed.poll() {
            if !entry.is_running() {
                entry.clean();
            }
        }
        while self.completed.poll().is_some() {}

        self.notify_listeners();
    }

    // ------------------------------------------------------------------
    // Watchdog
    // ------------------------------------------------------------------

    fn spawn_watchdog(inner: &Arc<Self>) -> JoinHandle<()> {
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.config.watchdog_interval());
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                inner.scan_running_set().await;
            }
        })
    }

    async fn scan_running_set(&self) {
        for entry in self.running.snapshot() {
            if self.is_running() && !entry.is_cancel_requested() {
                continue;
            }

            let Some(process) = entry.process() else {
                continue;
            };

            if process.is_alive() {
                debug!(
                    url = entry.original_url(),
                    pid = process.pid(),
                    "watchdog stopping process"
                );
                self.try_stop_process(process.as_ref()).await;
            }
        }
    }

    async fn try_stop_process(&self, process: &dyn ProcessHandle) {
        let started = Instant::now();
        let grace = self.config.termination_grace();

        // Ask politely first.
        process.terminate();

        while process.is_alive() && started.elapsed() < grace {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        if process.is_alive() {
            warn!(
                pid = process.pid(),
                "process did not terminate in time, forcefully stopping it"
            );
            process.kill();
        }

        info!(
            pid = process.pid(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stopped downloader process"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::downloader::{DownloadResult, DownloaderId, MediaAction};
    use crate::filter::MockUrlFilter;

    struct StubDownloader;

    #[async_trait]
    impl Downloader for StubDownloader {
        fn id(&self) -> DownloaderId {
            DownloaderId::YtDlp
        }

        fn can_consume_url(&self, _url: &str) -> bool {
            true
        }

        async fn try_query(&self, _entry: &Arc<QueueEntry>) -> bool {
            true
        }

        async fn try_download(&self, _entry: &Arc<QueueEntry>) -> Result<DownloadResult> {
            Ok(DownloadResult::success(String::new()))
        }

        async fn process_media_files(
            &self,
            _entry: &Arc<QueueEntry>,
        ) -> HashMap<String, MediaAction> {
            HashMap::new()
        }
    }

    fn idle_manager() -> DownloadManager {
        let manager = DownloadManager::new(ManagerConfig {
            auto_download_start: false,
            ..Default::default()
        });
        manager.register_downloader(Arc::new(StubDownloader));
        manager.register_filter(Arc::new(GenericFilter::default()));
        manager
    }

    #[tokio::test]
    async fn test_capture_rejected_while_blocked() {
        let manager = idle_manager();
        assert!(manager.is_blocked());
        assert!(manager.capture_url("https://example.com/a", false).is_none());

        manager.unblock();
        assert!(manager.capture_url("https://example.com/a", false).is_some());
        assert_eq!(manager.queue_size(), 1);
    }

    #[tokio::test]
    async fn test_capture_deduplicates() {
        let manager = idle_manager();
        manager.unblock();

        assert!(manager.capture_url("https://example.com/a", false).is_some());
        assert!(manager.capture_url("https://example.com/a", false).is_none());
        assert_eq!(manager.queue_size(), 1);
    }

    #[tokio::test]
    async fn test_capture_without_compatible_downloader() {
        let manager = DownloadManager::new(ManagerConfig {
            auto_download_start: false,
            ..Default::default()
        });
        manager.register_filter(Arc::new(GenericFilter::default()));
        manager.unblock();

        assert!(manager.capture_url("https://example.com/a", false).is_none());
    }

    #[tokio::test]
    async fn test_capture_rejected_when_filter_refuses_canonicalization() {
        let manager = DownloadManager::new(ManagerConfig {
            auto_download_start: false,
            ..Default::default()
        });
        manager.register_downloader(Arc::new(StubDownloader));

        let mut filter = MockUrlFilter::new();
        filter.expect_matches().return_const(true);
        filter.expect_filter_url().returning(|_| None);
        manager.register_filter(Arc::new(filter));

        manager.unblock();
        assert!(manager.capture_url("https://example.com/a", false).is_none());
        assert_eq!(manager.queue_size(), 0);
    }

    #[tokio::test]
    async fn test_block_prevents_start() {
        let manager = idle_manager();
        manager.start_downloads();
        assert!(!manager.is_running());

        manager.unblock();
        manager.capture_url("https://example.com/a", false);
        manager.start_downloads();
        assert!(manager.is_running());
    }
}
