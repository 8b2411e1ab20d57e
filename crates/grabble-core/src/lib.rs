//! Grabble Core Library
//!
//! This crate provides the download engine behind the Grabble application:
//! - URL capture with per-site filtering and dedup
//! - A rearrangeable download queue with bounded concurrency
//! - Pluggable downloader backends (yt-dlp, gallery-dl, spotdl)
//! - A watchdog that supervises and tears down external processes

pub mod collections;
pub mod config;
pub mod downloader;
pub mod entry;
pub mod error;
pub mod filter;
pub mod manager;

pub use config::ManagerConfig;
pub use downloader::{AttemptOutcome, DownloadResult, Downloader, DownloaderId, MediaAction, ProcessHandle};
pub use entry::{DownloadStatus, MediaMetadata, QueueEntry};
pub use error::{Error, Result};
pub use filter::{AudioBitrate, GenericFilter, QualitySettings, UrlFilter};
pub use manager::{DownloadManager, FaultHandler};
