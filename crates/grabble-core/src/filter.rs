//! URL filter contract.
//!
//! Classification rules and settings persistence live in the host
//! application; the core only consumes a filter object that can match and
//! canonicalize URLs and expose the quality settings relevant to download
//! method validation.

use serde::{Deserialize, Serialize};

/// Audio bitrate selection for a filter's quality settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioBitrate {
    /// No audio track is downloaded.
    NoAudio,
    /// 128 kbps.
    Kbps128,
    /// 192 kbps (default).
    #[default]
    Kbps192,
    /// 320 kbps.
    Kbps320,
}

impl std::fmt::Display for AudioBitrate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAudio => write!(f, "No audio"),
            Self::Kbps128 => write!(f, "128 kbps"),
            Self::Kbps192 => write!(f, "192 kbps"),
            Self::Kbps320 => write!(f, "320 kbps"),
        }
    }
}

/// Quality settings attached to a filter.
///
/// Backends consume the full set when building process arguments; the core
/// itself only inspects the audio bitrate for the no-method check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct QualitySettings {
    /// Selected audio bitrate.
    #[serde(default)]
    pub audio_bitrate: AudioBitrate,
}

impl QualitySettings {
    /// Quality settings with no audio track selected.
    #[must_use]
    pub const fn no_audio() -> Self {
        Self {
            audio_bitrate: AudioBitrate::NoAudio,
        }
    }
}

/// A URL classification filter.
///
/// The first registered filter whose `matches` returns true claims a
/// captured URL; its canonicalized form is what dedup and the downloader
/// backends operate on.
#[cfg_attr(test, mockall::automock)]
pub trait UrlFilter: Send + Sync {
    /// Stable identifier for this filter.
    fn id(&self) -> &str;

    /// Whether this filter claims the given URL.
    fn matches(&self, url: &str) -> bool;

    /// Canonicalize a URL. Returning `None` rejects the capture.
    fn filter_url(&self, url: &str) -> Option<String> {
        Some(url.to_string())
    }

    /// Whether the URL refers to a playlist rather than a single item.
    fn is_playlist(&self, _url: &str) -> bool {
        false
    }

    /// Whether downloads through this filter need browser cookies.
    fn requires_cookies(&self) -> bool {
        false
    }

    /// Quality settings configured for this filter.
    fn quality_settings(&self) -> QualitySettings;
}

/// Catch-all filter that accepts any URL unchanged.
///
/// Hosts register it last so forced captures always classify.
#[derive(Debug, Clone, Default)]
pub struct GenericFilter {
    quality: QualitySettings,
}

impl GenericFilter {
    /// Identifier of the generic filter.
    pub const ID: &'static str = "generic";

    /// Create a generic filter with the given quality settings.
    #[must_use]
    pub const fn new(quality: QualitySettings) -> Self {
        Self { quality }
    }
}

impl UrlFilter for GenericFilter {
    fn id(&self) -> &str {
        Self::ID
    }

    fn matches(&self, _url: &str) -> bool {
        true
    }

    fn quality_settings(&self) -> QualitySettings {
        self.quality.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_filter_matches_anything() {
        let filter = GenericFilter::default();
        assert!(filter.matches("https://example.com/whatever"));
        assert_eq!(
            filter.filter_url("https://example.com/whatever").as_deref(),
            Some("https://example.com/whatever")
        );
        assert!(!filter.is_playlist("https://example.com/whatever"));
    }

    #[test]
    fn test_no_audio_settings() {
        let settings = QualitySettings::no_audio();
        assert_eq!(settings.audio_bitrate, AudioBitrate::NoAudio);
    }
}
