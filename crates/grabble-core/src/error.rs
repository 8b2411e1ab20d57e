//! Error types for Grabble core operations.

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Grabble core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A downloader backend reported an unrecoverable failure.
    #[error("Download failed for {url}: {output}")]
    Download {
        /// URL the failed entry was captured from.
        url: String,
        /// Last output captured from the backend process.
        output: String,
    },

    /// Spawning or controlling an external downloader process failed.
    #[error("Process error: {0}")]
    Process(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_display() {
        let err = Error::Download {
            url: "https://example.com/watch?v=abc".to_string(),
            output: "ERROR: no formats found".to_string(),
        };
        assert!(err.to_string().contains("https://example.com/watch?v=abc"));
        assert!(err.to_string().contains("no formats found"));
    }

    #[test]
    fn test_process_error_display() {
        let err = Error::Process("yt-dlp binary not found".to_string());
        assert_eq!(err.to_string(), "Process error: yt-dlp binary not found");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
