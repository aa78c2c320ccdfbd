//! Error types for Manga Fetcher
//!
//! This module defines the error types for all components of the application.
//! Per-chapter failures are values, not panics: the scheduler downgrades a chapter
//! to `Failed` and keeps going, so every error here carries enough context to be
//! logged on its own.

use std::path::PathBuf;
use thiserror::Error;

/// Malformed user input: chapter numbers, chapter lists, series names
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Integer part of a chapter number is not a non-negative integer literal
    #[error("Invalid chapter number: '{input}'")]
    InvalidChapterNumber { input: String },

    /// A chapter list entry could not be parsed
    #[error("Invalid chapter list entry '{input}': {reason}")]
    InvalidChapterRange { input: String, reason: String },

    /// Series name is empty after trimming
    #[error("Series name must not be empty")]
    EmptySeriesName,
}

/// Download and HTTP client errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Transport-level failure (connect, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with something other than 200
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// I/O error during file operations
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid URL produced from a template
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Rate limit exceeded after all throttle replays
    #[error("Rate limit exceeded. Server responded with HTTP 429")]
    RateLimitExceeded,

    /// Server overloaded after all throttle replays
    #[error("Server overloaded. Server responded with HTTP 503")]
    ServerOverloaded,

    /// Atomic file operation failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
    },

    /// Invalid runtime configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl DownloadError {
    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            DownloadError::HttpStatus { status, .. } => Some(*status),
            DownloadError::RateLimitExceeded => Some(429),
            DownloadError::ServerOverloaded => Some(503),
            _ => None,
        }
    }
}

/// Chapter address resolution errors
#[derive(Error, Debug)]
pub enum ResolveError {
    /// A lookup request failed (status or transport)
    #[error("Chapter lookup failed: {0}")]
    Download(#[from] DownloadError),

    /// Neither the primary nor the fallback page carried the resource path
    #[error("Resource path not found for '{slug}' chapter {chapter}")]
    TokenNotFound { slug: String, chapter: String },
}

/// History store errors
#[derive(Error, Debug)]
pub enum HistoryError {
    /// Reading or appending the history file failed
    #[error("History file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking history task did not complete
    #[error("History task failed: {0}")]
    Task(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Reading or writing the configuration file failed
    #[error("Configuration file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Input format error
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Download error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Resolution error
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// History error
    #[error(transparent)]
    History(#[from] HistoryError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Format(_) => "format",
            AppError::Download(_) => "download",
            AppError::Resolve(_) => "resolve",
            AppError::History(_) => "history",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Format result type alias
pub type FormatResult<T> = std::result::Result<T, FormatError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Resolve result type alias
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

/// History result type alias
pub type HistoryResult<T> = std::result::Result<T, HistoryError>;

/// Config result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let err = AppError::from(FormatError::EmptySeriesName);
        assert_eq!(err.category(), "format");

        let err = AppError::from(ResolveError::TokenNotFound {
            slug: "One-Piece".to_string(),
            chapter: "0001".to_string(),
        });
        assert_eq!(err.category(), "resolve");

        let err = AppError::from(DownloadError::RateLimitExceeded);
        assert_eq!(err.category(), "download");
    }

    #[test]
    fn test_status_classification() {
        let err = DownloadError::HttpStatus {
            url: "https://example.com/a".to_string(),
            status: 503,
        };
        assert_eq!(err.status(), Some(503));
        assert_eq!(DownloadError::RateLimitExceeded.status(), Some(429));
        assert_eq!(DownloadError::ServerOverloaded.status(), Some(503));
        assert_eq!(
            DownloadError::ConfigurationError("bad".to_string()).status(),
            None
        );
    }

    #[test]
    fn test_error_messages() {
        let err = FormatError::InvalidChapterNumber {
            input: "x7".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid chapter number: 'x7'");

        let err = DownloadError::HttpStatus {
            url: "https://example.com/p.png".to_string(),
            status: 404,
        };
        assert_eq!(err.to_string(), "HTTP 404 from https://example.com/p.png");
    }
}
