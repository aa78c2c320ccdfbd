//! Application constants for Manga Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names for configuration overrides
pub mod env {
    /// Overrides the library root directory
    pub const ROOT: &str = "MANGA_FETCHER_ROOT";

    /// Overrides the history file location
    pub const HISTORY: &str = "MANGA_FETCHER_HISTORY";

    /// Overrides the chapter lookup base URL
    pub const LOOKUP_URL: &str = "MANGA_FETCHER_LOOKUP_URL";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "Manga-Fetcher/0.1.0 (Chapter Archiver)";

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// TCP keep-alive interval
    pub const TCP_KEEPALIVE: Duration = Duration::from_secs(30);

    /// Upper bound of the random jitter added by the rate limiter
    pub const RATE_LIMIT_JITTER: Duration = Duration::from_millis(100);
}

/// Rate limiting and retry configuration
pub mod limits {
    /// Default rate limit for origin requests (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 20;

    /// Default replays of a throttled (429/503) response
    pub const DEFAULT_THROTTLE_RETRIES: u32 = 0;

    /// Base delay for exponential backoff on throttled responses (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 1000;
}

/// Chapter scheduling configuration
pub mod scheduler {
    /// Shared connection budget across all running chapter jobs
    pub const DEFAULT_MAX_CONNECTIONS: usize = 10;

    /// Chapter jobs per wave (or persistent workers in pool mode)
    pub const DEFAULT_WAVE_SIZE: usize = 5;
}

/// Remote endpoint templates
pub mod endpoints {
    /// Base URL of the chapter lookup pages
    pub const DEFAULT_LOOKUP_BASE: &str = "https://manga4life.com";

    /// Scheme used to reach the resolved resource host
    pub const DEFAULT_IMAGE_SCHEME: &str = "https";

    /// Suffix of the fallback lookup page
    pub const ALTERNATE_INDEX_SUFFIX: &str = "-index-2";

    /// Selector for the inline scripts scanned during resolution
    pub const SCRIPT_SELECTOR: &str = "script";

    /// Inline-script assignment carrying the resource path
    pub const RESOURCE_PATH_PATTERN: &str = r#"vm\.CurPathName\s*=\s*"([^"]+)""#;

    /// Inline-script assignment carrying the chapter descriptor
    pub const CHAPTER_DESCRIPTOR_PATTERN: &str = r"vm\.CurChapter\s*=\s*(\{[^;]*?\})\s*;";
}

/// Naming and file layout constants
pub mod files {
    /// Default library root, relative to the working directory
    pub const DEFAULT_LIBRARY_ROOT: &str = "MANGA";

    /// Default history file, relative to the working directory
    pub const DEFAULT_HISTORY_FILE: &str = "download_history.txt";

    /// Prefix of every chapter folder
    pub const CHAPTER_FOLDER_PREFIX: &str = "Chapter-";

    /// Extension of saved pages
    pub const PAGE_EXTENSION: &str = "png";

    /// Temporary file suffix for atomic operations
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Width of the zero-padded integer part of a chapter code
    pub const CHAPTER_CODE_WIDTH: usize = 4;

    /// Width of the zero-padded page index
    pub const PAGE_INDEX_WIDTH: usize = 3;

    /// Largest page index expressible in the page-index width
    pub const MAX_PAGE_INDEX: u32 = 999;
}

/// Configuration file locations
pub mod config {
    /// Project-local configuration file
    pub const LOCAL_CONFIG_FILE: &str = "manga-fetcher.toml";

    /// Directory under the user config dir
    pub const CONFIG_DIR_NAME: &str = "manga-fetcher";

    /// File name inside `CONFIG_DIR_NAME`
    pub const CONFIG_FILE_NAME: &str = "config.toml";
}

/// Logging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "warn";
}

// Re-export commonly used constants for convenience
pub use http::{DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
pub use limits::DEFAULT_RATE_LIMIT_RPS;
pub use scheduler::{DEFAULT_MAX_CONNECTIONS, DEFAULT_WAVE_SIZE};
