//! Prelude module for Manga Fetcher Library
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use manga_fetcher::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use manga_fetcher::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let scheduler = ChapterScheduler::new(
//!         SchedulerConfig::default(),
//!         &ClientConfig::default(),
//!         Endpoints::default(),
//!         HistoryStore::new("download_history.txt"),
//!     )?;
//!     let series = MangaSeries::new("berserk", &NameOptions::default(), "MANGA")?;
//!     let summary = scheduler.run_all(&series, &parse_chapter_list("1-3")?).await;
//!     println!("{}", summary.summary());
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

pub use crate::app::{
    ChapterResult,
    ChapterScheduler,
    ClientConfig,
    Endpoints,
    HistoryStore,
    MangaSeries,
    NameOptions,
    Placement,
    ProgressEvent,
    RunSummary,
    SchedulerConfig,
    SchedulingMode,

    format_chapter_number,
    parse_chapter_list,
    progress_channel,
};

pub use crate::config::AppConfig;

// Commonly used constants
pub use crate::constants::{DEFAULT_MAX_CONNECTIONS, DEFAULT_WAVE_SIZE, USER_AGENT};

pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

pub use tokio;
