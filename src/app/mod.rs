//! Core application logic for Manga Fetcher
//!
//! This module contains the main application components: naming and chapter
//! formatting, the shared HTTP client, chapter address resolution, the page
//! fetch loop, the download history and the chapter scheduler that ties them
//! together.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use manga_fetcher::app::{
//!     AddressResolver, ClientConfig, Endpoints, MangaClient, format_chapter_number,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(MangaClient::new(&ClientConfig::default(), 10)?);
//! let resolver = AddressResolver::new(client, Arc::new(Endpoints::default()));
//!
//! let code = format_chapter_number("7")?;
//! let resolved = resolver.resolve("One-Piece", &code).await?;
//! println!("Chapter {} is served from {}", code, resolved.resource_path);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod endpoints;
pub mod fetcher;
pub mod history;
pub mod models;
pub mod resolver;
pub mod scheduler;

// Re-export main public API
pub use client::{ClientConfig, MangaClient, PageWrite};
pub use endpoints::Endpoints;
pub use fetcher::{ChapterFetchReport, ChapterTarget, PageFetchLoop, StopReason};
pub use history::HistoryStore;
pub use models::{
    ChapterJob, JobStatus, MangaSeries, NameOptions, PageAsset, format_chapter_number,
    normalize_title, parse_chapter_list, slugify,
};
pub use resolver::{AddressResolver, LookupStage, ResolvedChapter};
pub use scheduler::{
    ChapterResult, ChapterScheduler, Placement, ProgressEvent, ProgressReceiver, ProgressSender,
    RepeatedChapter, RunSummary, SchedulerConfig, SchedulingMode, progress_channel,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        let config = ClientConfig::default();
        assert!(config.tcp_nodelay);
        assert_eq!(SchedulerConfig::default().mode, SchedulingMode::Waves);
    }
}
