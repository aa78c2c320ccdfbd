//! Sequential page fetching for one chapter
//!
//! Pages are requested strictly in increasing order starting at 1. The loop
//! stops at the first page that cannot be saved; what that stop means (end of
//! chapter, truncation, transient failure) is reported rather than guessed.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::app::client::{MangaClient, PageWrite};
use crate::app::endpoints::Endpoints;
use crate::app::models::PageAsset;
use crate::errors::DownloadError;

/// Why the page loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Every page up to the bound was saved
    Completed,
    /// HTTP 404 with no advertised page count: the chapter has ended
    EndOfChapter { page: u32 },
    /// HTTP 404 before the advertised page count was reached
    Truncated { page: u32, expected: u32 },
    /// Any other non-200 answer
    HttpStatus { page: u32, status: u16 },
    /// Transport failure (connect, timeout, body read)
    Network { page: u32, message: String },
    /// Writing the page to disk failed
    Io { page: u32, message: String },
    /// The page URL could not be built
    InvalidUrl { page: u32, message: String },
}

impl StopReason {
    /// Whether the loop stopped because the chapter was exhausted
    pub fn is_clean(&self) -> bool {
        matches!(self, StopReason::Completed | StopReason::EndOfChapter { .. })
    }

    fn from_error(page: u32, expected: Option<u32>, error: &DownloadError) -> Self {
        match (error.status(), expected) {
            (Some(404), Some(expected)) => return StopReason::Truncated { page, expected },
            (Some(404), None) => return StopReason::EndOfChapter { page },
            (Some(status), _) => return StopReason::HttpStatus { page, status },
            (None, _) => {}
        }

        let message = error.to_string();
        match error {
            DownloadError::Io(_) | DownloadError::AtomicOperationFailed { .. } => {
                StopReason::Io { page, message }
            }
            DownloadError::InvalidUrl { .. } => StopReason::InvalidUrl { page, message },
            _ => StopReason::Network { page, message },
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Completed => write!(f, "completed"),
            StopReason::EndOfChapter { page } => write!(f, "end of chapter at page {page}"),
            StopReason::Truncated { page, expected } => {
                write!(f, "page {page} missing, expected {expected} pages")
            }
            StopReason::HttpStatus { page, status } => write!(f, "HTTP {status} on page {page}"),
            StopReason::Network { page, message } => {
                write!(f, "network error on page {page}: {message}")
            }
            StopReason::Io { page, message } => write!(f, "write failed on page {page}: {message}"),
            StopReason::InvalidUrl { page, message } => {
                write!(f, "bad URL for page {page}: {message}")
            }
        }
    }
}

/// Outcome of one chapter's page loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterFetchReport {
    pub pages_written: u32,
    pub stop: StopReason,
}

impl ChapterFetchReport {
    /// True iff at least one page ended up on disk
    pub fn succeeded(&self) -> bool {
        self.pages_written >= 1
    }
}

/// Where a chapter's pages come from and where they go
#[derive(Debug, Clone)]
pub struct ChapterTarget<'a> {
    pub slug: &'a str,
    pub code: &'a str,
    pub resource_path: &'a str,
    pub dir: PathBuf,
}

/// Sequential downloader for the pages of one chapter
#[derive(Debug, Clone)]
pub struct PageFetchLoop {
    client: Arc<MangaClient>,
    endpoints: Arc<Endpoints>,
    max_pages: u32,
    overwrite: bool,
}

impl PageFetchLoop {
    pub fn new(
        client: Arc<MangaClient>,
        endpoints: Arc<Endpoints>,
        max_pages: u32,
        overwrite: bool,
    ) -> Self {
        Self {
            client,
            endpoints,
            max_pages,
            overwrite,
        }
    }

    /// Download pages `1..=bound` in order, stopping at the first failure
    ///
    /// The bound is `page_count_hint` when the lookup page advertised one and
    /// the configured page ceiling otherwise. `on_page` is called once per page
    /// that ended up on disk, in page order.
    pub async fn run<F>(
        &self,
        target: &ChapterTarget<'_>,
        page_count_hint: Option<u32>,
        mut on_page: F,
    ) -> ChapterFetchReport
    where
        F: FnMut(u32),
    {
        let bound = page_count_hint.unwrap_or(self.max_pages);
        let mut pages_written = 0;

        for index in 1..=bound {
            let url = match self.endpoints.page_image(
                target.resource_path,
                target.slug,
                target.code,
                index,
            ) {
                Ok(url) => url,
                Err(e) => {
                    tracing::error!("Chapter {}: {}", target.code, e);
                    return ChapterFetchReport {
                        pages_written,
                        stop: StopReason::from_error(index, page_count_hint, &e),
                    };
                }
            };

            let mut page = PageAsset::new(&target.dir, index);
            match self.client.save_page(&url, &page.path, self.overwrite).await {
                Ok(write) => {
                    page.saved = true;
                    match write {
                        PageWrite::Written { bytes } => tracing::debug!(
                            "Chapter {}: saved page {} ({} bytes)",
                            target.code,
                            page.path.display(),
                            bytes
                        ),
                        PageWrite::Kept => tracing::debug!(
                            "Chapter {}: page {} already on disk",
                            target.code,
                            index
                        ),
                    }
                    pages_written += 1;
                    on_page(index);
                }
                Err(e) => {
                    let stop = StopReason::from_error(index, page_count_hint, &e);
                    match &stop {
                        StopReason::EndOfChapter { .. } => {
                            tracing::info!("Chapter {}: {}", target.code, stop)
                        }
                        StopReason::Truncated { .. } | StopReason::HttpStatus { .. } => {
                            tracing::warn!("Chapter {}: {}", target.code, stop)
                        }
                        _ => tracing::error!("Chapter {}: {}", target.code, stop),
                    }
                    return ChapterFetchReport {
                        pages_written,
                        stop,
                    };
                }
            }
        }

        ChapterFetchReport {
            pages_written,
            stop: StopReason::Completed,
        }
    }
}
