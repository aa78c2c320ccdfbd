//! HTTP client shared by every chapter job of a run
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `http`: rate limiting, connection budget and status handling
//! - `download`: page downloads with atomic writes

use std::path::Path;

use url::Url;

use crate::errors::DownloadResult;

pub mod config;
pub mod download;
pub mod http;

pub use config::ClientConfig;
pub use download::PageWrite;

use download::DownloadHandler;
use http::HttpHandler;

/// HTTP client for the manga origin
///
/// One instance is created per run and shared, read-only, by every concurrently
/// running chapter job.
#[derive(Debug)]
pub struct MangaClient {
    http_handler: HttpHandler,
}

impl MangaClient {
    /// Creates a client bound to at most `max_connections` requests in flight
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the HTTP client cannot be built or the
    /// configuration is invalid
    pub fn new(config: &ClientConfig, max_connections: usize) -> DownloadResult<Self> {
        let client = config.build_http_client(max_connections)?;
        let http_handler = HttpHandler::new(
            client,
            config.rate_limit_rps,
            max_connections,
            config.throttle_retries,
        )?;

        tracing::debug!(
            "Created HTTP client with a budget of {} connections",
            max_connections
        );

        Ok(Self { http_handler })
    }

    /// Fetches the HTML of a lookup page
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` for non-200 answers and transport failures
    pub async fn get_page(&self, url: &Url) -> DownloadResult<String> {
        self.http_handler.get_text(url).await
    }

    /// Downloads one page image to `destination`
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` for non-200 answers, transport failures and
    /// file I/O failures
    pub async fn save_page(
        &self,
        url: &Url,
        destination: &Path,
        overwrite: bool,
    ) -> DownloadResult<PageWrite> {
        DownloadHandler::new(&self.http_handler)
            .save_page(url, destination, overwrite)
            .await
    }

    /// Size of the connection budget
    pub fn max_connections(&self) -> usize {
        self.http_handler.max_connections()
    }

    /// Connection permits not currently held by a request
    pub fn idle_connections(&self) -> usize {
        self.http_handler.idle_connections()
    }
}
