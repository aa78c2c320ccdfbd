//! Page image downloads with atomic writes
//!
//! A page is fetched into memory, written to a temporary sibling file and then
//! renamed into place, so an interrupted run never leaves a truncated page
//! under its final name.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::app::client::http::HttpHandler;
use crate::constants::files;
use crate::errors::{DownloadError, DownloadResult};

/// What happened to a page on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageWrite {
    /// The page was downloaded and written
    Written { bytes: usize },
    /// A non-empty file already existed and was kept
    Kept,
}

/// Page download operations handler
pub struct DownloadHandler<'a> {
    http_handler: &'a HttpHandler,
}

impl<'a> DownloadHandler<'a> {
    /// Creates a new DownloadHandler with the given HTTP handler
    pub fn new(http_handler: &'a HttpHandler) -> Self {
        Self { http_handler }
    }

    /// Downloads a page to `destination`
    ///
    /// The parent folder is created only once the server has answered with a
    /// page, so a chapter whose first page fails leaves nothing behind.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The server answers with anything other than 200
    /// - The request fails in transport
    /// - File I/O operations fail
    pub async fn save_page(
        &self,
        url: &Url,
        destination: &Path,
        overwrite: bool,
    ) -> DownloadResult<PageWrite> {
        if !overwrite && is_non_empty_file(destination).await {
            tracing::debug!("Keeping existing page: {}", destination.display());
            return Ok(PageWrite::Kept);
        }

        let bytes = self.http_handler.get_bytes(url).await?;

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = temp_path_for(destination);
        if let Err(e) = write_file(&temp_path, &bytes).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }

        if tokio::fs::rename(&temp_path, destination).await.is_err() {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(DownloadError::AtomicOperationFailed {
                temp_path,
                final_path: destination.to_path_buf(),
            });
        }

        Ok(PageWrite::Written { bytes: bytes.len() })
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> DownloadResult<()> {
    let mut file = File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    Ok(())
}

async fn is_non_empty_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}

/// Temporary sibling of `destination`, e.g. `001.png.tmp`
pub fn temp_path_for(destination: &Path) -> PathBuf {
    destination.with_extension(format!(
        "{}{}",
        destination
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or(""),
        files::TEMP_FILE_SUFFIX
    ))
}
