//! Remote endpoint templates
//!
//! Every URL the fetcher requests is built here from the series slug, the
//! formatted chapter code and, for page images, the resolved resource path.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{endpoints, files};
use crate::errors::{DownloadError, DownloadResult};

/// Endpoint templates for chapter lookup pages and page images
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    /// Base of the lookup pages, e.g. `https://manga4life.com`
    pub lookup_base: String,
    /// Scheme used to reach the resolved resource host
    pub image_scheme: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            lookup_base: endpoints::DEFAULT_LOOKUP_BASE.to_string(),
            image_scheme: endpoints::DEFAULT_IMAGE_SCHEME.to_string(),
        }
    }
}

impl Endpoints {
    /// Create endpoint templates, checking the lookup base is a usable URL
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::InvalidUrl` if the base cannot be parsed
    pub fn new(lookup_base: impl Into<String>, image_scheme: impl Into<String>) -> DownloadResult<Self> {
        let endpoints = Self {
            lookup_base: lookup_base.into(),
            image_scheme: image_scheme.into(),
        };
        parse_url(&endpoints.lookup_base)?;
        Ok(endpoints)
    }

    /// Primary lookup page: `<base>/read-online/<slug>-chapter-<code>.html`
    pub fn primary_lookup(&self, slug: &str, chapter_code: &str) -> DownloadResult<Url> {
        self.lookup(slug, chapter_code, "")
    }

    /// Fallback lookup page: `<base>/read-online/<slug>-chapter-<code>-index-2.html`
    pub fn fallback_lookup(&self, slug: &str, chapter_code: &str) -> DownloadResult<Url> {
        self.lookup(slug, chapter_code, endpoints::ALTERNATE_INDEX_SUFFIX)
    }

    fn lookup(&self, slug: &str, chapter_code: &str, suffix: &str) -> DownloadResult<Url> {
        parse_url(&format!(
            "{}/read-online/{}-chapter-{}{}.html",
            self.lookup_base.trim_end_matches('/'),
            slug,
            chapter_code,
            suffix
        ))
    }

    /// Page image: `<scheme>://<resource>/manga/<slug>/<code>-<page:03>.png`
    pub fn page_image(
        &self,
        resource_path: &str,
        slug: &str,
        chapter_code: &str,
        page: u32,
    ) -> DownloadResult<Url> {
        parse_url(&format!(
            "{}://{}/manga/{}/{}-{:0width$}.{}",
            self.image_scheme,
            resource_path.trim_matches('/'),
            slug,
            chapter_code,
            page,
            files::PAGE_EXTENSION,
            width = files::PAGE_INDEX_WIDTH
        ))
    }
}

fn parse_url(raw: &str) -> DownloadResult<Url> {
    Url::parse(raw).map_err(|e| DownloadError::InvalidUrl {
        url: raw.to_string(),
        error: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_urls() {
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints.primary_lookup("One-Piece", "0007").unwrap().as_str(),
            "https://manga4life.com/read-online/One-Piece-chapter-0007.html"
        );
        assert_eq!(
            endpoints.fallback_lookup("One-Piece", "0007.5").unwrap().as_str(),
            "https://manga4life.com/read-online/One-Piece-chapter-0007.5-index-2.html"
        );
    }

    #[test]
    fn test_lookup_base_trailing_slash() {
        let endpoints = Endpoints::new("http://127.0.0.1:8080/", "http").unwrap();
        assert_eq!(
            endpoints.primary_lookup("Berserk", "0001").unwrap().as_str(),
            "http://127.0.0.1:8080/read-online/Berserk-chapter-0001.html"
        );
    }

    #[test]
    fn test_page_image_url() {
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints
                .page_image("scans.example.us", "One-Piece", "0007", 3)
                .unwrap()
                .as_str(),
            "https://scans.example.us/manga/One-Piece/0007-003.png"
        );
    }

    #[test]
    fn test_invalid_lookup_base() {
        assert!(matches!(
            Endpoints::new("not a url", "https"),
            Err(DownloadError::InvalidUrl { .. })
        ));
    }
}
