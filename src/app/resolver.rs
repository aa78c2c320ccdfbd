//! Chapter address resolution
//!
//! The images of a chapter are served from a host that is only named inside an
//! inline script of the chapter's reader page. Resolution fetches that page,
//! falls back to the alternate index page when the assignment is missing, and
//! extracts the resource path together with the page count when the page
//! advertises one.

use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::app::client::MangaClient;
use crate::app::endpoints::Endpoints;
use crate::constants::endpoints;
use crate::errors::{ResolveError, ResolveResult};

static RESOURCE_PATH: OnceLock<Regex> = OnceLock::new();
static CHAPTER_DESCRIPTOR: OnceLock<Regex> = OnceLock::new();
static SCRIPT: OnceLock<Selector> = OnceLock::new();

fn resource_path_regex() -> &'static Regex {
    RESOURCE_PATH.get_or_init(|| {
        Regex::new(endpoints::RESOURCE_PATH_PATTERN).expect("compile RESOURCE_PATH_PATTERN")
    })
}

fn chapter_descriptor_regex() -> &'static Regex {
    CHAPTER_DESCRIPTOR.get_or_init(|| {
        Regex::new(endpoints::CHAPTER_DESCRIPTOR_PATTERN)
            .expect("compile CHAPTER_DESCRIPTOR_PATTERN")
    })
}

fn script_selector() -> &'static Selector {
    SCRIPT.get_or_init(|| {
        Selector::parse(endpoints::SCRIPT_SELECTOR).expect("parse SCRIPT_SELECTOR")
    })
}

/// Which lookup page yielded the resource path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStage {
    Primary,
    Fallback,
}

impl fmt::Display for LookupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupStage::Primary => f.write_str("primary"),
            LookupStage::Fallback => f.write_str("fallback"),
        }
    }
}

/// Result of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChapter {
    /// Host (and optional path prefix) the page images are served from
    pub resource_path: String,
    /// Page count advertised by the lookup page, if any
    pub page_count: Option<u32>,
    /// Lookup page the resource path came from
    pub source: LookupStage,
}

/// What a lookup page told us
#[derive(Debug, Default, PartialEq, Eq)]
struct LookupPage {
    resource_path: Option<String>,
    page_count: Option<u32>,
}

impl LookupPage {
    /// Parse a lookup page. `Html` is not `Send`, so parsing stays synchronous
    /// and never spans an await point.
    fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);
        let scripts: Vec<String> = document
            .select(script_selector())
            .map(|element| element.text().collect::<String>())
            .collect();

        let resource_path = scripts
            .iter()
            .find_map(|script| capture_resource_path(script))
            // Malformed markup can hide the script element from the parser
            .or_else(|| capture_resource_path(html));

        let page_count = scripts
            .iter()
            .find_map(|script| capture_page_count(script))
            .or_else(|| capture_page_count(html));

        Self {
            resource_path,
            page_count,
        }
    }
}

fn capture_resource_path(text: &str) -> Option<String> {
    resource_path_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|path| !path.is_empty())
}

fn capture_page_count(text: &str) -> Option<u32> {
    let descriptor = chapter_descriptor_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))?;
    let value: Value = serde_json::from_str(descriptor.as_str()).ok()?;

    match value.get("Page")? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        _ => None,
    }
}

/// Extract the resource path from a lookup page
pub fn extract_resource_path(html: &str) -> Option<String> {
    LookupPage::parse(html).resource_path
}

/// Extract the advertised page count from a lookup page
pub fn extract_page_count(html: &str) -> Option<u32> {
    LookupPage::parse(html).page_count
}

/// Two-stage resolver for chapter resource paths
#[derive(Debug, Clone)]
pub struct AddressResolver {
    client: Arc<MangaClient>,
    endpoints: Arc<Endpoints>,
}

impl AddressResolver {
    pub fn new(client: Arc<MangaClient>, endpoints: Arc<Endpoints>) -> Self {
        Self { client, endpoints }
    }

    /// Resolve the resource path of one chapter
    ///
    /// Makes at most two requests. A failed primary request aborts
    /// immediately; only a primary page without the assignment triggers the
    /// fallback page.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::Download` if the primary request fails and
    /// `ResolveError::TokenNotFound` if neither page names the resource path
    pub async fn resolve(&self, slug: &str, chapter_code: &str) -> ResolveResult<ResolvedChapter> {
        let primary_url = self.endpoints.primary_lookup(slug, chapter_code)?;
        tracing::info!("Resolving chapter {} via {}", chapter_code, primary_url);

        let html = self.client.get_page(&primary_url).await?;
        let page = LookupPage::parse(&html);
        if let Some(resource_path) = page.resource_path {
            return Ok(ResolvedChapter {
                resource_path,
                page_count: page.page_count,
                source: LookupStage::Primary,
            });
        }

        let fallback_url = self.endpoints.fallback_lookup(slug, chapter_code)?;
        tracing::warn!(
            "Resource path missing from primary page for chapter {}, trying {}",
            chapter_code,
            fallback_url
        );

        let page = match self.client.get_page(&fallback_url).await {
            Ok(html) => LookupPage::parse(&html),
            Err(e) => {
                tracing::warn!("Fallback lookup for chapter {} failed: {}", chapter_code, e);
                LookupPage::default()
            }
        };

        match page.resource_path {
            Some(resource_path) => Ok(ResolvedChapter {
                resource_path,
                page_count: page.page_count,
                source: LookupStage::Fallback,
            }),
            None => Err(ResolveError::TokenNotFound {
                slug: slug.to_string(),
                chapter: chapter_code.to_string(),
            }),
        }
    }
}
