//! Enrichment extractors for the response filter chain.
//!
//! Each extractor fetches a referenced page and distills it into an HTML
//! fragment appended to the item. Fetches go through a bounded LRU
//! fragment cache so one hot link does not hammer its origin.

use anyhow::{Context, Result};
use lru::LruCache;
use scraper::{Html, Selector};
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Minimum capacity of the fragment cache.
pub const FRAGMENT_CACHE_SIZE: usize = 1024;

/// Shared plumbing of the enrichment filters: one HTTP client and the
/// url → fragment cache.
pub struct FilterContext {
    client: reqwest::Client,
    fragments: Mutex<LruCache<String, String>>,
}

impl FilterContext {
    pub fn new(client: reqwest::Client) -> Self {
        let cap = NonZeroUsize::new(FRAGMENT_CACHE_SIZE).expect("static capacity");
        Self {
            client,
            fragments: Mutex::new(LruCache::new(cap)),
        }
    }

    pub fn with_default_client() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self::new(client)
    }
}

/// What to distill out of a fetched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    /// `<meta property="og:image">` values, one `<img>` each.
    OgImages,
    /// Every `<img>` on the page (telegra.ph galleries), src resolved
    /// against the page origin.
    PageImages { origin: &'static str },
}

impl Extractor {
    /// Fetch `url` (through the fragment cache) and return the fragment.
    pub async fn extract(&self, ctx: &FilterContext, url: &str) -> Result<String> {
        {
            let mut fragments = ctx.fragments.lock().await;
            if let Some(hit) = fragments.get(&url.to_string()) {
                debug!(%url, "enrichment fragment cache hit");
                return Ok(hit.clone());
            }
        }

        let html = ctx
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("fetching {url}"))?
            .error_for_status()
            .with_context(|| format!("fetching {url}"))?
            .text()
            .await?;

        let fragment = match self {
            Extractor::OgImages => og_images(&html),
            Extractor::PageImages { origin } => page_images(&html, origin),
        };

        ctx.fragments
            .lock()
            .await
            .put(url.to_string(), fragment.clone());
        Ok(fragment)
    }
}

fn og_images(html: &str) -> String {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"meta[property="og:image"]"#).expect("static selector");
    document
        .select(&selector)
        .filter_map(|meta| meta.value().attr("content"))
        .filter(|src| !src.is_empty())
        .map(|src| format!("<img src=\"{src}\">"))
        .collect()
}

fn page_images(html: &str, origin: &str) -> String {
    let document = Html::parse_document(html);
    let selector = Selector::parse("img").expect("static selector");
    document
        .select(&selector)
        .filter_map(|img| img.value().attr("src"))
        .filter(|src| !src.is_empty())
        .map(|src| {
            if src.starts_with('/') {
                format!("<img src=\"{origin}{src}\">")
            } else {
                format!("<img src=\"{src}\">")
            }
        })
        .collect()
}
