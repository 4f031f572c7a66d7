//! Response filter chain for JSON Feed bodies.
//!
//! Each filter is an axum middleware watching one slice of the URL
//! space. When an outbound response is JSON and its path matches, the
//! filter decodes the body as a JSON Feed 1 envelope, drops blocked
//! items or enriches selected ones, and re-encodes pretty-printed.
//! Any failure inside a filter downgrades it to a pass-through with a
//! warning; the response itself never fails because of a filter.
//!
//! Filters registered earlier sit closer to the handler, so a response
//! flows through them in registration order and each filter sees the
//! previous filter's output.

pub mod enrich;

use crate::feed::{self, Feed, FeedItem};
use anyhow::{Context, Result, ensure};
use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::middleware::{self, Next};
use axum::response::Response;
use self::enrich::{Extractor, FilterContext};
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Content type every rewritten body carries.
const JSON_UTF8: &str = "application/json;charset=utf-8";

/// Drop an item when any configured predicate fires.
#[derive(Debug, Default)]
pub struct BlockRule {
    pub tags: HashSet<String>,
    pub substrings: Vec<String>,
    pub content_pattern: Option<Regex>,
    pub title_pattern: Option<Regex>,
}

impl BlockRule {
    pub fn blocks(&self, item: &FeedItem) -> bool {
        if item.tags.iter().any(|tag| self.tags.contains(tag)) {
            return true;
        }

        let content_html = item.content_html.as_deref().unwrap_or("");
        let content_text = item.content_text.as_deref().unwrap_or("");
        if self
            .substrings
            .iter()
            .any(|s| content_html.contains(s) || content_text.contains(s))
        {
            return true;
        }

        if let Some(pattern) = &self.content_pattern
            && (pattern.is_match(content_html) || pattern.is_match(content_text))
        {
            return true;
        }

        let title = item.title.as_deref().unwrap_or("");
        if let Some(pattern) = &self.title_pattern
            && pattern.is_match(title)
        {
            return true;
        }

        false
    }
}

/// Append a fetched fragment to items whose `content_html` matches the
/// trigger. Fires at most once per item (first trigger match wins).
pub struct EnrichRule {
    /// Capture group 1 is the URL handed to the extractor.
    pub trigger: Regex,
    pub extractor: Extractor,
}

impl EnrichRule {
    async fn apply(&self, item: &mut FeedItem, ctx: &FilterContext) -> Result<()> {
        let Some(html) = item.content_html.clone() else {
            return Ok(());
        };
        let Some(caps) = self.trigger.captures(&html) else {
            return Ok(());
        };
        let url = caps
            .get(1)
            .context("enrichment trigger has no capture group")?
            .as_str();

        let fragment = self.extractor.extract(ctx, url).await?;
        if !fragment.is_empty() {
            item.content_html = Some(format!("{html}<br>{fragment}"));
        }
        Ok(())
    }
}

pub enum FilterAction {
    Block(BlockRule),
    Enrich(EnrichRule),
}

pub struct FeedFilter {
    pub name: &'static str,
    pub url_pattern: Regex,
    pub action: FilterAction,
}

impl FeedFilter {
    async fn rewrite(&self, bytes: &[u8], ctx: &FilterContext) -> Result<Vec<u8>> {
        let mut parsed: Feed = serde_json::from_slice(bytes).context("decoding feed body")?;
        ensure!(
            parsed.is_supported_version(),
            "body does not declare JSON Feed 1"
        );

        match &self.action {
            FilterAction::Block(rule) => {
                let before = parsed.items.len();
                parsed.items.retain(|item| !rule.blocks(item));
                if parsed.items.len() != before {
                    debug!(
                        filter = self.name,
                        dropped = before - parsed.items.len(),
                        "blocked feed items"
                    );
                }
            }
            FilterAction::Enrich(rule) => {
                for item in &mut parsed.items {
                    rule.apply(item, ctx).await?;
                }
            }
        }

        Ok(feed::to_pretty_json(&parsed)?)
    }
}

/// Middleware body shared by every filter instance.
async fn apply_filter(
    State((filter, ctx)): State<(Arc<FeedFilter>, Arc<FilterContext>)>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let response = next.run(request).await;

    if !filter.url_pattern.is_match(&path) {
        return response;
    }
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);
    if !is_json {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(filter = filter.name, error = %e, "failed to buffer response body");
            return Response::from_parts(parts, Body::empty());
        }
    };

    match filter.rewrite(&bytes, &ctx).await {
        Ok(rewritten) => {
            parts.headers.remove(CONTENT_LENGTH);
            parts
                .headers
                .insert(CONTENT_TYPE, JSON_UTF8.parse().expect("static header"));
            Response::from_parts(parts, Body::from(rewritten))
        }
        Err(e) => {
            warn!(filter = filter.name, error = %e, "filter failed, passing body through");
            Response::from_parts(parts, Body::from(bytes))
        }
    }
}

/// Attach `filters` to `router` so responses are rewritten in the order
/// the filters appear in the slice.
pub fn install(
    mut router: Router,
    filters: Vec<Arc<FeedFilter>>,
    ctx: Arc<FilterContext>,
) -> Router {
    // Successive Router::layer calls nest outward, so the first filter
    // ends up innermost and rewrites the response first.
    for filter in filters {
        router = router.layer(middleware::from_fn_with_state(
            (filter, Arc::clone(&ctx)),
            apply_filter,
        ));
    }
    router
}

/// The stock filter set, scoped under the API prefix.
pub fn default_filters(prefix: &str) -> Vec<Arc<FeedFilter>> {
    let prefix = regex::escape(prefix);
    let re = |suffix: &str| {
        Regex::new(&format!("^{prefix}{suffix}")).expect("static filter pattern")
    };

    vec![
        Arc::new(FeedFilter {
            name: "telegram-block",
            url_pattern: re("/rss/telegram/"),
            action: FilterAction::Block(BlockRule {
                tags: ["#广告", "#推广", "#赞助"]
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                substrings: vec![
                    "广告投放".to_string(),
                    "推广合作".to_string(),
                    "开户送".to_string(),
                ],
                ..Default::default()
            }),
        }),
        Arc::new(FeedFilter {
            name: "nga-block",
            url_pattern: re("/rss/nga/"),
            action: FilterAction::Block(BlockRule {
                substrings: vec!["预制菜".to_string()],
                title_pattern: Some(Regex::new("预制菜").expect("static pattern")),
                ..Default::default()
            }),
        }),
        Arc::new(FeedFilter {
            name: "nodeseek-block",
            url_pattern: re("/rss/nodeseek/"),
            action: FilterAction::Block(BlockRule {
                content_pattern: Some(Regex::new("(?i)HostDZire").expect("static pattern")),
                title_pattern: Some(Regex::new("(?i)HostDZire").expect("static pattern")),
                ..Default::default()
            }),
        }),
        Arc::new(FeedFilter {
            name: "fixupx-enrich",
            url_pattern: re("/rss/"),
            action: FilterAction::Enrich(EnrichRule {
                trigger: Regex::new(r#"(https://fixupx\.com/[^/\s"'<>]+/status/\d+)"#)
                    .expect("static pattern"),
                extractor: Extractor::OgImages,
            }),
        }),
        Arc::new(FeedFilter {
            name: "telegraph-enrich",
            url_pattern: re("/rss/"),
            action: FilterAction::Enrich(EnrichRule {
                trigger: Regex::new(r#"<a href="(https://telegra\.ph/[^"]+)""#)
                    .expect("static pattern"),
                extractor: Extractor::PageImages {
                    origin: "https://telegra.ph",
                },
            }),
        }),
    ]
}
