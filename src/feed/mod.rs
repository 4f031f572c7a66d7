//! JSON Feed 1 envelope and item types.
//!
//! JSON Feed is the canonical internal shape of every feed this service
//! produces or rewrites; RSS/Atom never appear past the edges. Optional
//! fields serialize only when present so rewritten bodies stay minimal.

use serde::{Deserialize, Serialize};

/// Version marker of JSON Feed 1, fixed for every envelope.
pub const JSON_FEED_VERSION: &str = "https://jsonfeed.org/version/1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    pub version: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_page_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    #[serde(default)]
    pub items: Vec<FeedItem>,
}

impl Feed {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            version: JSON_FEED_VERSION.to_string(),
            title: title.into(),
            description: None,
            home_page_url: None,
            feed_url: None,
            icon: None,
            favicon: None,
            items: Vec::new(),
        }
    }

    /// Whether the body declares the JSON Feed version this service
    /// understands.
    pub fn is_supported_version(&self) -> bool {
        self.version == JSON_FEED_VERSION
    }
}

/// One normalized entry. Invariant: `id` is unique within a feed and at
/// least one of `content_html`/`content_text` is non-empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_published: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<FeedAuthor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl FeedItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: None,
            title: None,
            content_html: None,
            content_text: None,
            date_published: None,
            tags: Vec::new(),
            author: None,
            image: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedAuthor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Pretty-print with 4-space indentation and non-ASCII left unescaped,
/// the wire shape every feed endpoint and response filter emits.
pub fn to_pretty_json<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(4096);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut ser)?;
    Ok(out)
}
