//! Tests for the JSON-feed response filter chain.

use axum::Router;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use feedgate::feed::{self, Feed, FeedItem};
use feedgate::filters::enrich::{Extractor, FilterContext};
use feedgate::filters::{self, EnrichRule, FeedFilter, FilterAction};
use regex::Regex;
use std::sync::Arc;
use tower::ServiceExt;

fn feed_with_items(items: Vec<FeedItem>) -> Feed {
    let mut feed = Feed::new("fixture");
    feed.items = items;
    feed
}

fn item(id: &str) -> FeedItem {
    let mut item = FeedItem::new(id);
    item.title = Some(format!("title {id}"));
    item.content_html = Some(format!("<p>body {id}</p>"));
    item
}

/// Serve `body` as application/json on `path`, wrapped in the stock
/// filter chain.
fn app(path: &'static str, body: String) -> Router {
    let router = Router::new().route(
        path,
        get(move || async move { ([(CONTENT_TYPE, "application/json")], body) }),
    );
    filters::install(
        router,
        filters::default_filters("/api"),
        Arc::new(FilterContext::with_default_client()),
    )
}

async fn fetch(router: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn telegram_filter_drops_tagged_items() {
    let mut ad = item("ad");
    ad.tags = vec!["#广告".to_string()];
    let feed = feed_with_items(vec![ad, item("keep")]);
    let body = String::from_utf8(feed::to_pretty_json(&feed).unwrap()).unwrap();

    let (status, bytes) = fetch(
        app("/api/rss/telegram/channel", body),
        "/api/rss/telegram/channel",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let rewritten: Feed = serde_json::from_slice(&bytes).unwrap();
    let ids: Vec<&str> = rewritten.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["keep"]);
}

#[tokio::test]
async fn clean_feed_passes_through_byte_identical() {
    let feed = feed_with_items(vec![item("a"), item("b")]);
    let body = String::from_utf8(feed::to_pretty_json(&feed).unwrap()).unwrap();

    let (status, bytes) = fetch(
        app("/api/rss/telegram/channel", body.clone()),
        "/api/rss/telegram/channel",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(bytes).unwrap(), body);
}

#[tokio::test]
async fn nga_filter_blocks_by_title_substring() {
    let mut bad = item("bad");
    bad.title = Some("关于预制菜的讨论".to_string());
    let feed = feed_with_items(vec![bad, item("good")]);
    let body = String::from_utf8(feed::to_pretty_json(&feed).unwrap()).unwrap();

    let (_, bytes) = fetch(app("/api/rss/nga/1", body), "/api/rss/nga/1").await;
    let rewritten: Feed = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(rewritten.items.len(), 1);
    assert_eq!(rewritten.items[0].id, "good");
}

#[tokio::test]
async fn nodeseek_filter_blocks_case_insensitively() {
    let mut bad = item("bad");
    bad.content_html = Some("<p>offer from hostdzire inc</p>".to_string());
    let feed = feed_with_items(vec![bad, item("good")]);
    let body = String::from_utf8(feed::to_pretty_json(&feed).unwrap()).unwrap();

    let (_, bytes) = fetch(app("/api/rss/nodeseek/rss", body), "/api/rss/nodeseek/rss").await;
    let rewritten: Feed = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(rewritten.items.len(), 1);
    assert_eq!(rewritten.items[0].id, "good");
}

#[tokio::test]
async fn non_feed_json_passes_through_unchanged() {
    let body = r#"{"hello": 1}"#.to_string();
    let (status, bytes) = fetch(
        app("/api/rss/telegram/x", body.clone()),
        "/api/rss/telegram/x",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(bytes).unwrap(), body);
}

#[tokio::test]
async fn unmatched_paths_are_untouched() {
    let feed = feed_with_items(vec![item("a")]);
    // Compact encoding would be reformatted by any filter that ran.
    let body = serde_json::to_string(&feed).unwrap();

    let (_, bytes) = fetch(app("/api/other/json", body.clone()), "/api/other/json").await;
    assert_eq!(String::from_utf8(bytes).unwrap(), body);
}

#[tokio::test]
async fn rewritten_responses_carry_utf8_json_content_type() {
    let feed = feed_with_items(vec![item("a")]);
    let body = String::from_utf8(feed::to_pretty_json(&feed).unwrap()).unwrap();

    let router = app("/api/rss/telegram/x", body);
    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/rss/telegram/x")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers().get(CONTENT_TYPE).unwrap(),
        "application/json;charset=utf-8"
    );
}

#[tokio::test]
async fn enrichment_appends_og_images_once_per_item() {
    let mut server = mockito::Server::new_async().await;
    let page = server
        .mock("GET", "/status/42")
        .with_header("content-type", "text/html")
        .with_body(
            r#"<html><head><meta property="og:image" content="https://pbs.example/a.jpg"/></head></html>"#,
        )
        .expect(1)
        .create_async()
        .await;

    let status_url = format!("{}/status/42", server.url());
    let mut enrichable = item("e");
    enrichable.content_html = Some(format!("<p>see {status_url} and {status_url}</p>"));
    let feed = feed_with_items(vec![enrichable]);
    let body = String::from_utf8(feed::to_pretty_json(&feed).unwrap()).unwrap();

    let filter = Arc::new(FeedFilter {
        name: "test-enrich",
        url_pattern: Regex::new("^/api/rss/").unwrap(),
        action: FilterAction::Enrich(EnrichRule {
            trigger: Regex::new(r"(http://[^/\s]+/status/\d+)").unwrap(),
            extractor: Extractor::OgImages,
        }),
    });
    let router = Router::new().route(
        "/api/rss/feed",
        get(move || async move { ([(CONTENT_TYPE, "application/json")], body) }),
    );
    let router = filters::install(
        router,
        vec![filter],
        Arc::new(FilterContext::with_default_client()),
    );

    let (_, bytes) = fetch(router, "/api/rss/feed").await;
    let rewritten: Feed = serde_json::from_slice(&bytes).unwrap();
    let html = rewritten.items[0].content_html.as_deref().unwrap();
    assert!(html.contains("<img src=\"https://pbs.example/a.jpg\">"), "got {html}");
    page.assert_async().await;
}

#[tokio::test]
async fn failing_enrichment_passes_response_through() {
    let mut enrichable = item("e");
    // Points at a closed port, so the fetch fails fast.
    enrichable.content_html = Some("<p>http://127.0.0.1:1/status/42</p>".to_string());
    let feed = feed_with_items(vec![enrichable]);
    let body = String::from_utf8(feed::to_pretty_json(&feed).unwrap()).unwrap();

    let filter = Arc::new(FeedFilter {
        name: "test-enrich",
        url_pattern: Regex::new("^/api/rss/").unwrap(),
        action: FilterAction::Enrich(EnrichRule {
            trigger: Regex::new(r"(http://[^/\s<]+/status/\d+)").unwrap(),
            extractor: Extractor::OgImages,
        }),
    });
    let body_clone = body.clone();
    let router = Router::new().route(
        "/api/rss/feed",
        get(move || async move { ([(CONTENT_TYPE, "application/json")], body_clone) }),
    );
    let router = filters::install(
        router,
        vec![filter],
        Arc::new(FilterContext::with_default_client()),
    );

    let (status, bytes) = fetch(router, "/api/rss/feed").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(bytes).unwrap(), body);
}

#[tokio::test]
async fn filters_compose_in_registration_order() {
    // Two block filters on the same path: the first removes by tag, the
    // second sees the survivor list and removes by title.
    let mut first = item("first");
    first.tags = vec!["drop-me".to_string()];
    let mut second = item("second");
    second.title = Some("also drop".to_string());
    let feed = feed_with_items(vec![first, second, item("keep")]);
    let body = String::from_utf8(feed::to_pretty_json(&feed).unwrap()).unwrap();

    let tag_filter = Arc::new(FeedFilter {
        name: "by-tag",
        url_pattern: Regex::new("^/api/rss/").unwrap(),
        action: FilterAction::Block(feedgate::BlockRule {
            tags: ["drop-me".to_string()].into_iter().collect(),
            ..Default::default()
        }),
    });
    let title_filter = Arc::new(FeedFilter {
        name: "by-title",
        url_pattern: Regex::new("^/api/rss/").unwrap(),
        action: FilterAction::Block(feedgate::BlockRule {
            title_pattern: Some(Regex::new("also drop").unwrap()),
            ..Default::default()
        }),
    });

    let router = Router::new().route(
        "/api/rss/feed",
        get(move || async move { ([(CONTENT_TYPE, "application/json")], body) }),
    );
    let router = filters::install(
        router,
        vec![tag_filter, title_filter],
        Arc::new(FilterContext::with_default_client()),
    );

    let (_, bytes) = fetch(router, "/api/rss/feed").await;
    let rewritten: Feed = serde_json::from_slice(&bytes).unwrap();
    let ids: Vec<&str> = rewritten.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["keep"]);
}
