//! HTTP surface: router, handlers, shutdown signal.
//!
//! The service mounts the Douyin feed endpoints under the configurable
//! API prefix and wraps everything in the response filter chain plus
//! request tracing. Feed bodies are emitted pretty-printed so the filter
//! chain's re-encoding is byte-stable for untouched responses.

use crate::douyin::DouyinService;
use crate::error::{Error, Result};
use crate::feed;
use crate::filters::{self, enrich::FilterContext};
use crate::settings::{DEFAULT_FETCH_TIMEOUT, Settings};
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::Response;
use axum::routing::get;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub douyin: Arc<DouyinService>,
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default = "default_use_cache")]
    use_cache: bool,
    /// Per-request fetch timeout in seconds.
    timeout: Option<f64>,
}

fn default_use_cache() -> bool {
    true
}

impl FeedQuery {
    fn timeout(&self) -> Duration {
        self.timeout
            .map(Duration::from_secs_f64)
            .unwrap_or(DEFAULT_FETCH_TIMEOUT)
    }
}

pub fn router(state: AppState, filter_ctx: Arc<FilterContext>) -> Router {
    let prefix = state.settings.api_prefix.clone();

    let api = Router::new()
        .route("/rss/douyin/user/:username", get(douyin_user))
        .route(
            "/rss/douyin/user/:username/:sessionid_ss",
            get(douyin_user_with_cookie),
        )
        .with_state(state);

    let app = Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .nest(&prefix, api);

    let app = filters::install(app, filters::default_filters(&prefix), filter_ctx);
    app.layer(TraceLayer::new_for_http())
}

async fn index() -> &'static str {
    concat!("feedgate ", env!("CARGO_PKG_VERSION"), " is running.")
}

async fn healthz() -> &'static str {
    "ok"
}

async fn douyin_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<FeedQuery>,
) -> Result<Response> {
    user_feed_response(&state, &username, None, &query).await
}

async fn douyin_user_with_cookie(
    State(state): State<AppState>,
    Path((username, sessionid_ss)): Path<(String, String)>,
    Query(query): Query<FeedQuery>,
) -> Result<Response> {
    let cookie = format!("sessionid_ss={sessionid_ss}");
    user_feed_response(&state, &username, Some(cookie), &query).await
}

async fn user_feed_response(
    state: &AppState,
    username: &str,
    cookie: Option<String>,
    query: &FeedQuery,
) -> Result<Response> {
    if username.is_empty() {
        return Err(Error::BadRequest("username must not be empty".to_string()));
    }

    let feed = state
        .douyin
        .user_feed(username, cookie.as_deref(), query.timeout(), query.use_cache)
        .await?;

    let body = feed::to_pretty_json(feed.as_ref())
        .map_err(|e| Error::Parse(format!("encoding feed: {e}")))?;
    Response::builder()
        .header(CONTENT_TYPE, "application/json;charset=utf-8")
        .body(body.into())
        .map_err(|e| Error::Other(e.into()))
}

/// Resolve on SIGINT or SIGTERM; drives axum's graceful shutdown.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("shutdown signal received");
}
