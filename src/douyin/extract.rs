//! Browser-driven extraction of a Douyin user's post feed.
//!
//! The user page loads its posts through an XHR whose URL contains
//! `/web/aweme/post`; a CDP response listener captures the first such
//! response and its body becomes the feed payload. The whole task races
//! against the caller's deadline, and the browser session is released on
//! every exit path.

use crate::browser::{self, BrowserSession};
use crate::douyin::types::PostList;
use crate::error::{Error, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, EventResponseReceived, GetResponseBodyParams,
};
use futures::StreamExt;
use std::time::Duration;
use tracing::debug;

/// Substring identifying the post-feed XHR; first match wins.
pub const POST_FEED_URL_MARKER: &str = "/web/aweme/post";

/// Cookie domain the injected session cookies are scoped to.
const COOKIE_DOMAIN: &str = "www.douyin.com";

/// One extraction task: fresh browser, single user page, one deadline.
#[derive(Debug, Clone)]
pub struct UserFeedTask {
    pub username: String,
    pub cookie: Option<String>,
    pub timeout: Duration,
}

/// Split a raw `Cookie` header into pairs; malformed fragments (no `=`,
/// empty name) are discarded.
pub fn parse_cookie_header(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|fragment| {
            let (name, value) = fragment.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Run one extraction task to completion or deadline.
pub async fn fetch_post_list(headless: bool, task: &UserFeedTask) -> Result<PostList> {
    let session = browser::launch(headless)
        .await
        .map_err(|e| Error::Browser(format!("{e:#}")))?;

    // The session drops (killing Chrome and removing the profile dir)
    // whichever way this returns.
    match tokio::time::timeout(task.timeout, capture(&session, task)).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(task.timeout)),
    }
}

async fn capture(session: &BrowserSession, task: &UserFeedTask) -> Result<PostList> {
    let page = session
        .browser()
        .new_page("about:blank")
        .await
        .map_err(|e| Error::Browser(e.to_string()))?;

    if let Some(cookie) = &task.cookie {
        let cookies: Vec<CookieParam> = parse_cookie_header(cookie)
            .into_iter()
            .map(|(name, value)| {
                let mut param = CookieParam::new(name, value);
                param.domain = Some(COOKIE_DOMAIN.to_string());
                param
            })
            .collect();
        if !cookies.is_empty() {
            page.set_cookies(cookies)
                .await
                .map_err(|e| Error::Browser(e.to_string()))?;
        }
    }

    // Register the listener before navigating so early responses are not
    // missed; the stream buffers until polled.
    let mut responses = page
        .event_listener::<EventResponseReceived>()
        .await
        .map_err(|e| Error::Browser(e.to_string()))?;

    let url = format!("https://www.douyin.com/user/{}", task.username);
    debug!(%url, "navigating");
    page.goto(url.as_str())
        .await
        .map_err(|e| Error::Browser(e.to_string()))?;

    while let Some(event) = responses.next().await {
        if !event.response.url.contains(POST_FEED_URL_MARKER) {
            continue;
        }
        debug!(url = %event.response.url, "captured post-feed response");

        let body = page
            .execute(GetResponseBodyParams::new(event.request_id.clone()))
            .await
            .map_err(|e| Error::Browser(e.to_string()))?;

        let raw: Vec<u8> = if body.base64_encoded {
            BASE64
                .decode(body.body.as_bytes())
                .map_err(|e| Error::Parse(format!("response body base64: {e}")))?
        } else {
            body.body.clone().into_bytes()
        };

        // An empty `aweme_list` deserializes to an empty post list:
        // success with zero items, not an error.
        return serde_json::from_slice(&raw).map_err(|e| Error::Parse(e.to_string()));
    }

    Err(Error::Browser(
        "page closed before a post-feed response arrived".to_string(),
    ))
}
