//! Douyin user-feed service.
//!
//! Composes the session limiter, the single-flight feed cache, the
//! browser extractor and the normalizer behind one facade used by both
//! the HTTP endpoints and the background refresher.

pub mod extract;
pub mod normalize;
pub mod types;

use crate::cache::RandomTtlCache;
use crate::cache::coordinator::SingleFlightCache;
use crate::error::Result;
use crate::feed::Feed;
use crate::history::AccessHistory;
use crate::limiter::SessionLimiter;
use crate::settings::Settings;
use self::extract::UserFeedTask;
use self::types::PostList;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Bound on distinct users kept in the feed cache.
const FEED_CACHE_SIZE: usize = 256;

pub struct DouyinService {
    headless: bool,
    api_prefix: String,
    limiter: SessionLimiter,
    cache: SingleFlightCache<Arc<Feed>>,
    history: Arc<AccessHistory>,
}

impl DouyinService {
    pub fn new(settings: &Settings, history: Arc<AccessHistory>) -> Self {
        let cache = SingleFlightCache::new(RandomTtlCache::with_default_jitter(
            FEED_CACHE_SIZE,
            settings.douyin_feeds_cache_time,
        ));
        Self {
            headless: settings.douyin_headless,
            api_prefix: settings.api_prefix.clone(),
            limiter: SessionLimiter::new(settings.douyin_concurrency),
            cache,
            history,
        }
    }

    /// On-demand fetch for the HTTP surface. A supplied cookie is
    /// recorded in the access history (failures surface to the caller)
    /// before the fetch; `use_cache=false` bypasses the cache read but
    /// still refreshes the stored entry.
    pub async fn user_feed(
        &self,
        username: &str,
        cookie: Option<&str>,
        timeout: Duration,
        use_cache: bool,
    ) -> Result<Arc<Feed>> {
        if let Some(cookie) = cookie {
            self.history.put(username, cookie).await?;
        }

        let cookie = cookie.map(str::to_owned);
        if use_cache {
            self.cache
                .get_or_compute(username, None, || {
                    self.fetch_fresh(username.to_string(), cookie, timeout)
                })
                .await
        } else {
            let feed = self
                .fetch_fresh(username.to_string(), cookie, timeout)
                .await?;
            self.cache.put(username.to_string(), Arc::clone(&feed)).await;
            Ok(feed)
        }
    }

    /// Cache-warming fetch used by the refresher; identical caching
    /// semantics, but the cookie is already in history and is not
    /// re-recorded.
    pub async fn warm(&self, username: &str, cookie: &str, timeout: Duration) -> Result<Arc<Feed>> {
        let cookie = Some(cookie.to_owned());
        self.cache
            .get_or_compute(username, None, || {
                self.fetch_fresh(username.to_string(), cookie, timeout)
            })
            .await
    }

    /// Drop expired cache entries; pressure hook for the watchdog.
    pub async fn prune_cache(&self) -> usize {
        self.cache.expire().await
    }

    async fn fetch_fresh(
        &self,
        username: String,
        cookie: Option<String>,
        timeout: Duration,
    ) -> Result<Arc<Feed>> {
        let _permit = self.limiter.acquire().await;
        info!(%username, "fetching Douyin user feed via browser");

        let task = UserFeedTask {
            username: username.clone(),
            cookie,
            timeout,
        };
        let list = extract::fetch_post_list(self.headless, &task).await?;
        Ok(Arc::new(self.build_feed(&username, &list)))
    }

    fn build_feed(&self, username: &str, list: &PostList) -> Feed {
        let author = normalize::feed_author(username, list);
        let display_name = author
            .as_ref()
            .and_then(|a| a.name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| username.to_string());

        let mut feed = Feed::new(format!("{display_name} 的抖音"));
        feed.description = Some(format!("{display_name} 的最新视频"));
        feed.home_page_url = Some(format!("https://www.douyin.com/user/{username}"));
        feed.feed_url = Some(format!("{}/rss/douyin/user/{username}", self.api_prefix));
        feed.icon = Some("https://www.douyin.com/favicon.ico".to_string());
        feed.favicon = Some("https://www.douyin.com/favicon.ico".to_string());
        feed.items = normalize::normalize(username, list);
        feed
    }
}
