//! Background subscription refresher.
//!
//! A single long-lived task walks the access history and warms the feed
//! cache through the same single-flight coordinator the HTTP surface
//! uses. Pacing adapts to the cache: a sub-second call means the
//! coordinator answered from cache, so the loop may burst; a slow call
//! means a browser actually launched, so the loop backs off. The task is
//! cancelled by abort; browser sessions release via RAII.

use crate::douyin::DouyinService;
use crate::history::AccessHistory;
use crate::settings::Settings;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Wall time at or under which a call is counted as a cache hit.
const HIT_BUDGET: Duration = Duration::from_secs(1);

/// Hits in a row before the loop yields even without a miss.
const HIT_STREAK_LIMIT: u32 = 30;

/// Pacing decision state, separated from the loop for testability.
#[derive(Debug, Default)]
pub struct Pacing {
    consecutive_hits: u32,
}

impl Pacing {
    /// Record one call's wall time; returns whether the loop should
    /// pause before the next entry.
    pub fn should_pause(&mut self, elapsed: Duration) -> bool {
        if elapsed <= HIT_BUDGET {
            self.consecutive_hits += 1;
            if self.consecutive_hits >= HIT_STREAK_LIMIT {
                self.consecutive_hits = 0;
                true
            } else {
                false
            }
        } else {
            self.consecutive_hits = 0;
            true
        }
    }
}

pub struct RefreshScheduler {
    settings: Arc<Settings>,
    douyin: Arc<DouyinService>,
    history: Arc<AccessHistory>,
}

impl RefreshScheduler {
    pub fn new(
        settings: Arc<Settings>,
        douyin: Arc<DouyinService>,
        history: Arc<AccessHistory>,
    ) -> Self {
        Self {
            settings,
            douyin,
            history,
        }
    }

    pub async fn run(self) {
        if !self.settings.douyin_auto_fetch_enable {
            info!("auto fetch disabled, refresher exiting");
            return;
        }

        // Warm-up delay so a crash loop does not hammer the source.
        info!(
            start_wait = ?self.settings.douyin_auto_fetch_start_wait,
            "refresher starting after warm-up delay"
        );
        sleep(self.settings.douyin_auto_fetch_start_wait).await;

        let mut pacing = Pacing::default();
        loop {
            let entries = self.history.list().await;
            debug!(entries = entries.len(), "refreshing history snapshot");

            for entry in &entries {
                let started = Instant::now();
                match self
                    .douyin
                    .warm(
                        &entry.username,
                        &entry.cookie,
                        self.settings.douyin_auto_fetch_timeout,
                    )
                    .await
                {
                    Ok(feed) => debug!(
                        username = %entry.username,
                        items = feed.items.len(),
                        "feed refreshed"
                    ),
                    Err(e) => warn!(
                        username = %entry.username,
                        error = ?e,
                        "feed refresh failed, continuing with next entry"
                    ),
                }

                if pacing.should_pause(started.elapsed()) {
                    sleep(self.settings.douyin_auto_fetch_once_wait).await;
                }
            }

            sleep(self.settings.douyin_auto_fetch_wait).await;
        }
    }
}
