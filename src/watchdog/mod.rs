//! Periodic memory-pressure watchdog.
//!
//! Samples the process RSS against the container memory limit (cgroup v2,
//! then v1) or total system memory, and fires a pressure hook when the
//! configured percentage is reached. The hook is injected by the caller;
//! in this service it prunes expired feed-cache entries. Non-fatal: the
//! task runs until shutdown aborts it.

use std::future::Future;
use std::time::Duration;
use sysinfo::{ProcessesToUpdate, System, get_current_pid};
use tracing::{debug, warn};

/// A limit above this is treated as "unlimited" (cgroup v1 reports a
/// huge sentinel when unconfined).
const LIMIT_SENTINEL: u64 = 1 << 60;

pub struct MemoryWatchdog {
    interval: Duration,
    limit_percent: f64,
}

impl MemoryWatchdog {
    pub fn new(interval: Duration, limit_percent: f64) -> Self {
        Self {
            interval,
            limit_percent,
        }
    }

    /// Sample forever, invoking `on_pressure` whenever usage meets the
    /// threshold. The hook reports how many entries it released.
    pub async fn run<F, Fut>(self, on_pressure: F)
    where
        F: Fn() -> Fut,
        Fut: Future<Output = usize>,
    {
        let pid = match get_current_pid() {
            Ok(pid) => pid,
            Err(e) => {
                warn!("cannot resolve own pid ({e}), watchdog exiting");
                return;
            }
        };

        let mut sys = System::new();
        sys.refresh_memory();
        let limit = memory_limit_bytes(sys.total_memory()).await.max(1);
        debug!(limit_bytes = limit, "memory watchdog started");

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;

            sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
            let rss = sys.process(pid).map(|p| p.memory()).unwrap_or(0);
            let percent = rss as f64 / limit as f64 * 100.0;

            if percent >= self.limit_percent {
                let released = on_pressure().await;
                debug!(
                    percent = format!("{percent:.1}"),
                    released, "memory threshold reached, pressure hook ran"
                );
            }
        }
    }
}

/// Container memory limit when configured, else total system memory.
async fn memory_limit_bytes(system_total: u64) -> u64 {
    if let Ok(raw) = tokio::fs::read_to_string("/sys/fs/cgroup/memory.max").await {
        let raw = raw.trim();
        if raw != "max"
            && let Ok(limit) = raw.parse::<u64>()
        {
            return limit;
        }
    }
    if let Ok(raw) = tokio::fs::read_to_string("/sys/fs/cgroup/memory/memory.limit_in_bytes").await
        && let Ok(limit) = raw.trim().parse::<u64>()
        && limit < LIMIT_SENTINEL
    {
        return limit;
    }
    system_total
}
