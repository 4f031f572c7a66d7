//! Environment-driven service configuration.
//!
//! All knobs are optional with documented defaults; anything present but
//! unparseable is a fatal startup error. Names are read in their
//! conventional upper-cased form first, then in the lowercase spelling,
//! so `RSS_DOUYIN_USER_CONCURRENCY=4` and `rss_douyin_user_concurrency=4`
//! behave the same.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default per-request fetch timeout for the Douyin user endpoint.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Nominal TTL base of the feed cache; per-entry expiry is jittered.
pub const DEFAULT_FEEDS_CACHE_TIME: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("cannot determine a home directory for {name}; set it explicitly")]
    NoHomeDir { name: &'static str },
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Bind address of the HTTP server.
    pub listen: SocketAddr,
    /// Mount prefix for the API surface.
    pub api_prefix: String,

    /// Maximum concurrent browser sessions for Douyin user fetches.
    pub douyin_concurrency: usize,
    /// Gate for the background subscription refresher.
    pub douyin_auto_fetch_enable: bool,
    /// Per-fetch timeout used by the refresher.
    pub douyin_auto_fetch_timeout: Duration,
    /// Warm-up delay before the refresher's first pass.
    pub douyin_auto_fetch_start_wait: Duration,
    /// Pause between entries after a miss or a long hit streak.
    pub douyin_auto_fetch_once_wait: Duration,
    /// Pause after each full pass over the history snapshot.
    pub douyin_auto_fetch_wait: Duration,
    /// TTL base of the user-feed cache.
    pub douyin_feeds_cache_time: Duration,
    /// Run the extraction browser headless.
    pub douyin_headless: bool,
    /// Path of the username→cookie history store.
    pub douyin_history_storage: PathBuf,

    /// Memory-usage percent at which the watchdog fires.
    pub gc_memory_percent_limit: f64,
    /// Sampling interval of the watchdog.
    pub gc_memory_percent_interval: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let history_default = || -> Result<PathBuf, SettingsError> {
            dirs::home_dir()
                .map(|home| home.join(".feedgate").join("douyin_history.db"))
                .ok_or(SettingsError::NoHomeDir {
                    name: "rss_douyin_user_history_storage",
                })
        };

        Ok(Self {
            listen: parsed("feedgate_listen")?.unwrap_or_else(|| {
                "0.0.0.0:8080".parse().expect("static default address")
            }),
            api_prefix: lookup("feedgate_api_prefix").unwrap_or_else(|| "/api".to_string()),
            douyin_concurrency: parsed("rss_douyin_user_concurrency")?.unwrap_or(1),
            douyin_auto_fetch_enable: parsed_bool("rss_douyin_user_auto_fetch_enable")?
                .unwrap_or(false),
            douyin_auto_fetch_timeout: parsed_secs("rss_douyin_user_auto_fetch_timeout")?
                .unwrap_or(Duration::from_secs(30)),
            douyin_auto_fetch_start_wait: parsed_secs("rss_douyin_user_auto_fetch_start_wait")?
                .unwrap_or(Duration::from_secs(30)),
            douyin_auto_fetch_once_wait: parsed_secs("rss_douyin_user_auto_fetch_once_wait")?
                .unwrap_or(Duration::from_secs(3)),
            douyin_auto_fetch_wait: parsed_secs("rss_douyin_user_auto_fetch_wait")?
                .unwrap_or(Duration::from_secs(60)),
            douyin_feeds_cache_time: parsed_secs("rss_douyin_user_feeds_cache_time")?
                .unwrap_or(DEFAULT_FEEDS_CACHE_TIME),
            douyin_headless: parsed_bool("rss_douyin_user_headless")?.unwrap_or(true),
            douyin_history_storage: match lookup("rss_douyin_user_history_storage") {
                Some(path) => PathBuf::from(path),
                None => history_default()?,
            },
            gc_memory_percent_limit: parsed("gc_trigger_memory_percent_limit")?.unwrap_or(80.0),
            gc_memory_percent_interval: parsed_secs("gc_trigger_memory_percent_interval")?
                .unwrap_or(Duration::from_secs(30)),
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".parse().expect("static default address"),
            api_prefix: "/api".to_string(),
            douyin_concurrency: 1,
            douyin_auto_fetch_enable: false,
            douyin_auto_fetch_timeout: Duration::from_secs(30),
            douyin_auto_fetch_start_wait: Duration::from_secs(30),
            douyin_auto_fetch_once_wait: Duration::from_secs(3),
            douyin_auto_fetch_wait: Duration::from_secs(60),
            douyin_feeds_cache_time: DEFAULT_FEEDS_CACHE_TIME,
            douyin_headless: true,
            douyin_history_storage: std::env::temp_dir().join("feedgate_douyin_history.db"),
            gc_memory_percent_limit: 80.0,
            gc_memory_percent_interval: Duration::from_secs(30),
        }
    }
}

/// Read an env var by its lowercase name, preferring the uppercase form.
fn lookup(name: &str) -> Option<String> {
    std::env::var(name.to_uppercase())
        .or_else(|_| std::env::var(name))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(name: &'static str) -> Result<Option<T>, SettingsError>
where
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            SettingsError::Invalid {
                name,
                value: raw,
                reason: e.to_string(),
            }
        }),
    }
}

fn parsed_secs(name: &'static str) -> Result<Option<Duration>, SettingsError> {
    match parsed::<f64>(name)? {
        None => Ok(None),
        Some(secs) if secs.is_finite() && secs >= 0.0 => Ok(Some(Duration::from_secs_f64(secs))),
        Some(secs) => Err(SettingsError::Invalid {
            name,
            value: secs.to_string(),
            reason: "expected a non-negative number of seconds".to_string(),
        }),
    }
}

/// Booleans accept 1/0, true/false, yes/no, on/off (case-insensitive).
fn parsed_bool(name: &'static str) -> Result<Option<bool>, SettingsError> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(SettingsError::Invalid {
                name,
                value: raw,
                reason: "expected a boolean".to_string(),
            }),
        },
    }
}
