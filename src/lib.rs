pub mod browser;
pub mod cache;
pub mod douyin;
pub mod error;
pub mod feed;
pub mod filters;
pub mod history;
pub mod limiter;
pub mod nga;
pub mod scheduler;
pub mod server;
pub mod settings;
pub mod watchdog;

pub use cache::RandomTtlCache;
pub use cache::coordinator::SingleFlightCache;
pub use douyin::DouyinService;
pub use error::{Error, Result};
pub use feed::{Feed, FeedAuthor, FeedItem, JSON_FEED_VERSION};
pub use filters::{BlockRule, EnrichRule, FeedFilter};
pub use history::{AccessHistory, HistoryEntry};
pub use limiter::SessionLimiter;
pub use nga::MarkupRewriter;
pub use nga::emoji::EmojiTable;
pub use scheduler::RefreshScheduler;
pub use settings::Settings;
pub use watchdog::MemoryWatchdog;
