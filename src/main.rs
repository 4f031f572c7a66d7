use anyhow::{Context, Result};
use feedgate::douyin::DouyinService;
use feedgate::filters::enrich::FilterContext;
use feedgate::history::AccessHistory;
use feedgate::scheduler::RefreshScheduler;
use feedgate::server::{self, AppState};
use feedgate::settings::Settings;
use feedgate::watchdog::MemoryWatchdog;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feedgate=info,tower_http=info".into()),
        )
        .init();

    let settings = Arc::new(Settings::from_env().context("invalid configuration")?);
    info!(listen = %settings.listen, prefix = %settings.api_prefix, "starting feedgate");

    let history = Arc::new(
        AccessHistory::open(&settings.douyin_history_storage)
            .await
            .context("opening access history store")?,
    );
    let douyin = Arc::new(DouyinService::new(&settings, Arc::clone(&history)));

    let scheduler = RefreshScheduler::new(
        Arc::clone(&settings),
        Arc::clone(&douyin),
        Arc::clone(&history),
    );
    let scheduler_handle = tokio::spawn(scheduler.run());

    let watchdog = MemoryWatchdog::new(
        settings.gc_memory_percent_interval,
        settings.gc_memory_percent_limit,
    );
    let watchdog_douyin = Arc::clone(&douyin);
    let watchdog_handle = tokio::spawn(async move {
        watchdog
            .run(move || {
                let douyin = Arc::clone(&watchdog_douyin);
                async move { douyin.prune_cache().await }
            })
            .await;
    });

    let state = AppState {
        settings: Arc::clone(&settings),
        douyin,
    };
    let app = server::router(state, Arc::new(FilterContext::with_default_client()));

    let listener = tokio::net::TcpListener::bind(settings.listen)
        .await
        .with_context(|| format!("binding {}", settings.listen))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await
        .context("server error")?;

    scheduler_handle.abort();
    watchdog_handle.abort();
    info!("shutdown complete");
    Ok(())
}
