use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsstand::aggregator::{run_scheduler, Aggregator};
use newsstand::config::Config;
use newsstand::db::Database;
use newsstand::fetcher::Fetcher;
use newsstand::routes::{self, AppState};
use newsstand::throttle::FixedDelay;
use newsstand::transport::HttpFeedTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "newsstand=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path =
        std::env::var("NEWSSTAND_CONFIG").unwrap_or_else(|_| "feeds.toml".to_string());
    let config = Config::load_or_default(&config_path)?;
    let registry = config.registry()?;
    info!(
        "Loaded {} feeds across {} categories",
        registry.feed_count(),
        registry.categories().len()
    );

    // Initialize database
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:newsstand.db?mode=rwc".to_string());
    let db = Database::new(&database_url).await?;
    db.initialize().await?;
    db.sync_categories(registry.categories()).await?;
    info!(
        "Database initialized with {} stored articles",
        db.get_article_count().await?
    );

    let transport = HttpFeedTransport::new(config.fetch_timeout())?;
    let fetcher = Fetcher::new(Arc::new(transport), Arc::new(db));
    let aggregator = Arc::new(Aggregator::new(
        registry,
        fetcher,
        Arc::new(FixedDelay::new(config.feed_delay())),
    ));

    // Initial run, then every refresh interval
    let scheduled = aggregator.clone();
    let refresh_interval = config.refresh_interval();
    tokio::spawn(async move {
        run_scheduler(scheduled, refresh_interval).await;
    });
    info!(
        "Content aggregation scheduled every {} hours",
        config.refresh_interval_hours
    );

    let app = routes::router(Arc::new(AppState { aggregator })).layer(TraceLayer::new_for_http());

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Server starting on http://{}", config.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
