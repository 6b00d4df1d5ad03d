use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ativeplay_data::config::Config;
use ativeplay_data::db::{create_pool, run_migrations, SqliteSessionRepository};
use ativeplay_data::models::ContentKind;
use ativeplay_data::services::cleanup::start_cleanup_task;
use ativeplay_data::services::xtream::XtreamClient;
use ativeplay_data::{CatalogSession, SessionRepository, SessionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ativeplay_data=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Load configuration
    let config = Config::from_env();

    tracing::info!("Starting AtivePlay data layer v{}", env!("CARGO_PKG_VERSION"));

    // Session state database
    let pool = create_pool(&config).await?;
    run_migrations(&pool).await?;

    let repo = Arc::new(SqliteSessionRepository::new(pool));
    let store = SessionStore::open(repo.clone(), config.history_limit).await?;
    tracing::info!(
        "Session state: {} favorites, {} history entries",
        store.favorites().len(),
        store.history().len()
    );

    // Background history cleanup
    let shutdown = CancellationToken::new();
    let cleanup_repo: Arc<dyn SessionRepository> = repo;
    let cleanup = tokio::spawn(start_cleanup_task(
        cleanup_repo,
        config.cleanup_config(),
        shutdown.clone(),
    ));

    // Provider session
    let credentials = config
        .credentials()
        .context("Set XTREAM_SERVER/XTREAM_USERNAME/XTREAM_PASSWORD or XTREAM_M3U_URL")?;
    let client =
        XtreamClient::from_credentials(&credentials, config.fetch_timeout_ms, &config.user_agent)?;
    let session = CatalogSession::from_client(client, config.epg_config());

    let account = session.authenticate().await?;
    tracing::info!(
        "Authenticated as {} (status: {}, max connections: {:?})",
        account.username,
        account.status,
        account.max_connections
    );

    let categories = session.categories(ContentKind::Live).await?;
    tracing::info!("Live categories: {}", categories.len());

    if let Some(first) = categories.first() {
        let guide = session.epg_guide(&first.category_id, Utc::now()).await?;
        let programs: usize = guide.programs().values().map(Vec::len).sum();
        tracing::info!(
            "Category '{}': {} channels, {} guide entries",
            first.category_name,
            guide.channels().len(),
            programs
        );
    }

    shutdown.cancel();
    cleanup.await?;

    Ok(())
}
