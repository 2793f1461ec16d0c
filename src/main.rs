use analysis_service::{AnalysisService, BatchClassifier, PollingService, SubredditDirectory};
use analytics_core::AppConfig;
use anyhow::Context;
use database::Database;
use llm_interface::OpenAiProvider;
use reddit_client::{RedditClient, RedditClientConfig};
use std::sync::Arc;
use tokio::sync::watch;
use web::{create_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("failed to read .env");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "reddit_analytics=info,analysis_service=info,reddit_client=info,llm_interface=info,database=info,web=info,tower_http=info"
                    .into()
            }),
        )
        .init();

    tracing::info!("Starting Reddit analytics");

    let config = AppConfig::load().context("failed to load configuration")?;

    let mut database = Database::new(config.database_url.clone());
    database.connect().await.context("failed to open database")?;
    database
        .run_migrations()
        .await
        .context("failed to run database migrations")?;
    let database = Arc::new(database);

    let reddit = Arc::new(
        RedditClient::new(RedditClientConfig::from_app_config(&config)?)
            .context("failed to create Reddit client")?,
    );
    let categorizer = Arc::new(OpenAiProvider::from_config(&config.llm)?);

    let classifier = BatchClassifier::new(categorizer, database.clone())
        .with_batch_size(config.pipeline.batch_size)?;
    let service = Arc::new(AnalysisService::new(reddit.clone(), Arc::new(classifier)));
    let directory = Arc::new(SubredditDirectory::new(
        database.clone(),
        reddit,
        chrono::Duration::hours(config.pipeline.subreddit_cache_hours),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller = PollingService::new(
        service.clone(),
        database.clone(),
        config.polling_interval_minutes,
    );
    let polling = tokio::spawn(async move { poller.run(shutdown_rx).await });

    let app = create_app(AppState {
        service,
        directory,
        database: database.clone(),
    });
    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address))?;
    tracing::info!("Listening on http://{}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = polling.await {
        tracing::error!("Polling task failed: {}", e);
    }
    database.close().await;
    tracing::info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
