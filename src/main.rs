use axum::extract::DefaultBodyLimit;
use easypost_webhooks::{
    config::{get_config, init_config, StoreModel},
    database::pool::{create_pool, run_migrations},
    error::Error,
    routes,
    services::{
        events::BroadcastEventSink,
        job_queue::{job_queue, run_job_worker},
        job_resolver::{JobResolver, DEFAULT_STRUCTURAL_SEPARATOR},
        jobs::JobRegistry,
        webhook_call_store::{InMemoryWebhookCallStore, PgWebhookCallStore, WebhookCallStore},
        webhook_processor::WebhookProcessor,
    },
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    init_config()?;
    let config = get_config()?;

    let store: Arc<dyn WebhookCallStore> = match config.model {
        StoreModel::Postgres => {
            let database_url = config.database_url.as_deref().ok_or_else(|| {
                Error::Config("Missing environment variable: DATABASE_URL".to_string())
            })?;
            let pool = create_pool(database_url).await?;
            run_migrations(&pool).await?;
            Arc::new(PgWebhookCallStore::new(pool))
        }
        StoreModel::Memory => {
            tracing::warn!("Webhook calls are kept in memory and lost on restart");
            Arc::new(InMemoryWebhookCallStore::new())
        }
    };

    let resolver = JobResolver::new(config.jobs.clone())
        .with_separators(DEFAULT_STRUCTURAL_SEPARATOR, &config.job_key_separator);
    let registry = JobRegistry::with_defaults();
    for (key, handler) in &config.jobs {
        if !handler.is_empty() && !registry.contains(handler) {
            tracing::warn!(key = %key, handler = %handler, "Configured webhook job is not registered");
        }
    }

    let events = BroadcastEventSink::new(EVENT_CHANNEL_CAPACITY);
    let (submitter, jobs_rx) = job_queue(config.queue_capacity);
    tokio::spawn(run_job_worker(jobs_rx, config.job_concurrency));

    let processor = WebhookProcessor::new(
        store,
        resolver,
        registry,
        Arc::new(events),
        Arc::new(submitter),
    );
    let app = routes::router(AppState::new(processor), &config.webhook_path)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!(path = %config.webhook_path, "Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
