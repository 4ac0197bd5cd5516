use message_broker::{BrokerClient, InMemoryBroker, NatsBroker};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use orders_rs::{
    config::Config,
    db,
    pipeline::{AuditPipeline, PipelineConfig},
    repos::PgStore,
    routes::{self, AppState},
    services::OrderService,
};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting orders service...");

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration from environment");

    tracing::info!(
        "Configuration loaded: host={}, port={}, bus_type={}",
        config.host,
        config.port,
        config.bus_type
    );

    // Database connection
    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    sqlx::migrate!("./db/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Create broker client
    let broker: Arc<dyn BrokerClient> = match config.bus_type.to_lowercase().as_str() {
        "inmemory" => {
            tracing::info!("Using InMemory broker");
            Arc::new(InMemoryBroker::new())
        }
        "nats" => {
            tracing::info!("Connecting to NATS at {}", config.nats_url);
            let client = async_nats::connect(&config.nats_url)
                .await
                .expect("Failed to connect to NATS");
            Arc::new(NatsBroker::new(client))
        }
        _ => panic!(
            "Invalid BUS_TYPE: {}. Must be 'inmemory' or 'nats'",
            config.bus_type
        ),
    };

    // Start the audit pipeline and the outbox dispatcher
    let store = Arc::new(PgStore::new(pool.clone()));
    let pipeline = AuditPipeline::start(
        PipelineConfig {
            buffer_size: config.audit_buffer_size,
            batch_size: config.audit_batch_size,
            flush_interval: Duration::from_millis(config.audit_flush_interval_ms),
            filter_word: config.audit_filter_word.clone(),
            outbox_topic: config.outbox_topic.clone(),
            poll_interval: Duration::from_secs(config.outbox_poll_interval_secs),
            lease_limit: config.outbox_lease_limit,
            stale_after_secs: config.outbox_stale_after_secs,
        },
        store.clone(),
        store,
        broker,
    );

    let service = Arc::new(OrderService::new(
        pool.clone(),
        pipeline.clone(),
        config.refund_window_days,
    ));

    // Build the application router
    let app = routes::router(AppState {
        service,
        pipeline: pipeline.clone(),
    })
    .layer(
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    );

    // Bind to the configured address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Orders service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    // Start the server; Ctrl-C stops accepting requests and signals the
    // pipeline workers, then the pipeline drains what it already accepted
    axum::serve(listener, app)
        .with_graceful_shutdown({
            let pipeline = pipeline.clone();
            async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "failed to listen for shutdown signal");
                }
                tracing::info!("Shutdown signal received");
                pipeline.trigger_shutdown();
            }
        })
        .await
        .expect("Server failed to start");

    pipeline.shutdown().await;

    tracing::info!("Orders service stopped");
}
