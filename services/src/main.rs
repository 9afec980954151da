use linkgarden_services::{
    config::Config,
    database,
    postgres::PgStorage,
    preview::{FallbackPreview, HttpMetadataClient, spawn_worker},
    routes,
    storage::{MockFileStorage, R2Config, R2FileStorage},
};
use std::net::{IpAddr, SocketAddr};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const BUILD_DATE: &str = env!("BUILD_DATE");
const BUILD_COMMIT: &str = env!("BUILD_COMMIT");
const BUILD_BRANCH: &str = env!("BUILD_BRANCH");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development before anything reads the env
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing();

    // Print build information
    print_build_info();

    // Load configuration
    let config: Config = Config::init()?;
    info!(
        environment = %config.environment(),
        server_addr = %config.server_addr(),
        port = %config.port(),
        "Configuration loaded"
    );

    // Initialize database connection pool and run migrations
    let pool = database::create_pool(&config).await?;
    let sql_storage = PgStorage::new(pool);

    let metadata = HttpMetadataClient::new(config.metadata_service_url().map(str::to_owned));
    let fallback = FallbackPreview::new();

    // R2 backs preview-image hosting; local/test runs fall back to the
    // in-memory store so enrichment still exercises end to end.
    let (enrichment, worker) = match R2Config::from_config(&config) {
        Some(r2) => spawn_worker(
            sql_storage.clone(),
            metadata,
            R2FileStorage::new(r2),
            fallback,
        ),
        None => {
            info!("R2 credentials not configured, using in-memory file storage");
            spawn_worker(
                sql_storage.clone(),
                metadata,
                MockFileStorage::new(),
                fallback,
            )
        }
    };

    // Build the application router
    let route = routes(sql_storage, enrichment, config.clone()).await;

    // Create socket address
    let addr = SocketAddr::from((config.server_addr().parse::<IpAddr>()?, config.port()));

    info!("Starting server on {}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, route).await?;

    worker.abort();

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,linkgarden_services=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Print build information
fn print_build_info() {
    info!("===========================================");
    info!("  Linkgarden Services");
    info!("===========================================");
    info!("Build Date:   {}", BUILD_DATE);
    info!("Build Commit: {}", BUILD_COMMIT);
    info!("Build Branch: {}", BUILD_BRANCH);
    info!("===========================================");
}
