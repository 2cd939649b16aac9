use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

use catalog_api::app_state::AppState;
use catalog_api::config::AppConfig;
use catalog_api::services::analyzer::ProductAnalyzer;
use catalog_api::{db, routes};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing catalog-api server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    routes::metrics::describe_metrics();

    // Initialize database connection pool
    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run database migrations
    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Analysis stays off without a Gemini key; the rest of the API still serves.
    let analyzer = match ProductAnalyzer::from_config(&config.analysis()) {
        Ok(analyzer) => {
            tracing::info!(model = analyzer.model_id(), "Gemini image analysis enabled");
            Some(analyzer)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Image analysis disabled");
            None
        }
    };

    let state = AppState::new(db_pool, analyzer);
    let app = routes::router(state, Some(prometheus_handle), config.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
