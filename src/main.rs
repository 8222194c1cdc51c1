use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use claim_verify::app_state::AppState;
use claim_verify::config::AppConfig;
use claim_verify::routes;
use claim_verify::services::runner::JobRunner;
use claim_verify::store::JobStore;

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

    tracing::info!("Initializing claim-verify server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!(
        "claim_jobs_submitted",
        "Total claim verification jobs submitted"
    );
    metrics::describe_counter!(
        "claim_jobs_rejected",
        "Submissions rejected before a job record was created"
    );
    metrics::describe_counter!(
        "claim_worker_spawn_failures",
        "Worker processes that failed to launch"
    );

    // Initialize Redis job store
    tracing::info!("Connecting to Redis job store");
    let store = Arc::new(
        JobStore::new(&config.redis_url, config.job_ttl_secs)
            .expect("Failed to initialize job store"),
    );

    // Initialize the job runner (spawns one worker process per job)
    let runner = JobRunner::new(store.clone(), config.worker_bin.as_deref())
        .expect("Failed to initialize job runner");

    // Create shared application state
    let state = AppState::new(store, runner);

    // Build API routes
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/v1/jobs", post(routes::jobs::submit_job))
        .route("/api/v1/jobs/{job_id}", get(routes::jobs::get_job_status))
        .route(
            "/api/v1/jobs/{job_id}/result",
            get(routes::jobs::get_job_result),
        )
        .route("/api/v1/stats", get(routes::stats::get_stats))
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(64 * 1024)); // claims are small

    tracing::info!("Starting claim-verify on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
