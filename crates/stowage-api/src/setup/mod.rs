//! Application setup and initialization
//!
//! All initialization logic lives here rather than in main.rs so integration
//! tests can assemble the same application with test collaborators.

pub mod database;
pub mod routes;
pub mod server;

use std::sync::Arc;

use anyhow::Result;
use stowage_core::Config;
use stowage_storage::S3Gateway;

use crate::dispatch::{JobDispatcher, NoopJobDispatcher, SqsJobDispatcher};
use crate::state::{AppState, DbState};

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    init_tracing();

    tracing::info!(
        environment = %config.environment,
        bucket = %config.s3_bucket,
        "Configuration loaded"
    );

    // Setup database
    let pool = database::setup_database(&config).await?;
    let db = DbState::new(pool);

    // Setup storage gateway
    let gateway = Arc::new(
        S3Gateway::new(
            config.s3_bucket.clone(),
            config.s3_region.clone(),
            config.s3_endpoint.clone(),
        )
        .await,
    );

    // Setup downstream dispatcher
    let dispatcher: Arc<dyn JobDispatcher> = match config.job_queue_url.clone() {
        Some(queue_url) => Arc::new(SqsJobDispatcher::new(queue_url).await),
        None => {
            tracing::warn!("JOB_QUEUE_URL not set; downstream processing jobs will be dropped");
            Arc::new(NoopJobDispatcher)
        }
    };

    let state = Arc::new(AppState::new(db, gateway, dispatcher, config.clone()));

    // Setup routes
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stowage_api=debug"));

    // try_init so tests that build the app twice do not panic
    let _ = fmt().with_env_filter(filter).try_init();
}
