//! Application state and sub-state extractors.
//!
//! AppState aggregates the injected collaborators (store repositories, storage
//! gateway, job dispatcher, progress broadcaster) so handlers receive
//! everything through Axum state instead of ambient globals.

use std::sync::Arc;

use sqlx::PgPool;
use stowage_core::{Config, UploadPolicy};
use stowage_db::{GroupRepository, PartRepository, SessionRepository};
use stowage_storage::ObjectGateway;
use tokio::sync::OnceCell;

use crate::broadcast::ProgressBroadcaster;
use crate::dispatch::JobDispatcher;

/// Database pool and the lifecycle-store repositories.
#[derive(Clone)]
pub struct DbState {
    pub pool: PgPool,
    pub group_repository: GroupRepository,
    pub session_repository: SessionRepository,
    pub part_repository: PartRepository,
}

impl DbState {
    pub fn new(pool: PgPool) -> Self {
        Self {
            group_repository: GroupRepository::new(pool.clone()),
            session_repository: SessionRepository::new(pool.clone()),
            part_repository: PartRepository::new(pool.clone()),
            pool,
        }
    }
}

/// Main application state: aggregates injected collaborators.
pub struct AppState {
    pub db: DbState,
    pub gateway: Arc<dyn ObjectGateway>,
    pub dispatcher: Arc<dyn JobDispatcher>,
    pub broadcaster: ProgressBroadcaster,
    /// One-time bucket + notification provisioning, shared across requests.
    pub provisioned: OnceCell<()>,
    pub policy: UploadPolicy,
    pub config: Config,
    pub is_production: bool,
}

impl AppState {
    pub fn new(
        db: DbState,
        gateway: Arc<dyn ObjectGateway>,
        dispatcher: Arc<dyn JobDispatcher>,
        config: Config,
    ) -> Self {
        Self {
            db,
            gateway,
            dispatcher,
            broadcaster: ProgressBroadcaster::new(),
            provisioned: OnceCell::new(),
            policy: config.upload_policy(),
            is_production: config.is_production(),
            config,
        }
    }
}

impl axum::extract::FromRef<Arc<AppState>> for DbState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.db.clone()
    }
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
