use std::sync::Arc;

use tokio::sync::RwLock;

use crate::batch::BatchOrchestrator;
use crate::config::Config;
use crate::models::batch::BatchResult;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<BatchOrchestrator>,
    /// Most recent completed batch, served by the `latest` routes.
    pub latest: Arc<RwLock<Option<BatchResult>>>,
    pub config: Config,
}

impl AppState {
    pub fn new(orchestrator: BatchOrchestrator, config: Config) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            latest: Arc::new(RwLock::new(None)),
            config,
        }
    }
}
