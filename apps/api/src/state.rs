use std::sync::Arc;

use crate::pipeline::Orchestrator;
use crate::status::StatusStore;
use crate::storage::ArtifactStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub status: Arc<dyn StatusStore>,
    pub artifacts: Arc<dyn ArtifactStore>,
    /// Runs dispatched jobs; shared by every spawned job task.
    pub orchestrator: Arc<Orchestrator>,
}
