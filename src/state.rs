//! Application state: the agent manager and the material catalog.
//!
//! Built once in `main` from `AppConfig` and shared behind an `Arc` by both
//! HTTP and WebSocket handlers. Provider selection is fixed here.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::{AppConfig, Limits};
use crate::error::ProviderError;
use crate::materials::MaterialStore;
use crate::orchestrator::AgentManager;
use crate::provider::ProviderClient;

#[derive(Clone)]
pub struct AppState {
    pub agents: Arc<AgentManager>,
    pub materials: MaterialStore,
    pub limits: Limits,
}

impl AppState {
    #[instrument(level = "info", skip_all)]
    pub fn new(cfg: AppConfig) -> Result<Self, ProviderError> {
        let provider = ProviderClient::new(&cfg.provider)?;
        if cfg.provider.has_credentials() {
            info!(target: "studykit_backend", provider = ?provider.kind(), base_url = %provider.base_url(), model = %provider.model(), "Live provider enabled");
        } else {
            warn!(target: "studykit_backend", "No ANTHROPIC_API_KEY or OPENAI_API_KEY; serving mock content");
        }

        let agents = AgentManager::new(provider, &cfg.prompts, cfg.exam_policy);
        let materials = MaterialStore::from_config(&cfg.materials).with_upload_limit(cfg.limits.max_uploads);
        Ok(Self { agents: Arc::new(agents), materials, limits: cfg.limits })
    }
}
