use std::sync::Arc;

use tokio::sync::RwLock;

use newsreel_core::{Category, Config, RunOrchestrator, SanitizedConfig, UsageTracker};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: RunOrchestrator,
    usage: Arc<UsageTracker>,
    /// Category for runs that name neither a topic nor a category.
    default_category: RwLock<Category>,
}

impl AppState {
    pub fn new(config: Config, orchestrator: RunOrchestrator, usage: Arc<UsageTracker>) -> Self {
        let default_category = RwLock::new(config.pipeline.category);
        Self {
            config,
            orchestrator,
            usage,
            default_category,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &RunOrchestrator {
        &self.orchestrator
    }

    pub fn usage(&self) -> &UsageTracker {
        self.usage.as_ref()
    }

    pub async fn default_category(&self) -> Category {
        *self.default_category.read().await
    }

    pub async fn set_default_category(&self, category: Category) {
        *self.default_category.write().await = category;
    }
}
