//! Application state.

use carto_ci_scheduler::Orchestrator;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Secret for `X-Hub-Signature-256`; deliveries are unchecked without one.
    pub webhook_secret: Option<Arc<str>>,
    /// Whether GitHub credentials were supplied.
    pub github_configured: bool,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            webhook_secret: None,
            github_configured: false,
        }
    }

    pub fn with_webhook_secret(mut self, secret: Option<String>) -> Self {
        self.webhook_secret = secret.filter(|s| !s.is_empty()).map(Arc::from);
        self
    }

    pub fn with_github(mut self, configured: bool) -> Self {
        self.github_configured = configured;
        self
    }
}
