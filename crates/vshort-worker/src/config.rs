//! Worker configuration.

use std::path::PathBuf;

use vshort_sieve::{PollerConfig, SieveConfig};

use crate::orchestrator::OrchestratorConfig;
use crate::scorer::OpenRouterConfig;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Sieve API client
    pub sieve: SieveConfig,
    /// Job polling
    pub poller: PollerConfig,
    /// Segment scorer
    pub openrouter: OpenRouterConfig,
    /// Request workflow
    pub orchestrator: OrchestratorConfig,
    /// Directory of published result files
    pub results_dir: PathBuf,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            sieve: SieveConfig::default(),
            poller: PollerConfig::default(),
            openrouter: OpenRouterConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            results_dir: PathBuf::from("./results"),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            sieve: SieveConfig::from_env(),
            poller: PollerConfig::from_env(),
            openrouter: OpenRouterConfig::from_env(),
            orchestrator: OrchestratorConfig::from_env(),
            results_dir: std::env::var("RESULTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./results")),
        }
    }
}
