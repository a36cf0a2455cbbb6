#![allow(clippy::result_large_err)]

use crate::core::error::EngineError;
use crate::core::types::ErrorCategory;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Main Weft configuration loaded from weft.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeftConfig {
    /// Directory where persisted executions are stored
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Default log level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for WeftConfig {
    fn default() -> Self {
        WeftConfig {
            state_dir: default_state_dir(),
            log_level: default_log_level(),
        }
    }
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".weft/state")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl WeftConfig {
    /// Load config with deterministic precedence: built-in defaults,
    /// then `<workspace>/weft.toml`, then `WEFT_*` environment variables.
    pub fn load(workspace_path: &Path) -> Result<WeftConfig, EngineError> {
        let config_path = workspace_path.join("weft.toml");
        let mut config = Self::load_from_file(&config_path)?.unwrap_or_default();
        Self::apply_env_overrides(&mut config);
        Ok(config)
    }

    /// Load config from a specific file path. Returns Ok(None) if the
    /// file does not exist.
    pub fn load_from_file(path: &Path) -> Result<Option<WeftConfig>, EngineError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::new(
                ErrorCategory::IoError,
                format!("failed to read config file {}: {}", path.display(), e),
            )
        })?;

        let config: WeftConfig = toml::from_str(&content).map_err(|e| {
            EngineError::new(
                ErrorCategory::ValidationError,
                format!("failed to parse config file {}: {}", path.display(), e),
            )
        })?;

        Ok(Some(config))
    }

    fn apply_env_overrides(config: &mut WeftConfig) {
        if let Ok(state_dir) = env::var("WEFT_STATE_DIR") {
            config.state_dir = PathBuf::from(state_dir);
        }

        if let Ok(log_level) = env::var("WEFT_LOG_LEVEL") {
            config.log_level = log_level;
        }
    }
}
