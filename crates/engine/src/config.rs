use std::path::Path;

use serde::Deserialize;

use crate::error::EngineError;

/// Overrides `database_path` when set.
pub const DB_PATH_ENV: &str = "WELLOPS_DB";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub database_path: String,
    pub busy_timeout_ms: u64,
    /// Cap on `list_pending` results. `None` lists every pending proposal.
    pub pending_limit: Option<u32>,
    pub log_json: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: "wellops.db".into(),
            busy_timeout_ms: wellops_storage::schema::DEFAULT_BUSY_TIMEOUT_MS,
            pending_limit: None,
            log_json: false,
        }
    }
}

impl EngineConfig {
    /// Load from a TOML file. A missing file yields the defaults; the
    /// `WELLOPS_DB` environment variable is applied either way.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
            Self::from_toml_str(&text)?
        } else {
            Self::default()
        };
        if let Ok(db) = std::env::var(DB_PATH_ENV) {
            if !db.is_empty() {
                config.database_path = db;
            }
        }
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))?;
        if config.pending_limit == Some(0) {
            return Err(EngineError::Config("pending_limit must be positive".into()));
        }
        Ok(config)
    }
}
