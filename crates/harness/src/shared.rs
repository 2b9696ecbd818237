use tempfile::TempDir;

use wellops_engine::{EngineConfig, EngineError, ReviewEngine};

use crate::TestPortal;

/// A file-backed database several engines can open at once, for tests that
/// need more than one connection.
pub struct SharedStore {
    _dir: TempDir,
    config: EngineConfig,
}

impl SharedStore {
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let config = EngineConfig {
            database_path: dir.path().join("wellops.db").to_string_lossy().into_owned(),
            ..EngineConfig::default()
        };
        Ok(Self { _dir: dir, config })
    }

    pub fn open_engine(&self) -> Result<ReviewEngine, EngineError> {
        ReviewEngine::open(self.config.clone())
    }

    pub fn open_portal(&self) -> Result<TestPortal, EngineError> {
        Ok(TestPortal::with_engine(self.open_engine()?))
    }
}
