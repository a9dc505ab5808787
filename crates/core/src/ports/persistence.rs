use crate::ports::discovery::ScanOptions;
use anyhow::Result;
use std::path::PathBuf;

/// Configuration store interface
pub trait ConfigStore: Send + Sync {
    /// Load configuration from storage
    fn load(&self) -> Result<EngineConfig>;

    /// Save configuration to storage
    fn save(&self, config: &EngineConfig) -> Result<()>;
}

/// Persisted engine configuration
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EngineConfig {
    pub version: u32,
    /// Roots offered to the scanner. Empty by default; scanning never picks
    /// system directories on its own.
    #[serde(default)]
    pub scan_roots: Vec<PathBuf>,
    #[serde(default)]
    pub scan: ScanOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: 1,
            scan_roots: Vec::new(),
            scan: ScanOptions::default(),
        }
    }
}
