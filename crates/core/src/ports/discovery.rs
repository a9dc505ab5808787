use crate::domain::repo::RepoMeta;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Limits applied while walking a scan root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Directory levels to descend below each root; the root itself is
    /// level zero.
    pub max_depth: usize,
    /// Per-directory cap on entries considered, `None` for no cap.
    pub entry_limit: Option<usize>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_depth: 10,
            entry_limit: None,
        }
    }
}

/// Request for repository discovery.
#[derive(Clone, Debug)]
pub struct ScanRequest {
    pub roots: Vec<PathBuf>,
    pub options: ScanOptions,
}

/// Port for repository discovery.
pub trait DiscoveryPort: Send + Sync {
    /// Scan the given roots for repositories.
    /// This is blocking - caller should run it off the main thread
    fn scan(&self, req: &ScanRequest) -> Result<Vec<RepoMeta>>;
}
