use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Repository metadata (from discovery or an open session)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoMeta {
    pub name: String,
    pub path: PathBuf,
    pub current_branch: Option<String>,
}

impl RepoMeta {
    /// Derives the display name from the final path segment.
    pub fn new(path: &Path, current_branch: Option<String>) -> Self {
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        Self {
            name,
            path: path.to_path_buf(),
            current_branch,
        }
    }
}

impl std::fmt::Display for RepoMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.path.display())
    }
}

/// Working tree status split into the three buckets callers render.
///
/// The default value is the all-empty status, which is also what a service
/// without an open session reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoStatus {
    pub staged: Vec<String>,
    pub unstaged: Vec<String>,
    pub untracked: Vec<String>,
}

impl RepoStatus {
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.unstaged.is_empty() && self.untracked.is_empty()
    }

    /// A path staged and also modified again counts as staged only.
    pub fn normalize(&mut self) {
        self.unstaged.retain(|path| !self.staged.contains(path));
    }
}

/// Point-in-time view of the open repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoSnapshot {
    pub meta: RepoMeta,
    pub status: RepoStatus,
}
