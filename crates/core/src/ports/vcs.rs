use crate::domain::{Commit, RepoStatus};
use crate::error::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Options for applying a single commit onto the current head.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    /// Stage the changes without creating a commit. Consecutive staged
    /// applies accumulate; the sequence must start from a clean tree.
    pub no_commit: bool,
}

/// Pagination and filtering pushed down to the backend log.
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    pub limit: Option<usize>,
    pub skip: usize,
    /// Case-insensitive substring match on the full message. Skip and limit
    /// apply to the filtered sequence.
    pub message_filter: Option<String>,
}

/// Port for obtaining repository handles.
pub trait VcsBackend: Send + Sync {
    /// Open an existing repository rooted at `path`.
    fn open(&self, path: &Path) -> Result<Arc<dyn VcsRepository>>;
    /// Create a repository at `path` and open it.
    fn init(&self, path: &Path) -> Result<Arc<dyn VcsRepository>>;
    /// Cheap marker check, usable during filesystem scans.
    fn is_repository(&self, path: &Path) -> bool;
}

/// Port for operations on one open repository.
///
/// Implementations must be safe to call from multiple threads; the engine
/// serializes mutating calls but reads may come from anywhere.
pub trait VcsRepository: Send + Sync {
    fn workdir(&self) -> &Path;

    /// Staged, unstaged and untracked paths. Conflicted paths count as
    /// unstaged.
    fn status(&self) -> Result<RepoStatus>;

    /// Stage the given paths for the next commit.
    fn stage(&self, paths: &[PathBuf]) -> Result<()>;

    /// Commit the staged changes, returning the new commit id.
    fn commit(&self, message: &str) -> Result<String>;

    /// Local branch names.
    fn branches(&self) -> Result<Vec<String>>;

    /// Current branch name, `None` when the head is detached.
    fn current_branch(&self) -> Result<Option<String>>;

    /// Switch to a branch without clobbering local modifications.
    fn checkout(&self, name: &str) -> Result<()>;

    /// Create a branch at `from` (the current head when `None`).
    fn create_branch(&self, name: &str, from: Option<&str>) -> Result<()>;

    /// Merge a branch into the current one. A conflicted merge is left in
    /// progress for manual resolution and reported as an error.
    fn merge(&self, source: &str) -> Result<()>;

    /// Rebase the current branch onto `target`. A conflicted rebase is left
    /// in progress and reported as an error.
    fn rebase(&self, target: &str) -> Result<()>;

    /// Apply one commit onto the current head. A content conflict is
    /// reported as [`ApplyConflict`](crate::error::EngineError::ApplyConflict)
    /// with the paths involved; callers inspect and then abort.
    fn apply_commit(&self, hash: &str, opts: &ApplyOptions) -> Result<()>;

    /// Drop any half-applied state and return the working tree to the
    /// current head.
    fn abort_apply(&self) -> Result<()>;

    /// Raw textual patch of a commit against its first parent.
    fn raw_patch(&self, hash: &str) -> Result<String>;

    /// Commits reachable from the head, newest first.
    fn log(&self, query: &LogQuery) -> Result<Vec<Commit>>;
}
