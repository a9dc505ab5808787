use std::path::PathBuf;
use thiserror::Error;

/// Engine errors surfaced to callers of the session API.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No repository session is open")]
    NoSession,

    #[error("Not a repository: {}", path.display())]
    NotARepository { path: PathBuf },

    #[error("Failed to initialize repository at {}: {message}", path.display())]
    InitFailed { path: PathBuf, message: String },

    #[error("Failed to stage files: {message}")]
    StageFailed { message: String },

    #[error("Commit message is empty")]
    EmptyMessage,

    #[error("Commit failed: {message}")]
    CommitFailed { message: String },

    #[error("Branch already exists: {name}")]
    BranchExists { name: String },

    #[error("Failed to check out {name}: {message}")]
    CheckoutFailed { name: String, message: String },

    #[error("Merge of '{branch}' left {} files in conflict", conflicts.len())]
    MergeConflict { branch: String, conflicts: Vec<String> },

    #[error("Rebase onto '{branch}' left {} files in conflict", conflicts.len())]
    RebaseConflict { branch: String, conflicts: Vec<String> },

    #[error("Applying '{hash}' left {} files in conflict", conflicts.len())]
    ApplyConflict { hash: String, conflicts: Vec<String> },

    #[error("Another cherry-pick is already in progress")]
    OperationInProgress,

    #[error("Backend error: {source}")]
    Backend { source: anyhow::Error },
}

pub type Result<T> = std::result::Result<T, EngineError>;
