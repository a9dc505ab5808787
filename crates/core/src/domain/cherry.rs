use serde::{Deserialize, Serialize};

/// What to cherry-pick and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CherryPickRequest {
    /// Branch the commits are applied onto.
    pub target_branch: String,
    /// Commit ids in application order. Abbreviated ids are accepted.
    pub commits: Vec<String>,
    /// Stage the changes but create no commits.
    pub no_commit: bool,
    /// Consolidate all picked commits into a single commit at the end.
    pub squash: bool,
}

/// Failure classification for a cherry-pick run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CherryPickErrorKind {
    /// The target branch could not be checked out; nothing was changed.
    BranchCheckoutFailed,
    /// A commit failed to apply cleanly; `conflicts` lists the paths involved.
    ConflictDuringApply,
    /// Uncategorized backend failure.
    Backend,
}

/// Outcome of a cherry-pick run.
///
/// `applied_commits` is always the prefix of the request that landed before
/// the first failure, echoed back exactly as the caller spelled the ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CherryPickResult {
    pub success: bool,
    pub applied_commits: Vec<String>,
    pub conflicts: Vec<String>,
    pub error_kind: Option<CherryPickErrorKind>,
    pub error_message: Option<String>,
    /// Set when switching back to the original branch failed. The primary
    /// outcome above still describes the pick itself.
    pub restore_error: Option<String>,
}

impl CherryPickResult {
    pub fn clean() -> Self {
        Self {
            success: true,
            applied_commits: Vec::new(),
            conflicts: Vec::new(),
            error_kind: None,
            error_message: None,
            restore_error: None,
        }
    }

    pub fn fail(&mut self, kind: CherryPickErrorKind, message: impl Into<String>) {
        self.success = false;
        self.error_kind = Some(kind);
        self.error_message = Some(message.into());
    }
}
