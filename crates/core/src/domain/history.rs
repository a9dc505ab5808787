use crate::domain::commit::Commit;
use crate::domain::diff::CommitDiff;
use serde::{Deserialize, Serialize};

/// Pagination and filtering for a history read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryQuery {
    /// Maximum number of entries to return; `None` means unbounded.
    pub limit: Option<usize>,
    /// Entries to drop from the front after filtering.
    pub skip: usize,
    /// Case-insensitive substring match on the full commit message.
    pub message_filter: Option<String>,
    /// Attach a structured diff to every entry.
    pub include_diffs: bool,
}

/// One commit of a history page, optionally with its diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub commit: Commit,
    /// `None` when diffs were not requested. An empty summary means the diff
    /// could not be loaded for this commit.
    pub diff: Option<CommitDiff>,
}
