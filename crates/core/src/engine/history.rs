use crate::domain::{summarize_patch, CommitDiff, HistoryEntry, HistoryQuery};
use crate::error::Result;
use crate::ports::vcs::{LogQuery, VcsRepository};
use tracing::warn;

/// Reads one page of history, optionally enriched with per-commit diffs.
///
/// Filtering and pagination happen in the backend log; diff summarization
/// happens here. A commit whose patch cannot be loaded gets the empty diff
/// instead of failing the whole page.
pub fn read_history(repo: &dyn VcsRepository, query: &HistoryQuery) -> Result<Vec<HistoryEntry>> {
    let log_query = LogQuery {
        limit: query.limit,
        skip: query.skip,
        message_filter: query.message_filter.clone(),
    };
    let commits = repo.log(&log_query)?;

    let mut entries = Vec::with_capacity(commits.len());
    for commit in commits {
        let diff = if query.include_diffs {
            match repo.raw_patch(&commit.id) {
                Ok(patch) => Some(summarize_patch(&patch)),
                Err(err) => {
                    warn!("Could not load diff for {}: {}", commit.id, err);
                    Some(CommitDiff::default())
                }
            }
        } else {
            None
        };
        entries.push(HistoryEntry { commit, diff });
    }
    Ok(entries)
}
