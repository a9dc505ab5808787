use crate::domain::{CherryPickErrorKind, CherryPickRequest, CherryPickResult};
use crate::error::EngineError;
use crate::ports::vcs::{ApplyOptions, VcsRepository};
use tracing::{info, warn};

/// Applies a sequence of commits onto a target branch and returns to the
/// branch the caller started on.
///
/// The working tree must be clean up front; untracked files are fine. The
/// protocol, in order: remember the current branch, switch to the target if
/// it differs, apply each commit, optionally squash, then switch back.
/// Application stops at the first failure; commits applied before it stay
/// applied and are reported, except in stage-only modes where the rollback
/// discards the staged prefix as well. A conflicted apply is rolled back so
/// the switch back cannot be blocked by a conflicted working tree.
pub fn run(repo: &dyn VcsRepository, request: &CherryPickRequest) -> CherryPickResult {
    let total = request.commits.len();
    let mut result = CherryPickResult::clean();
    if total == 0 {
        return result;
    }

    // A pick can rewrite any tracked file, so uncommitted changes block it.
    match repo.status() {
        Ok(status) if status.staged.is_empty() && status.unstaged.is_empty() => {}
        Ok(_) => {
            result.fail(
                CherryPickErrorKind::Backend,
                "the working tree has uncommitted changes",
            );
            return result;
        }
        Err(err) => {
            result.fail(CherryPickErrorKind::Backend, err.to_string());
            return result;
        }
    }

    let origin = match repo.current_branch() {
        Ok(Some(branch)) => branch,
        Ok(None) => {
            result.fail(
                CherryPickErrorKind::Backend,
                "cannot cherry-pick from a detached HEAD",
            );
            return result;
        }
        Err(err) => {
            result.fail(CherryPickErrorKind::Backend, err.to_string());
            return result;
        }
    };

    let switched = request.target_branch != origin;
    if switched {
        if let Err(err) = repo.checkout(&request.target_branch) {
            result.fail(CherryPickErrorKind::BranchCheckoutFailed, err.to_string());
            return result;
        }
        info!("Cherry-pick switched to branch {}", request.target_branch);
    }

    // Squashing stages everything and commits once at the end; a single
    // commit squashes to itself and is applied normally.
    let stage_only = request.no_commit || (request.squash && total > 1);
    let opts = ApplyOptions {
        no_commit: stage_only,
    };

    for (index, hash) in request.commits.iter().enumerate() {
        match repo.apply_commit(hash, &opts) {
            Ok(()) => {
                result.applied_commits.push(hash.clone());
                info!("Cherry-pick applied {}/{} ({})", index + 1, total, hash);
            }
            Err(err) => {
                result.success = false;
                result.error_message = Some(err.to_string());
                match err {
                    EngineError::ApplyConflict { conflicts, .. } => {
                        result.error_kind = Some(CherryPickErrorKind::ConflictDuringApply);
                        result.conflicts = conflicts;
                        if let Err(abort_err) = repo.abort_apply() {
                            warn!("Could not clear conflicted apply state: {}", abort_err);
                        }
                    }
                    _ => {
                        result.error_kind = Some(CherryPickErrorKind::Backend);
                        // A failed apply can leave a half-updated tree behind;
                        // clear it so the switch back cannot be blocked.
                        let dirty = repo
                            .status()
                            .map(|s| !s.staged.is_empty() || !s.unstaged.is_empty())
                            .unwrap_or(false);
                        if dirty {
                            if let Err(abort_err) = repo.abort_apply() {
                                warn!("Could not clear failed apply state: {}", abort_err);
                            }
                        }
                    }
                }
                if stage_only {
                    // Staged applications do not survive the rollback.
                    result.applied_commits.clear();
                }
                break;
            }
        }
    }

    if result.success && request.squash && !request.no_commit && result.applied_commits.len() > 1 {
        let message = squash_message(&result.applied_commits);
        match repo.commit(&message) {
            Ok(id) => info!(
                "Cherry-pick squashed {} commits into {}",
                result.applied_commits.len(),
                id
            ),
            Err(err) => {
                result.fail(CherryPickErrorKind::Backend, err.to_string());
                // Nothing was committed, so discard the staged picks too.
                if let Err(abort_err) = repo.abort_apply() {
                    warn!("Could not clear staged picks: {}", abort_err);
                }
                result.applied_commits.clear();
            }
        }
    }

    if switched {
        if let Err(err) = repo.checkout(&origin) {
            warn!("Could not restore branch {}: {}", origin, err);
            result.restore_error = Some(err.to_string());
        }
    }

    result
}

fn squash_message(applied: &[String]) -> String {
    let mut message = format!("Cherry-pick {} commits\n", applied.len());
    for hash in applied {
        message.push('\n');
        message.push_str(hash);
    }
    message
}
