use git2::build::CheckoutBuilder;
use git2::{BranchType, Repository as GitRepository, Sort, StatusOptions};
use gitkeel_core::domain::{Author, Commit, RepoStatus, Timestamp};
use gitkeel_core::error::{EngineError, Result};
use gitkeel_core::ports::vcs::{ApplyOptions, LogQuery, VcsBackend, VcsRepository};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Backend that hands out git2-based repository handles.
pub struct Git2Backend;

impl Git2Backend {
    pub fn new() -> Self {
        Self
    }
}

impl VcsBackend for Git2Backend {
    fn open(&self, path: &Path) -> Result<Arc<dyn VcsRepository>> {
        // Validate eagerly; the handle itself only keeps the path.
        let repo = GitRepository::open(path).map_err(|_| EngineError::NotARepository {
            path: path.to_path_buf(),
        })?;
        if repo.workdir().is_none() {
            return Err(EngineError::NotARepository {
                path: path.to_path_buf(),
            });
        }
        Ok(Arc::new(Git2Repository {
            path: path.to_path_buf(),
        }))
    }

    fn init(&self, path: &Path) -> Result<Arc<dyn VcsRepository>> {
        GitRepository::init(path).map_err(|e| EngineError::InitFailed {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })?;
        Ok(Arc::new(Git2Repository {
            path: path.to_path_buf(),
        }))
    }

    fn is_repository(&self, path: &Path) -> bool {
        path.join(".git").is_dir()
    }
}

impl Default for Git2Backend {
    fn default() -> Self {
        Self::new()
    }
}

/// One open repository. git2 handles are not shareable across threads, so
/// this keeps only the path and opens a fresh handle per call.
pub struct Git2Repository {
    path: PathBuf,
}

impl Git2Repository {
    fn repo(&self) -> Result<GitRepository> {
        GitRepository::open(&self.path).map_err(|_| EngineError::NotARepository {
            path: self.path.clone(),
        })
    }

    /// Stage a pick without committing. git2's cherrypick merges against the
    /// HEAD tree, which would drop changes staged by an earlier pick, so this
    /// merges against the index tree instead and checks the result out.
    fn stage_pick(&self, repo: &GitRepository, commit: &git2::Commit, hash: &str) -> Result<()> {
        let mut index = repo.index().map_err(backend)?;
        let our_tree = repo
            .find_tree(index.write_tree().map_err(backend)?)
            .map_err(backend)?;
        let base_tree = match commit.parent(0) {
            Ok(parent) => parent.tree().map_err(backend)?,
            Err(_) => {
                // A root commit merges against the empty tree.
                let empty = repo
                    .treebuilder(None)
                    .and_then(|mut builder| builder.write())
                    .map_err(backend)?;
                repo.find_tree(empty).map_err(backend)?
            }
        };
        let their_tree = commit.tree().map_err(backend)?;

        let mut merged = repo
            .merge_trees(&base_tree, &our_tree, &their_tree, None)
            .map_err(backend)?;
        if merged.has_conflicts() {
            return Err(EngineError::ApplyConflict {
                hash: hash.to_string(),
                conflicts: conflict_paths(&merged),
            });
        }

        let tree_id = merged.write_tree_to(repo).map_err(backend)?;
        let tree = repo.find_object(tree_id, None).map_err(backend)?;
        // The pick sequence starts from a clean tree, so forcing the merged
        // tree into the index and working directory only rewrites files the
        // picks themselves touched.
        let mut options = CheckoutBuilder::new();
        options.force();
        repo.checkout_tree(&tree, Some(&mut options))
            .map_err(backend)?;
        Ok(())
    }
}

impl VcsRepository for Git2Repository {
    fn workdir(&self) -> &Path {
        &self.path
    }

    fn status(&self) -> Result<RepoStatus> {
        let repo = self.repo()?;

        let mut status_options = StatusOptions::new();
        status_options.include_untracked(true);
        status_options.include_ignored(false);

        let statuses = repo.statuses(Some(&mut status_options)).map_err(backend)?;

        let staged = git2::Status::INDEX_NEW
            | git2::Status::INDEX_MODIFIED
            | git2::Status::INDEX_DELETED
            | git2::Status::INDEX_RENAMED
            | git2::Status::INDEX_TYPECHANGE;
        let unstaged = git2::Status::WT_MODIFIED
            | git2::Status::WT_DELETED
            | git2::Status::WT_TYPECHANGE
            | git2::Status::WT_RENAMED;

        let mut status = RepoStatus::default();
        for entry in statuses.iter() {
            let path = match entry.path() {
                Some(path) => path.to_string(),
                None => continue,
            };
            let flags = entry.status();

            if flags.intersects(staged) {
                status.staged.push(path.clone());
            }
            if flags.contains(git2::Status::CONFLICTED) {
                status.unstaged.push(path);
            } else if flags.contains(git2::Status::WT_NEW) {
                status.untracked.push(path);
            } else if flags.intersects(unstaged) {
                status.unstaged.push(path);
            }
        }

        status.staged.sort();
        status.unstaged.sort();
        status.untracked.sort();
        status.normalize();
        Ok(status)
    }

    fn stage(&self, paths: &[PathBuf]) -> Result<()> {
        let repo = self.repo()?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| EngineError::StageFailed {
                message: "bare repository has no working tree".to_string(),
            })?
            .to_path_buf();
        let mut index = repo.index().map_err(|e| EngineError::StageFailed {
            message: e.message().to_string(),
        })?;

        for path in paths {
            let relative = if path.is_absolute() {
                path.strip_prefix(&workdir)
                    .map_err(|_| EngineError::StageFailed {
                        message: format!("{} is outside the working tree", path.display()),
                    })?
                    .to_path_buf()
            } else {
                path.clone()
            };

            if workdir.join(&relative).exists() {
                index.add_path(&relative).map_err(|e| EngineError::StageFailed {
                    message: format!("{}: {}", relative.display(), e.message()),
                })?;
            } else if index.get_path(&relative, 0).is_some() {
                // Staging a deleted file records the removal.
                index
                    .remove_path(&relative)
                    .map_err(|e| EngineError::StageFailed {
                        message: format!("{}: {}", relative.display(), e.message()),
                    })?;
            } else {
                return Err(EngineError::StageFailed {
                    message: format!("{} did not match any file", relative.display()),
                });
            }
        }

        index.write().map_err(|e| EngineError::StageFailed {
            message: e.message().to_string(),
        })
    }

    fn commit(&self, message: &str) -> Result<String> {
        let repo = self.repo()?;
        let commit_err = |e: git2::Error| EngineError::CommitFailed {
            message: e.message().to_string(),
        };

        let signature = repo.signature().map_err(commit_err)?;
        let mut index = repo.index().map_err(commit_err)?;
        let tree_id = index.write_tree().map_err(commit_err)?;
        let tree = repo.find_tree(tree_id).map_err(commit_err)?;

        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit().map_err(commit_err)?),
            Err(_) => None, // first commit on an unborn branch
        };

        // Refuse empty commits: the staged tree must differ from the parent.
        match &parent {
            Some(parent) if parent.tree_id() == tree_id => {
                return Err(EngineError::CommitFailed {
                    message: "nothing staged to commit".to_string(),
                });
            }
            None if index.is_empty() => {
                return Err(EngineError::CommitFailed {
                    message: "nothing staged to commit".to_string(),
                });
            }
            _ => {}
        }

        let parents: Vec<&git2::Commit> = parent.iter().collect();
        let id = repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .map_err(commit_err)?;
        Ok(id.to_string())
    }

    fn branches(&self) -> Result<Vec<String>> {
        let repo = self.repo()?;
        let mut names = Vec::new();
        for entry in repo.branches(Some(BranchType::Local)).map_err(backend)? {
            let (branch, _) = entry.map_err(backend)?;
            if let Some(name) = branch.name().map_err(backend)? {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn current_branch(&self) -> Result<Option<String>> {
        let repo = self.repo()?;
        let branch = match repo.head() {
            Ok(head) if head.is_branch() => Ok(head.shorthand().map(|s| s.to_string())),
            Ok(_) => Ok(None), // detached HEAD
            Err(_) => {
                // Unborn branch right after init: HEAD is a symbolic ref to a
                // branch with no commits yet.
                match repo.find_reference("HEAD") {
                    Ok(head) => Ok(head
                        .symbolic_target()
                        .and_then(|t| t.strip_prefix("refs/heads/"))
                        .map(|s| s.to_string())),
                    Err(_) => Ok(None),
                }
            }
        };
        branch
    }

    fn checkout(&self, name: &str) -> Result<()> {
        let repo = self.repo()?;
        let checkout_err = |e: git2::Error| EngineError::CheckoutFailed {
            name: name.to_string(),
            message: e.message().to_string(),
        };

        let refname = format!("refs/heads/{}", name);
        let object = repo.revparse_single(&refname).map_err(checkout_err)?;

        // Safe mode refuses to clobber local modifications.
        let mut options = CheckoutBuilder::new();
        options.safe();
        repo.checkout_tree(&object, Some(&mut options))
            .map_err(checkout_err)?;
        repo.set_head(&refname).map_err(checkout_err)?;
        Ok(())
    }

    fn create_branch(&self, name: &str, from: Option<&str>) -> Result<()> {
        let repo = self.repo()?;
        if repo.find_branch(name, BranchType::Local).is_ok() {
            return Err(EngineError::BranchExists {
                name: name.to_string(),
            });
        }

        let target = match from {
            Some(reference) => repo
                .revparse_single(reference)
                .and_then(|object| object.peel_to_commit())
                .map_err(backend)?,
            None => repo
                .head()
                .and_then(|head| head.peel_to_commit())
                .map_err(backend)?,
        };

        repo.branch(name, &target, false).map_err(|e| {
            if e.code() == git2::ErrorCode::Exists {
                EngineError::BranchExists {
                    name: name.to_string(),
                }
            } else {
                backend(e)
            }
        })?;
        Ok(())
    }

    fn merge(&self, source: &str) -> Result<()> {
        let repo = self.repo()?;

        let branch = repo
            .find_branch(source, BranchType::Local)
            .map_err(backend)?;
        let source_oid = branch.get().target().ok_or_else(|| EngineError::Backend {
            source: anyhow::anyhow!("branch '{}' has no commit", source),
        })?;
        let annotated = repo.find_annotated_commit(source_oid).map_err(backend)?;

        let (analysis, _) = repo.merge_analysis(&[&annotated]).map_err(backend)?;

        if analysis.is_up_to_date() {
            debug!("Merge of {} is a no-op, already up to date", source);
            return Ok(());
        }

        if analysis.is_fast_forward() {
            // Move the current branch ref up and check out the new tree.
            let object = repo.find_object(source_oid, None).map_err(backend)?;
            let mut options = CheckoutBuilder::new();
            options.safe();
            repo.checkout_tree(&object, Some(&mut options))
                .map_err(backend)?;
            let mut head = repo.head().map_err(backend)?;
            head.set_target(source_oid, "fast-forward merge")
                .map_err(backend)?;
            return Ok(());
        }

        // Normal merge into index and working tree.
        if let Err(e) = repo.merge(&[&annotated], None, None) {
            let _ = repo.cleanup_state();
            return Err(backend(e));
        }

        let mut index = repo.index().map_err(backend)?;
        if index.has_conflicts() {
            // Leave the merge in progress so conflicts can be resolved by hand.
            return Err(EngineError::MergeConflict {
                branch: source.to_string(),
                conflicts: conflict_paths(&index),
            });
        }

        let tree_id = index.write_tree().map_err(backend)?;
        let tree = repo.find_tree(tree_id).map_err(backend)?;
        let signature = repo.signature().map_err(backend)?;
        let head_commit = repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .map_err(backend)?;
        let source_commit = repo.find_commit(source_oid).map_err(backend)?;
        let message = format!("Merge branch '{}'", source);
        repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            &message,
            &tree,
            &[&head_commit, &source_commit],
        )
        .map_err(backend)?;
        repo.cleanup_state().map_err(backend)?;
        Ok(())
    }

    fn rebase(&self, target: &str) -> Result<()> {
        let repo = self.repo()?;

        let branch = repo
            .find_branch(target, BranchType::Local)
            .map_err(backend)?;
        let target_oid = branch.get().target().ok_or_else(|| EngineError::Backend {
            source: anyhow::anyhow!("branch '{}' has no commit", target),
        })?;
        let upstream = repo.find_annotated_commit(target_oid).map_err(backend)?;
        let signature = repo.signature().map_err(backend)?;

        let mut rebase = repo
            .rebase(None, Some(&upstream), None, None)
            .map_err(backend)?;

        while let Some(operation) = rebase.next() {
            if let Err(err) = operation {
                let _ = rebase.abort();
                return Err(backend(err));
            }

            let index = repo.index().map_err(backend)?;
            if index.has_conflicts() {
                // Leave the rebase in progress for manual resolution.
                return Err(EngineError::RebaseConflict {
                    branch: target.to_string(),
                    conflicts: conflict_paths(&index),
                });
            }

            match rebase.commit(None, &signature, None) {
                Ok(_) => {}
                // The patch is already upstream; skip it.
                Err(err) if err.code() == git2::ErrorCode::Applied => {}
                Err(err) => {
                    let _ = rebase.abort();
                    return Err(backend(err));
                }
            }
        }

        rebase.finish(Some(&signature)).map_err(backend)?;
        Ok(())
    }

    fn apply_commit(&self, hash: &str, opts: &ApplyOptions) -> Result<()> {
        let repo = self.repo()?;

        let commit = repo
            .revparse_single(hash)
            .and_then(|object| object.peel_to_commit())
            .map_err(backend)?;

        if opts.no_commit {
            // Like `git cherry-pick -n`: the changes stay staged.
            return self.stage_pick(&repo, &commit, hash);
        }

        repo.cherrypick(&commit, None).map_err(backend)?;

        let mut index = repo.index().map_err(backend)?;
        if index.has_conflicts() {
            // Keep the conflicted state; callers inspect and then abort.
            return Err(EngineError::ApplyConflict {
                hash: hash.to_string(),
                conflicts: conflict_paths(&index),
            });
        }

        let tree_id = index.write_tree().map_err(backend)?;
        let tree = repo.find_tree(tree_id).map_err(backend)?;
        let head_commit = repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .map_err(backend)?;
        let committer = repo.signature().map_err(backend)?;
        let author = commit.author();
        let message = commit.message().unwrap_or("");
        repo.commit(
            Some("HEAD"),
            &author,
            &committer,
            message,
            &tree,
            &[&head_commit],
        )
        .map_err(backend)?;
        repo.cleanup_state().map_err(backend)?;
        Ok(())
    }

    fn abort_apply(&self) -> Result<()> {
        let repo = self.repo()?;
        let head_commit = repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .map_err(backend)?;
        repo.reset(head_commit.as_object(), git2::ResetType::Hard, None)
            .map_err(backend)?;
        repo.cleanup_state().map_err(backend)?;
        Ok(())
    }

    fn raw_patch(&self, hash: &str) -> Result<String> {
        let repo = self.repo()?;

        let commit = repo
            .revparse_single(hash)
            .and_then(|object| object.peel_to_commit())
            .map_err(backend)?;
        let tree = commit.tree().map_err(backend)?;
        let parent_tree = match commit.parent(0) {
            Ok(parent) => Some(parent.tree().map_err(backend)?),
            Err(_) => None, // root commit diffs against the empty tree
        };

        let diff = repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
            .map_err(backend)?;

        let mut patch = String::new();
        diff.print(git2::DiffFormat::Patch, |_delta, _hunk, line| {
            let origin = line.origin();
            if matches!(origin, '+' | '-' | ' ') {
                patch.push(origin);
            }
            patch.push_str(&String::from_utf8_lossy(line.content()));
            true
        })
        .map_err(backend)?;
        Ok(patch)
    }

    fn log(&self, query: &LogQuery) -> Result<Vec<Commit>> {
        let repo = self.repo()?;

        let mut revwalk = repo.revwalk().map_err(backend)?;
        if revwalk.push_head().is_err() {
            // No commits yet.
            return Ok(Vec::new());
        }
        revwalk.set_sorting(Sort::TIME).map_err(backend)?;

        // Branch tips, for decorating commits with the branches pointing at them
        let mut tips: HashMap<git2::Oid, Vec<String>> = HashMap::new();
        if let Ok(branches) = repo.branches(Some(BranchType::Local)) {
            for entry in branches.flatten() {
                let (branch, _) = entry;
                if let (Ok(Some(name)), Some(oid)) = (branch.name(), branch.get().target()) {
                    tips.entry(oid).or_default().push(name.to_string());
                }
            }
        }

        let filter = query.message_filter.as_ref().map(|f| f.to_lowercase());
        let mut commits = Vec::new();
        let mut matched = 0usize;
        for oid in revwalk {
            let oid = oid.map_err(backend)?;
            let commit = repo.find_commit(oid).map_err(backend)?;
            let message = commit.message().unwrap_or("").trim_end().to_string();

            if let Some(filter) = &filter {
                if !message.to_lowercase().contains(filter) {
                    continue;
                }
            }
            matched += 1;
            if matched <= query.skip {
                continue;
            }

            commits.push(Commit {
                id: oid.to_string(),
                message,
                author: Author {
                    name: commit.author().name().unwrap_or("").to_string(),
                    email: commit.author().email().unwrap_or("").to_string(),
                },
                timestamp: Timestamp::new(commit.time().seconds(), commit.time().offset_minutes()),
                branch_refs: tips.get(&oid).cloned().unwrap_or_default(),
            });

            if let Some(limit) = query.limit {
                if commits.len() >= limit {
                    break;
                }
            }
        }

        Ok(commits)
    }
}

fn backend(err: git2::Error) -> EngineError {
    EngineError::Backend { source: err.into() }
}

/// Paths involved in index conflicts, deduplicated and sorted.
fn conflict_paths(index: &git2::Index) -> Vec<String> {
    let mut paths = Vec::new();
    if let Ok(conflicts) = index.conflicts() {
        for conflict in conflicts.flatten() {
            let entry = conflict.our.or(conflict.their).or(conflict.ancestor);
            if let Some(entry) = entry {
                paths.push(String::from_utf8_lossy(&entry.path).to_string());
            }
        }
    }
    paths.sort();
    paths.dedup();
    paths
}
