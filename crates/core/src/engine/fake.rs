//! Scripted in-memory backend for engine tests.

use crate::domain::{Commit, RepoStatus};
use crate::error::{EngineError, Result};
use crate::ports::vcs::{ApplyOptions, LogQuery, VcsBackend, VcsRepository};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
pub(crate) struct FakeState {
    // Scripted behavior
    pub branch: Option<String>,
    pub branches: Vec<String>,
    pub status: RepoStatus,
    pub commits: Vec<Commit>,
    pub patches: HashMap<String, String>,
    pub failing_patches: HashSet<String>,
    /// Applying these commits fails and leaves the listed paths conflicted.
    pub conflict_commits: HashMap<String, Vec<String>>,
    /// Applying these commits fails with a clean working tree.
    pub failing_commits: HashSet<String>,
    pub failing_checkouts: HashSet<String>,
    pub merge_conflicts: Vec<String>,
    pub rebase_conflicts: Vec<String>,
    pub commit_fails: bool,
    pub apply_delay: Option<Duration>,

    // Call record
    pub applied: Vec<(String, bool)>,
    pub checkouts: Vec<String>,
    pub commit_messages: Vec<String>,
    pub staged: Vec<PathBuf>,
    pub aborts: usize,
}

pub(crate) struct FakeRepo {
    path: PathBuf,
    pub state: Mutex<FakeState>,
}

impl FakeRepo {
    pub fn new(path: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            path: path.into(),
            state: Mutex::new(FakeState::default()),
        })
    }
}

impl VcsRepository for FakeRepo {
    fn workdir(&self) -> &Path {
        &self.path
    }

    fn status(&self) -> Result<RepoStatus> {
        Ok(self.state.lock().unwrap().status.clone())
    }

    fn stage(&self, paths: &[PathBuf]) -> Result<()> {
        self.state.lock().unwrap().staged.extend_from_slice(paths);
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        if state.commit_fails {
            return Err(EngineError::CommitFailed {
                message: "scripted commit failure".to_string(),
            });
        }
        state.commit_messages.push(message.to_string());
        Ok(format!("commit-{}", state.commit_messages.len()))
    }

    fn branches(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().unwrap().branches.clone())
    }

    fn current_branch(&self) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().branch.clone())
    }

    fn checkout(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_checkouts.contains(name) {
            return Err(EngineError::CheckoutFailed {
                name: name.to_string(),
                message: "scripted checkout failure".to_string(),
            });
        }
        state.branch = Some(name.to_string());
        state.checkouts.push(name.to_string());
        Ok(())
    }

    fn create_branch(&self, name: &str, _from: Option<&str>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.branches.iter().any(|b| b == name) {
            return Err(EngineError::BranchExists {
                name: name.to_string(),
            });
        }
        state.branches.push(name.to_string());
        Ok(())
    }

    fn merge(&self, source: &str) -> Result<()> {
        let state = self.state.lock().unwrap();
        if state.merge_conflicts.is_empty() {
            Ok(())
        } else {
            Err(EngineError::MergeConflict {
                branch: source.to_string(),
                conflicts: state.merge_conflicts.clone(),
            })
        }
    }

    fn rebase(&self, target: &str) -> Result<()> {
        let state = self.state.lock().unwrap();
        if state.rebase_conflicts.is_empty() {
            Ok(())
        } else {
            Err(EngineError::RebaseConflict {
                branch: target.to_string(),
                conflicts: state.rebase_conflicts.clone(),
            })
        }
    }

    fn apply_commit(&self, hash: &str, opts: &ApplyOptions) -> Result<()> {
        let delay = self.state.lock().unwrap().apply_delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        let mut state = self.state.lock().unwrap();
        if state.failing_commits.contains(hash) {
            return Err(EngineError::Backend {
                source: anyhow::anyhow!("scripted failure applying {hash}"),
            });
        }
        if let Some(conflicts) = state.conflict_commits.get(hash).cloned() {
            state.status.unstaged = conflicts.clone();
            return Err(EngineError::ApplyConflict {
                hash: hash.to_string(),
                conflicts,
            });
        }
        state.applied.push((hash.to_string(), opts.no_commit));
        if !opts.no_commit {
            state.commit_messages.push(format!("apply {hash}"));
        }
        Ok(())
    }

    fn abort_apply(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.aborts += 1;
        state.status = RepoStatus::default();
        Ok(())
    }

    fn raw_patch(&self, hash: &str) -> Result<String> {
        let state = self.state.lock().unwrap();
        if state.failing_patches.contains(hash) {
            return Err(EngineError::Backend {
                source: anyhow::anyhow!("scripted patch failure for {hash}"),
            });
        }
        state
            .patches
            .get(hash)
            .cloned()
            .ok_or_else(|| EngineError::Backend {
                source: anyhow::anyhow!("unknown commit {hash}"),
            })
    }

    fn log(&self, query: &LogQuery) -> Result<Vec<Commit>> {
        let state = self.state.lock().unwrap();
        let filter = query.message_filter.as_ref().map(|f| f.to_lowercase());
        let matched = state.commits.iter().filter(|commit| match &filter {
            Some(filter) => commit.message.to_lowercase().contains(filter),
            None => true,
        });
        let page = matched.skip(query.skip).cloned();
        Ok(match query.limit {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        })
    }
}

pub(crate) struct FakeBackend {
    pub repos: Mutex<HashMap<PathBuf, Arc<FakeRepo>>>,
    pub init_fails: Mutex<bool>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            repos: Mutex::new(HashMap::new()),
            init_fails: Mutex::new(false),
        })
    }

    pub fn add_repo(&self, path: impl Into<PathBuf>) -> Arc<FakeRepo> {
        let path = path.into();
        let repo = FakeRepo::new(path.clone());
        self.repos.lock().unwrap().insert(path, Arc::clone(&repo));
        repo
    }
}

impl VcsBackend for FakeBackend {
    fn open(&self, path: &Path) -> Result<Arc<dyn VcsRepository>> {
        match self.repos.lock().unwrap().get(path) {
            Some(repo) => Ok(Arc::clone(repo) as Arc<dyn VcsRepository>),
            None => Err(EngineError::NotARepository {
                path: path.to_path_buf(),
            }),
        }
    }

    fn init(&self, path: &Path) -> Result<Arc<dyn VcsRepository>> {
        if *self.init_fails.lock().unwrap() {
            return Err(EngineError::InitFailed {
                path: path.to_path_buf(),
                message: "scripted init failure".to_string(),
            });
        }
        let repo: Arc<dyn VcsRepository> = self.add_repo(path);
        Ok(repo)
    }

    fn is_repository(&self, path: &Path) -> bool {
        self.repos.lock().unwrap().contains_key(path)
    }
}
