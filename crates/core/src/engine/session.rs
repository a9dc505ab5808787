use crate::domain::{
    CherryPickRequest, CherryPickResult, HistoryEntry, HistoryQuery, RepoMeta, RepoSnapshot,
    RepoStatus,
};
use crate::engine::{cherry, history};
use crate::error::{EngineError, Result};
use crate::ports::vcs::{VcsBackend, VcsRepository};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

struct Session {
    path: PathBuf,
    repo: Arc<dyn VcsRepository>,
}

/// Single-repository session engine.
///
/// Holds at most one open repository at a time. All operations that touch
/// the repository take the session lock for their whole duration, so
/// mutations never interleave. Read operations degrade to empty results
/// instead of failing when nothing is open.
pub struct SessionService {
    backend: Arc<dyn VcsBackend>,
    session: Mutex<Option<Session>>,
    /// Held for the duration of a cherry-pick run; a second run fails fast
    /// instead of queueing behind the first.
    cherry_flight: Mutex<()>,
}

impl SessionService {
    pub fn new(backend: Arc<dyn VcsBackend>) -> Self {
        Self {
            backend,
            session: Mutex::new(None),
            cherry_flight: Mutex::new(()),
        }
    }

    /// Open the repository at `path`, replacing any prior session. On failure
    /// the prior session is left untouched.
    pub fn open(&self, path: &Path) -> Result<RepoMeta> {
        let repo = self.backend.open(path)?;
        let meta = RepoMeta::new(path, repo.current_branch().ok().flatten());
        let mut session = self.session.lock().unwrap();
        *session = Some(Session {
            path: path.to_path_buf(),
            repo,
        });
        info!("Opened repository at {}", path.display());
        Ok(meta)
    }

    /// Create an empty repository at `path` and open a session on it.
    pub fn init(&self, path: &Path) -> Result<RepoMeta> {
        let repo = self.backend.init(path)?;
        let meta = RepoMeta::new(path, repo.current_branch().ok().flatten());
        let mut session = self.session.lock().unwrap();
        *session = Some(Session {
            path: path.to_path_buf(),
            repo,
        });
        info!("Initialized repository at {}", path.display());
        Ok(meta)
    }

    /// Drop the current session. Safe to call when nothing is open.
    pub fn close(&self) {
        let mut session = self.session.lock().unwrap();
        if session.take().is_some() {
            info!("Closed repository session");
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.lock().unwrap().is_some()
    }

    /// Working tree status; the all-empty status when no session is open or
    /// the backend read fails.
    pub fn status(&self) -> RepoStatus {
        let session = self.session.lock().unwrap();
        match session.as_ref() {
            None => RepoStatus::default(),
            Some(s) => match s.repo.status() {
                Ok(mut status) => {
                    status.normalize();
                    status
                }
                Err(err) => {
                    warn!("Status read failed: {}", err);
                    RepoStatus::default()
                }
            },
        }
    }

    /// Local branch names; empty when no session is open.
    pub fn branches(&self) -> Vec<String> {
        let session = self.session.lock().unwrap();
        match session.as_ref() {
            None => Vec::new(),
            Some(s) => match s.repo.branches() {
                Ok(branches) => branches,
                Err(err) => {
                    warn!("Branch listing failed: {}", err);
                    Vec::new()
                }
            },
        }
    }

    /// Metadata plus status for the open repository.
    pub fn current_repository(&self) -> Option<RepoSnapshot> {
        let session = self.session.lock().unwrap();
        session.as_ref().map(|s| {
            let meta = RepoMeta::new(&s.path, s.repo.current_branch().ok().flatten());
            let mut status = s.repo.status().unwrap_or_default();
            status.normalize();
            RepoSnapshot { meta, status }
        })
    }

    /// Stage paths for the next commit.
    pub fn add_files(&self, paths: &[PathBuf]) -> Result<()> {
        let session = self.session.lock().unwrap();
        let s = session.as_ref().ok_or(EngineError::NoSession)?;
        s.repo.stage(paths)
    }

    /// Commit staged changes. The message is rejected before the backend is
    /// touched when it is empty or whitespace.
    pub fn commit(&self, message: &str) -> Result<String> {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return Err(EngineError::EmptyMessage);
        }
        let session = self.session.lock().unwrap();
        let s = session.as_ref().ok_or(EngineError::NoSession)?;
        let id = s.repo.commit(trimmed)?;
        info!("Created commit {}", id);
        Ok(id)
    }

    /// Create a branch at the current head.
    pub fn create_branch(&self, name: &str) -> Result<()> {
        let session = self.session.lock().unwrap();
        let s = session.as_ref().ok_or(EngineError::NoSession)?;
        s.repo.create_branch(name, None)
    }

    /// Switch the working tree to another branch.
    pub fn checkout_branch(&self, name: &str) -> Result<()> {
        let session = self.session.lock().unwrap();
        let s = session.as_ref().ok_or(EngineError::NoSession)?;
        s.repo.checkout(name)
    }

    /// Merge `source` into the current branch.
    pub fn merge_branch(&self, source: &str) -> Result<()> {
        let session = self.session.lock().unwrap();
        let s = session.as_ref().ok_or(EngineError::NoSession)?;
        s.repo.merge(source)
    }

    /// Rebase the current branch onto `target`.
    pub fn rebase_branch(&self, target: &str) -> Result<()> {
        let session = self.session.lock().unwrap();
        let s = session.as_ref().ok_or(EngineError::NoSession)?;
        s.repo.rebase(target)
    }

    /// Read a page of commit history.
    pub fn history(&self, query: &HistoryQuery) -> Result<Vec<HistoryEntry>> {
        let session = self.session.lock().unwrap();
        let s = session.as_ref().ok_or(EngineError::NoSession)?;
        history::read_history(s.repo.as_ref(), query)
    }

    /// Run a cherry-pick. Only flow-control failures surface as `Err`; the
    /// outcome of the pick itself, including conflicts, is in the result.
    pub fn cherry_pick(&self, request: &CherryPickRequest) -> Result<CherryPickResult> {
        let _flight = self
            .cherry_flight
            .try_lock()
            .map_err(|_| EngineError::OperationInProgress)?;
        let session = self.session.lock().unwrap();
        let s = session.as_ref().ok_or(EngineError::NoSession)?;
        Ok(cherry::run(s.repo.as_ref(), request))
    }
}
