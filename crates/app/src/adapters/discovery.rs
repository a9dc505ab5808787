use crossbeam_channel::Sender;
use gitkeel_core::domain::RepoMeta;
use gitkeel_core::error::Result;
use gitkeel_core::ports::discovery::{DiscoveryPort, ScanOptions, ScanRequest};
use gitkeel_core::ports::vcs::VcsBackend;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Events emitted by a background scan.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    RepoDiscovered(RepoMeta),
    ScanCompleted,
    ScanError(String),
}

/// Filesystem discovery adapter that implements DiscoveryPort.
pub struct WalkdirScanner {
    backend: Arc<dyn VcsBackend>,
}

impl WalkdirScanner {
    pub fn new(backend: Arc<dyn VcsBackend>) -> Self {
        Self { backend }
    }

    /// Walk one root, recording repository directories into `found`.
    /// Duplicates across roots are dropped via `seen` (first occurrence wins).
    fn scan_root(
        &self,
        root: &Path,
        options: &ScanOptions,
        seen: &mut HashSet<String>,
        found: &mut Vec<PathBuf>,
    ) {
        let backend = Arc::clone(&self.backend);
        let base = root.to_path_buf();
        let limit = options.entry_limit;
        let mut entry_counts: HashMap<PathBuf, usize> = HashMap::new();

        let walker = WalkDir::new(root)
            .max_depth(options.max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e| {
                // The roots themselves are explicit and always considered.
                if e.depth() == 0 {
                    return true;
                }
                if !e.file_type().is_dir() {
                    return false;
                }

                // Skip hidden directories, .git included
                let name = e.file_name().to_string_lossy();
                if name.starts_with('.') {
                    return false;
                }

                if let Some(limit) = limit {
                    let parent = e.path().parent().map(Path::to_path_buf).unwrap_or_default();
                    let count = entry_counts.entry(parent).or_insert(0);
                    *count += 1;
                    if *count > limit {
                        debug!(
                            "Entry limit {} reached under {}, skipping {}",
                            limit,
                            e.path().parent().unwrap_or(Path::new("")).display(),
                            name
                        );
                        return false;
                    }
                }

                // Once inside a repository, don't descend further
                if let Some(parent) = e.path().parent() {
                    if parent != base && backend.is_repository(parent) {
                        return false;
                    }
                }

                true
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    // Unreadable entries are skipped, not fatal.
                    debug!("Skipping unreadable entry: {}", err);
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            if self.backend.is_repository(entry.path()) {
                let path = entry.path().to_path_buf();
                let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
                let key = canonical.to_string_lossy().to_lowercase();
                if seen.insert(key) {
                    found.push(path);
                }
            }
        }
    }

    /// Run a scan and stream each discovery over the channel. Stops quietly
    /// when the receiver goes away.
    pub fn scan_background(&self, req: &ScanRequest, sender: Sender<ScanEvent>) -> Result<()> {
        let repos = match self.scan(req) {
            Ok(repos) => repos,
            Err(err) => {
                let _ = sender.send(ScanEvent::ScanError(err.to_string()));
                return Err(err);
            }
        };

        for repo in repos {
            if sender.send(ScanEvent::RepoDiscovered(repo)).is_err() {
                // Receiver dropped, stop
                return Ok(());
            }
        }
        let _ = sender.send(ScanEvent::ScanCompleted);
        Ok(())
    }
}

impl DiscoveryPort for WalkdirScanner {
    fn scan(&self, req: &ScanRequest) -> Result<Vec<RepoMeta>> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for root in &req.roots {
            if !root.is_dir() {
                debug!("Scan root {} is not a directory, skipping", root.display());
                continue;
            }
            self.scan_root(root, &req.options, &mut seen, &mut found);
        }
        info!(
            "Scan found {} repositories under {} roots",
            found.len(),
            req.roots.len()
        );

        // Repositories are independent; read their branches in parallel.
        let backend = &self.backend;
        let repos: Vec<RepoMeta> = found
            .par_iter()
            .map(|path| {
                let current_branch = backend
                    .open(path)
                    .ok()
                    .and_then(|repo| repo.current_branch().ok().flatten());
                RepoMeta::new(path, current_branch)
            })
            .collect();
        Ok(repos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::git::Git2Backend;
    use std::fs;
    use tempfile::TempDir;

    fn scanner() -> WalkdirScanner {
        WalkdirScanner::new(Arc::new(Git2Backend::new()))
    }

    fn fake_repo(path: &Path) {
        fs::create_dir_all(path.join(".git")).unwrap();
    }

    fn request(roots: Vec<PathBuf>) -> ScanRequest {
        ScanRequest {
            roots,
            options: ScanOptions::default(),
        }
    }

    #[test]
    fn empty_directory_finds_nothing() {
        let temp = TempDir::new().unwrap();
        let repos = scanner().scan(&request(vec![temp.path().to_path_buf()])).unwrap();
        assert!(repos.is_empty());
    }

    #[test]
    fn finds_repositories_and_names_them_by_directory() {
        let temp = TempDir::new().unwrap();
        fake_repo(&temp.path().join("alpha"));
        fake_repo(&temp.path().join("nested/beta"));

        let repos = scanner().scan(&request(vec![temp.path().to_path_buf()])).unwrap();
        let names: Vec<&str> = repos.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        // A bare .git marker is not openable, so no branch is reported.
        assert!(repos.iter().all(|r| r.current_branch.is_none()));
    }

    #[test]
    fn the_root_itself_can_be_a_repository() {
        let temp = TempDir::new().unwrap();
        fake_repo(temp.path());

        let repos = scanner().scan(&request(vec![temp.path().to_path_buf()])).unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].path, temp.path());
    }

    #[test]
    fn hidden_directories_are_skipped() {
        let temp = TempDir::new().unwrap();
        fake_repo(&temp.path().join(".cache/hidden-repo"));
        fake_repo(&temp.path().join("visible"));

        let repos = scanner().scan(&request(vec![temp.path().to_path_buf()])).unwrap();
        let names: Vec<&str> = repos.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["visible"]);
    }

    #[test]
    fn does_not_descend_into_discovered_repositories() {
        let temp = TempDir::new().unwrap();
        fake_repo(&temp.path().join("outer"));
        fake_repo(&temp.path().join("outer/vendor/inner"));

        let repos = scanner().scan(&request(vec![temp.path().to_path_buf()])).unwrap();
        let names: Vec<&str> = repos.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["outer"]);
    }

    #[test]
    fn max_depth_bounds_the_walk() {
        let temp = TempDir::new().unwrap();
        fake_repo(&temp.path().join("a/b/c/deep"));

        let mut req = request(vec![temp.path().to_path_buf()]);
        req.options.max_depth = 2;
        assert!(scanner().scan(&req).unwrap().is_empty());

        req.options.max_depth = 10;
        assert_eq!(scanner().scan(&req).unwrap().len(), 1);
    }

    #[test]
    fn entry_limit_caps_siblings_without_failing() {
        let temp = TempDir::new().unwrap();
        fake_repo(&temp.path().join("aaa"));
        fake_repo(&temp.path().join("bbb"));
        fake_repo(&temp.path().join("ccc"));

        let mut req = request(vec![temp.path().to_path_buf()]);
        req.options.entry_limit = Some(2);
        let repos = scanner().scan(&req).unwrap();
        // Entries come sorted, so the cap keeps the first two.
        let names: Vec<&str> = repos.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["aaa", "bbb"]);
    }

    #[test]
    fn duplicate_roots_report_each_repository_once() {
        let temp = TempDir::new().unwrap();
        fake_repo(&temp.path().join("solo"));

        let root = temp.path().to_path_buf();
        let repos = scanner().scan(&request(vec![root.clone(), root])).unwrap();
        assert_eq!(repos.len(), 1);
    }

    #[test]
    fn missing_roots_are_skipped() {
        let temp = TempDir::new().unwrap();
        fake_repo(&temp.path().join("real"));

        let repos = scanner()
            .scan(&request(vec![
                temp.path().join("does-not-exist"),
                temp.path().to_path_buf(),
            ]))
            .unwrap();
        assert_eq!(repos.len(), 1);
    }

    #[test]
    fn background_scan_streams_events_and_completes() {
        let temp = TempDir::new().unwrap();
        fake_repo(&temp.path().join("one"));
        fake_repo(&temp.path().join("two"));

        let (tx, rx) = crossbeam_channel::unbounded();
        let req = request(vec![temp.path().to_path_buf()]);
        let scanner = scanner();
        let handle = std::thread::spawn(move || scanner.scan_background(&req, tx));

        let mut discovered = Vec::new();
        let mut completed = false;
        while let Ok(event) = rx.recv_timeout(std::time::Duration::from_secs(5)) {
            match event {
                ScanEvent::RepoDiscovered(meta) => discovered.push(meta.name),
                ScanEvent::ScanCompleted => {
                    completed = true;
                    break;
                }
                ScanEvent::ScanError(err) => panic!("scan failed: {err}"),
            }
        }
        handle.join().unwrap().unwrap();

        assert!(completed);
        assert_eq!(discovered, vec!["one", "two"]);
    }
}
