// Composition root: wires the git2, walkdir and TOML adapters to the core
// session engine and dispatches CLI commands.

use anyhow::Result;
use clap::Parser;
use crossbeam_channel::unbounded;
use gitkeel::adapters::{Git2Backend, ScanEvent, TomlConfigStore, WalkdirScanner};
use gitkeel::cli::{Cli, Command};
use gitkeel_core::domain::{
    CherryPickRequest, CherryPickResult, HistoryEntry, HistoryQuery, RepoStatus,
};
use gitkeel_core::engine::SessionService;
use gitkeel_core::error::EngineError;
use gitkeel_core::ports::{ConfigStore, ScanRequest, VcsBackend};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("Command failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let Cli {
        repo,
        config,
        command,
    } = cli;
    let backend: Arc<dyn VcsBackend> = Arc::new(Git2Backend::new());

    match command {
        Command::Scan { roots } => scan(backend, config, roots),
        Command::Init { path } => {
            let service = SessionService::new(backend);
            let meta = service.init(&path)?;
            println!("Initialized empty repository at {}", meta.path.display());
            Ok(())
        }
        Command::Status => {
            let service = open_session(backend, &repo)?;
            print_status(&service.status());
            Ok(())
        }
        Command::Branches => {
            let service = open_session(backend, &repo)?;
            let current = service
                .current_repository()
                .and_then(|snapshot| snapshot.meta.current_branch);
            for name in service.branches() {
                if Some(name.as_str()) == current.as_deref() {
                    println!("* {}", name);
                } else {
                    println!("  {}", name);
                }
            }
            Ok(())
        }
        Command::Log {
            limit,
            skip,
            grep,
            diffs,
        } => {
            let service = open_session(backend, &repo)?;
            let entries = service.history(&HistoryQuery {
                limit,
                skip,
                message_filter: grep,
                include_diffs: diffs,
            })?;
            print_history(&entries);
            Ok(())
        }
        Command::Add { paths } => {
            let service = open_session(backend, &repo)?;
            service.add_files(&paths)?;
            println!("Staged {} path(s)", paths.len());
            Ok(())
        }
        Command::Commit { message } => {
            let service = open_session(backend, &repo)?;
            let id = service.commit(&message)?;
            println!("Created commit {}", id);
            Ok(())
        }
        Command::Branch { name } => {
            let service = open_session(backend, &repo)?;
            service.create_branch(&name)?;
            println!("Created branch {}", name);
            Ok(())
        }
        Command::Checkout { name } => {
            let service = open_session(backend, &repo)?;
            service.checkout_branch(&name)?;
            println!("Switched to branch {}", name);
            Ok(())
        }
        Command::Merge { source } => {
            let service = open_session(backend, &repo)?;
            match service.merge_branch(&source) {
                Ok(()) => {
                    println!("Merged branch {}", source);
                    Ok(())
                }
                Err(EngineError::MergeConflict { branch, conflicts }) => {
                    eprintln!("Merge of '{}' hit conflicts in:", branch);
                    for path in &conflicts {
                        eprintln!("  {}", path);
                    }
                    eprintln!("Resolve the conflicts and commit the result.");
                    std::process::exit(1);
                }
                Err(err) => Err(err.into()),
            }
        }
        Command::Rebase { target } => {
            let service = open_session(backend, &repo)?;
            match service.rebase_branch(&target) {
                Ok(()) => {
                    println!("Rebased onto {}", target);
                    Ok(())
                }
                Err(EngineError::RebaseConflict { branch, conflicts }) => {
                    eprintln!("Rebase onto '{}' hit conflicts in:", branch);
                    for path in &conflicts {
                        eprintln!("  {}", path);
                    }
                    eprintln!("Resolve the conflicts to continue the rebase.");
                    std::process::exit(1);
                }
                Err(err) => Err(err.into()),
            }
        }
        Command::CherryPick {
            commits,
            onto,
            no_commit,
            squash,
        } => {
            let service = open_session(backend, &repo)?;
            let request = CherryPickRequest {
                target_branch: onto,
                commits,
                no_commit,
                squash,
            };
            let result = service.cherry_pick(&request)?;
            print_cherry(&result);
            if !result.success {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn open_session(backend: Arc<dyn VcsBackend>, path: &Path) -> Result<SessionService> {
    let service = SessionService::new(backend);
    let meta = service.open(path)?;
    info!("Operating on {}", meta);
    Ok(service)
}

/// Stream discoveries as they arrive instead of waiting for the full scan.
fn scan(
    backend: Arc<dyn VcsBackend>,
    config_path: Option<PathBuf>,
    roots: Vec<PathBuf>,
) -> Result<()> {
    let store = match config_path {
        Some(path) => TomlConfigStore::with_path(path),
        None => TomlConfigStore::new()?,
    };
    let config = store.load()?;

    let roots = if roots.is_empty() { config.scan_roots } else { roots };
    if roots.is_empty() {
        println!("No scan roots given; pass directories or set scan_roots in the config.");
        return Ok(());
    }

    let request = ScanRequest {
        roots,
        options: config.scan,
    };
    let scanner = WalkdirScanner::new(backend);
    let (tx, rx) = unbounded();
    let handle = std::thread::spawn(move || scanner.scan_background(&request, tx));

    let mut count = 0usize;
    for event in rx {
        match event {
            ScanEvent::RepoDiscovered(meta) => {
                count += 1;
                match &meta.current_branch {
                    Some(branch) => println!("{}  [{}]", meta.path.display(), branch),
                    None => println!("{}", meta.path.display()),
                }
            }
            ScanEvent::ScanCompleted => break,
            // The scan thread's own error propagates through the join below.
            ScanEvent::ScanError(_) => break,
        }
    }

    match handle.join() {
        Ok(result) => result?,
        Err(_) => anyhow::bail!("scan thread panicked"),
    }
    println!("{} repositories found", count);
    Ok(())
}

fn print_status(status: &RepoStatus) {
    if status.is_clean() {
        println!("Working tree clean");
        return;
    }
    for path in &status.staged {
        println!("staged:    {}", path);
    }
    for path in &status.unstaged {
        println!("unstaged:  {}", path);
    }
    for path in &status.untracked {
        println!("untracked: {}", path);
    }
}

fn print_history(entries: &[HistoryEntry]) {
    for entry in entries {
        let commit = &entry.commit;
        if commit.branch_refs.is_empty() {
            println!("{} {}", commit.short_id(), commit.summary());
        } else {
            println!(
                "{} ({}) {}",
                commit.short_id(),
                commit.branch_refs.join(", "),
                commit.summary()
            );
        }
        println!(
            "        {} <{}> {}",
            commit.author.name, commit.author.email, commit.timestamp
        );
        if let Some(diff) = &entry.diff {
            for file in &diff.files {
                println!(
                    "        +{:<4} -{:<4} {}",
                    file.additions, file.deletions, file.filename
                );
            }
            println!(
                "        {} additions, {} deletions",
                diff.total_additions, diff.total_deletions
            );
        }
    }
}

fn print_cherry(result: &CherryPickResult) {
    if result.success {
        println!("Applied {} commit(s)", result.applied_commits.len());
    } else {
        if let Some(message) = &result.error_message {
            eprintln!("Cherry-pick failed: {}", message);
        }
        if !result.conflicts.is_empty() {
            eprintln!("Conflicting files:");
            for path in &result.conflicts {
                eprintln!("  {}", path);
            }
        }
        if !result.applied_commits.is_empty() {
            eprintln!(
                "Applied before the failure: {}",
                result.applied_commits.join(", ")
            );
        }
    }
    if let Some(restore) = &result.restore_error {
        eprintln!("Warning: could not switch back to the original branch: {}", restore);
    }
}
