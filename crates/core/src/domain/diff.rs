use serde::{Deserialize, Serialize};

/// Per-file slice of a commit's patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffFile {
    /// Post-image path, taken from the `b/` side of the file header.
    pub filename: String,
    pub additions: usize,
    pub deletions: usize,
    /// Verbatim patch text for this file, header lines included.
    pub patch: String,
}

/// Structured summary of one commit's textual patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitDiff {
    pub files: Vec<DiffFile>,
    pub total_additions: usize,
    pub total_deletions: usize,
}

/// Splits a raw patch into per-file entries and counts changed lines.
///
/// A `diff --git` line starts a new file. Lines are only counted once a hunk
/// header (`@@`) has been seen for the current file, so mode changes and
/// similarity preambles never contribute counts. `+++`/`---` file header
/// lines are excluded by their exact prefix.
pub fn summarize_patch(patch: &str) -> CommitDiff {
    let mut diff = CommitDiff::default();
    let mut current: Option<DiffFile> = None;
    let mut in_hunk = false;

    for line in patch.lines() {
        if let Some(header) = line.strip_prefix("diff --git ") {
            if let Some(file) = current.take() {
                diff.files.push(file);
            }
            current = Some(DiffFile {
                filename: filename_from_header(header),
                additions: 0,
                deletions: 0,
                patch: String::new(),
            });
            in_hunk = false;
        }

        let file = match current.as_mut() {
            Some(file) => file,
            None => continue,
        };

        if line.starts_with("@@") {
            in_hunk = true;
        } else if in_hunk {
            if line.starts_with('+') && !line.starts_with("+++") {
                file.additions += 1;
                diff.total_additions += 1;
            } else if line.starts_with('-') && !line.starts_with("---") {
                file.deletions += 1;
                diff.total_deletions += 1;
            }
        }

        file.patch.push_str(line);
        file.patch.push('\n');
    }

    if let Some(file) = current.take() {
        diff.files.push(file);
    }
    diff
}

/// Pulls the new-side path out of `a/<old> b/<new>`.
fn filename_from_header(header: &str) -> String {
    match header.rfind(" b/") {
        Some(at) => header[at + 3..].to_string(),
        None => header.to_string(),
    }
}
