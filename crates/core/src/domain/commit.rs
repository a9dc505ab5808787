use serde::{Deserialize, Serialize};

/// A single commit in a repository's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// Full hex object id.
    pub id: String,
    /// Complete commit message, subject and body.
    pub message: String,
    pub author: Author,
    pub timestamp: Timestamp,
    /// Names of local branches whose tip is this commit.
    pub branch_refs: Vec<String>,
}

impl Commit {
    pub fn short_id(&self) -> &str {
        let len = self.id.len().min(7);
        &self.id[..len]
    }

    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

/// Commit author identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
}

/// Seconds since the epoch plus the author's UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub offset_minutes: i32,
}

impl Timestamp {
    pub fn new(seconds: i64, offset_minutes: i32) -> Self {
        Self {
            seconds,
            offset_minutes,
        }
    }
}

impl std::fmt::Display for Timestamp {
    /// Raw seconds; frontends that want human dates format these themselves.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.seconds)
    }
}
