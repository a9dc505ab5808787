pub mod git;
pub mod discovery;
pub mod persistence;

// Re-exports
pub use git::Git2Backend;
pub use discovery::{ScanEvent, WalkdirScanner};
pub use persistence::TomlConfigStore;
