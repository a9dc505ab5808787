pub mod vcs;
pub mod discovery;
pub mod persistence;

// Re-exports
pub use vcs::*;
pub use discovery::*;
pub use persistence::*;
