pub mod repo;
pub mod commit;
pub mod diff;
pub mod history;
pub mod cherry;

// Re-exports for convenience
pub use repo::*;
pub use commit::*;
pub use diff::*;
pub use history::*;
pub use cherry::*;
