//! Gitkeel Core - Session engine logic with no external dependencies
//!
//! This crate contains the domain types, ports (interfaces) and the session,
//! history and cherry-pick engines for gitkeel. It has no dependencies on Git
//! libraries or filesystem operations - those are handled by adapters.

pub mod domain;
pub mod ports;
pub mod engine;
pub mod error;

// Re-exports for ergonomics
pub use domain::*;
pub use error::*;
