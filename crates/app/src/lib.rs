//! Gitkeel application library
//!
//! Adapters over git2 and the filesystem plus the CLI surface. Engine logic
//! lives in gitkeel-core; this crate wires it to the outside world.

pub mod adapters;
pub mod cli;
