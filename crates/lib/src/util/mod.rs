//! Shared utilities.
//!
//! Workspace path normalization, streaming hashing helpers and test helpers.

pub mod hash;
pub mod path;


pub use path::WorkspacePath;
