//! rebuild-lib: change detection and cache invalidation for multi-project trees.
//!
//! Decides which build units need recompiling for a set of changed inputs:
//! - `changes`: the ChangeSet, from `git status` or a full tree walk
//! - `resolve`: nearest-ancestor ownership of changed files
//! - `fingerprint` / `cache`: content digests persisted per unit
//! - `env`: fresh-environment detection and on-disk capability markers
//! - `schedule`: the orchestrator, wrapped in a guaranteed `post` cleanup

pub mod cache;
pub mod changes;
pub mod config;
pub mod consts;
pub mod env;
pub mod execute;
pub mod fingerprint;
pub mod patch;
pub mod post;
pub mod resolve;
pub mod schedule;
pub mod util;
