//! End-to-end tests driving the binary against real git workspaces.

#![cfg(unix)]

mod build_tests;
mod cache_tests;
mod changes_tests;
mod common;
