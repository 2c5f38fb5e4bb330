//! Library-level tests against real git workspaces.

#![cfg(unix)]

mod workflow_tests;
