//! Fixed names shared across the crate.

/// Workspace-relative directory holding all tool state. Always ignored by walks.
pub const STATE_DIR: &str = ".rebuild";

/// Fingerprint cache directory inside [`STATE_DIR`]. Its existence enables fingerprint mode.
pub const FINGERPRINTS_DIR: &str = "fingerprints";

/// Patch mode marker file inside [`STATE_DIR`].
pub const PATCH_MARKER: &str = "patch-enabled";

/// Optional workspace configuration file at the workspace root.
pub const CONFIG_FILENAME: &str = "rebuild.json";

pub const PROFILE_ENV: &str = "REBUILD_PROFILE";
pub const OWNER_ENV: &str = "REBUILD_OWNER";

pub const DEFAULT_PROFILE: &str = "Developer";
