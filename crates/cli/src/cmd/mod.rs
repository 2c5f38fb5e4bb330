mod build;
mod cache;
mod changes;
mod enable;
mod status;

pub use build::cmd_build;
pub use cache::{cmd_cache_list, cmd_cache_refresh};
pub use changes::cmd_changes;
pub use enable::cmd_enable;
pub use status::cmd_status;
