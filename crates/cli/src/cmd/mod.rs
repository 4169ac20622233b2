mod build;
mod clean;
mod status;

pub use build::cmd_build;
pub use clean::cmd_clean;
pub use status::cmd_status;
