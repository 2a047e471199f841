//! CLI subcommand implementations.

mod apply;
mod config_cmd;
mod create;
mod validate;

pub use apply::run_apply;
pub use config_cmd::run_config;
pub use create::run_create;
pub use validate::run_validate;
