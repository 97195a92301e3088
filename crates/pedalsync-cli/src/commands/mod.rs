//! Command implementations for the CLI.

use std::path::PathBuf;

use crate::config::Config;
use crate::format::FormatOptions;

mod config;
mod profile;
mod ride;
mod sessions;
mod summary;

pub use config::cmd_config;
pub use profile::cmd_profile;
pub use ride::cmd_ride;
pub use sessions::{SessionsArgs, cmd_sessions};
pub use summary::cmd_summary;

/// Settings shared by every command, resolved from flags and the config file.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: Config,
    pub config_path: PathBuf,
    pub database: PathBuf,
    pub output: Option<PathBuf>,
    pub quiet: bool,
    pub opts: FormatOptions,
}

impl RunContext {
    /// Resolve the rider id for a command.
    pub fn user(&self, user: Option<String>) -> String {
        crate::config::resolve_user(user, &self.config)
    }
}
