//! pedalsync: live cycling sessions from the command line.

mod backend;
mod cli;
mod commands;
mod config;
mod format;
mod script;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::{
    RunContext, SessionsArgs, cmd_config, cmd_profile, cmd_ride, cmd_sessions, cmd_summary,
};
use config::Config;
use format::FormatOptions;

// Single-threaded so ride replays can pause the clock.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Quiet mode suppresses info-level logging.
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(Config::path);
    let config = Config::load_from(&config_path);
    let database = config.database_path(cli.database.clone());
    tracing::debug!("Using database {}", database.display());

    let ctx = RunContext {
        opts: FormatOptions::new(cli.no_color || config.no_color),
        config,
        config_path,
        database,
        output: cli.output.clone(),
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Ride(args) => cmd_ride(args, &ctx).await,
        Commands::Sessions {
            user,
            limit,
            all,
            format,
        } => cmd_sessions(
            SessionsArgs {
                user: user.user,
                limit,
                all,
                format,
            },
            &ctx,
        ),
        Commands::Summary { user, format } => cmd_summary(user.user, format, &ctx).await,
        Commands::Profile { action } => cmd_profile(action, &ctx),
        Commands::Config { action } => cmd_config(action, &ctx),
    }
}
