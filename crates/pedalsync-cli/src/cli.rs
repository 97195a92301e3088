//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

/// Reusable rider selection arguments
#[derive(Debug, Clone, Args)]
pub struct UserArgs {
    /// Rider id, or use PEDALSYNC_USER env var (falls back to config)
    #[arg(short, long, env = "PEDALSYNC_USER")]
    pub user: Option<String>,
}

#[derive(Parser)]
#[command(name = "pedalsync")]
#[command(author, version, about = "Live cycling sessions from an indoor bike sensor", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write output to file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Disable colored output (any non-empty NO_COLOR value other than 0/false counts)
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "PEDALSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database file to use instead of the configured one
    #[arg(long, global = true, env = "PEDALSYNC_DB")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a recorded or simulated ride through a live session
    Ride(RideArgs),

    /// List finished sessions
    Sessions {
        #[command(flatten)]
        user: UserArgs,

        /// Maximum number of sessions to show (0 for all)
        #[arg(short = 'n', long, default_value = "20")]
        limit: u32,

        /// Include sessions that never covered any distance
        #[arg(long)]
        all: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Totals across finished sessions
    Summary {
        #[command(flatten)]
        user: UserArgs,

        /// Output format (csv is not supported)
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show or set the rider's body weight
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Where the readings of a ride come from and how they are replayed.
#[derive(Debug, Clone, Args)]
pub struct RideArgs {
    /// CSV or JSON file of readings (speed, distance, cycles[, rpm][, delay_ms])
    #[arg(short, long, conflicts_with = "simulate", required_unless_present = "simulate")]
    pub script: Option<PathBuf>,

    /// Generate a synthetic ride of this many minutes
    #[arg(long, value_name = "MINUTES")]
    pub simulate: Option<u64>,

    #[command(flatten)]
    pub user: UserArgs,

    /// Body weight in kg for this ride (overrides the stored profile)
    #[arg(short, long)]
    pub weight: Option<f64>,

    /// Delay between readings in milliseconds when the script has none
    #[arg(long, default_value = "1000")]
    pub pace_ms: u64,

    /// Seconds between backend syncs (overrides config)
    #[arg(long)]
    pub sync_secs: Option<u64>,

    /// Replay at wall-clock speed instead of as fast as possible
    #[arg(long)]
    pub realtime: bool,

    /// Output format for the final record
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Profile subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum ProfileAction {
    /// Show the stored weight
    Show {
        #[command(flatten)]
        user: UserArgs,
    },

    /// Store a new weight
    SetWeight {
        /// Body weight in kg
        weight: f64,

        #[command(flatten)]
        user: UserArgs,
    },
}

/// Config subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
