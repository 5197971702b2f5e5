//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::DrainPolicy;
use std::path::PathBuf;

/// muxd - multiplex byte streams through one bounded ring buffer
#[derive(Parser, Debug)]
#[command(
    name = "muxd",
    author,
    version,
    about = "Bounded ring-buffer multiplexing daemon",
    long_about = "Reads byte streams from several sources, multiplexes them through one \n\
                  bounded shared ring buffer, then filters and routes every frame to \n\
                  the sink of its destination."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "MUXD_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "MUXD_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the daemon until the drain window closes
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Compare two files byte for byte
    Compare(CompareArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "muxd.toml", env = "MUXD_CONFIG")]
    pub config: PathBuf,

    /// Override the number of dispatcher workers
    #[arg(long, env = "MUXD_WORKERS")]
    pub workers: Option<usize>,

    /// Override the ring buffer capacity in bytes
    #[arg(long, env = "MUXD_CAPACITY")]
    pub capacity: Option<usize>,

    /// Override the drain window in milliseconds
    #[arg(long, env = "MUXD_DRAIN_WINDOW_MS")]
    pub drain_window_ms: Option<u64>,

    /// Override the drain policy
    #[arg(long, value_enum, env = "MUXD_DRAIN_POLICY")]
    pub drain_policy: Option<DrainPolicyArg>,

    /// Override the sink output directory
    #[arg(short, long, env = "MUXD_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Disable producer and dispatcher jitter
    #[arg(long)]
    pub no_pacing: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "MUXD_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "muxd.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "muxd.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show every connection
    #[arg(long)]
    pub connections: bool,
}

/// Arguments for the `compare` command
#[derive(Parser, Debug)]
pub struct CompareArgs {
    /// First file
    pub left: PathBuf,

    /// Second file
    pub right: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

/// Drain policy as accepted on the command line
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum DrainPolicyArg {
    /// Wait out the whole drain window
    FixedWindow,
    /// Stop once producers are done and the buffer is empty
    UntilIdle,
}

impl From<DrainPolicyArg> for DrainPolicy {
    fn from(arg: DrainPolicyArg) -> Self {
        match arg {
            DrainPolicyArg::FixedWindow => DrainPolicy::FixedWindow,
            DrainPolicyArg::UntilIdle => DrainPolicy::UntilIdle,
        }
    }
}
