//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "deskctl", version, about = "Motorized desk controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/desk_config.toml")]
    pub config: PathBuf,

    /// Log and report as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the desk; reads `topic payload` lines from stdin and prints every publish
    Run {
        /// Stop after this many seconds (default: until Ctrl-C)
        #[arg(long, value_name = "SECS")]
        duration_s: Option<u64>,
    },
    /// Drive to a height percentage and exit once the move completes
    Goto {
        /// Target height in percent
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        percent: u8,
        /// Give up if the move has not completed after this many seconds
        #[arg(long, value_name = "SECS", default_value_t = 120)]
        timeout_s: u64,
    },
    /// Quick health check: one encoder read and one store load
    SelfCheck,
}
