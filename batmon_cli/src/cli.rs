//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "batmon", version, about = "INA219 battery monitor")]
pub struct Cli {
    /// Path to config TOML; built-in defaults are used when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log as JSON lines and print one JSON state line per tick
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Log level (error|warn|info|debug|trace); overrides `[logging].level`,
    /// RUST_LOG takes precedence over both
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sample the sensor periodically and publish the battery state
    Run {
        /// Produce a single tick and exit
        #[arg(long, action = ArgAction::SetTrue, conflicts_with = "ticks")]
        once: bool,
        /// Stop after N read attempts
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
        /// Print a human-readable diagnostic block per tick
        #[arg(long, action = ArgAction::SetTrue)]
        debug: bool,
        /// Override sampling.period_ms
        #[arg(long, value_name = "MS")]
        period_ms: Option<u64>,
        /// Override status.file (must already exist)
        #[arg(long, value_name = "PATH")]
        status_file: Option<PathBuf>,
        /// Override calibration.file
        #[arg(long, value_name = "PATH")]
        calibration_file: Option<PathBuf>,
    },
    /// Configure the sensor and decode one sample
    SelfCheck,
    /// Print the persisted calibration state (or the defaults)
    Calibration {
        /// Override calibration.file
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
    },
    /// Parse a status block and print what the power-supply class would report
    Inspect {
        /// File holding a rendered status block
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn once_and_ticks_conflict() {
        let err = Cli::try_parse_from(["batmon", "run", "--once", "--ticks", "3"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn config_is_optional() {
        let cli = Cli::try_parse_from(["batmon", "self-check"]).unwrap();
        assert!(cli.config.is_none());
        assert!(cli.log_level.is_none());
        assert!(matches!(cli.cmd, Commands::SelfCheck));
    }
}
