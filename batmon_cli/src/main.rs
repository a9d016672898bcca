mod cli;
mod error_fmt;
mod monitor;
mod report;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use batmon_core::error::BatmonError;
use clap::Parser;
use eyre::{Result, WrapErr};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::monitor::RunOpts;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        tracing::debug!(error = ?err, "exiting with error");
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> Result<()> {
    color_eyre::install()?;

    let cfg = match cli.config.as_deref() {
        Some(path) => batmon_config::load_file(path)
            .map_err(|e| eyre::Report::new(BatmonError::Config(format!("{e:#}"))))?,
        None => batmon_config::Config::default(),
    };
    let level = cli
        .log_level
        .as_deref()
        .or(cfg.logging.level.as_deref())
        .unwrap_or("info");
    init_tracing(cli.json, level, &cfg.logging)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
            tracing::warn!(error = %e, "failed to install signal handler");
        }
    }

    match cli.cmd {
        Commands::Run {
            once,
            ticks,
            debug,
            period_ms,
            status_file,
            calibration_file,
        } => {
            let opts = RunOpts {
                once,
                ticks,
                debug,
                period_ms,
                status_file,
                calibration_file,
            };
            let summary = monitor::run_monitor(&cfg, &opts, cli.json, &shutdown)?;
            tracing::info!(
                ticks = summary.ticks,
                skipped = summary.skipped_reads,
                failed_writes = summary.failed_writes,
                "run finished"
            );
        }
        Commands::SelfCheck => monitor::self_check(&cfg, cli.json)?,
        Commands::Calibration { file } => {
            monitor::show_calibration(&cfg, file.as_deref(), cli.json)?;
        }
        Commands::Inspect { path } => monitor::inspect(&path, cli.json)?,
    }
    Ok(())
}

/// Console logs go to stderr so stdout stays clean for state lines. With
/// `[logging].file` set, JSON lines are also written there via a
/// non-blocking appender.
fn init_tracing(json: bool, level: &str, logging: &batmon_config::Logging) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(level).map_err(|e| {
            eyre::Report::new(BatmonError::Config(format!("log level {level:?}: {e}")))
        })?,
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if json {
        layers.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
    } else {
        layers.push(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .boxed(),
        );
    }

    if let Some(path) = logging.file.as_deref() {
        let path = Path::new(path);
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| {
                eyre::Report::new(BatmonError::Config(format!(
                    "logging.file {path:?} has no file name"
                )))
            })?;
        std::fs::create_dir_all(dir).wrap_err_with(|| format!("create log dir {dir:?}"))?;
        let appender = match logging.rotation.as_deref().unwrap_or("never") {
            "daily" => tracing_appender::rolling::daily(dir, name),
            "hourly" => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
    }

    // A second init (tests driving main twice) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init();
    Ok(())
}
