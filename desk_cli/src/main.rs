#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `deskctl`: run the desk controller, drive it once, or check its parts.

mod cli;
mod commands;
mod error_fmt;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use desk_core::error::DeskError;
use eyre::Result;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> Result<()> {
    let _ = color_eyre::install();

    let cfg = desk_config::load_file(&cli.config)
        .map_err(|e| eyre::Report::new(DeskError::Config(format!("{e:#}"))))?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging);
    tracing::debug!(config = ?cli.config, "config loaded");

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let s = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || s.store(true, Ordering::Relaxed)) {
            tracing::warn!(error = %e, "could not install Ctrl-C handler");
        }
    }

    match cli.cmd {
        Commands::Run { duration_s } => commands::run(&cfg, duration_s, cli.json, shutdown),
        Commands::Goto { percent, timeout_s } => {
            let out = commands::goto(&cfg, percent, timeout_s, &shutdown)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "requested": out.requested,
                        "percent": out.percent,
                        "raw": out.raw,
                        "moved": out.moved,
                    })
                );
            } else if out.moved {
                println!("desk at {}% (raw {})", out.percent, out.raw);
            } else {
                println!("desk already at {}% (raw {})", out.percent, out.raw);
            }
            Ok(())
        }
        Commands::SelfCheck => {
            let report = commands::self_check(&cfg)?;
            if cli.json {
                println!("{}", report.to_json());
            } else {
                println!("encoder: OK ({} deg)", report.angle);
                match report.stored {
                    Some(p) => println!("store: OK (position {p})"),
                    None => println!("store: OK (empty)"),
                }
                if let Some(line) = report.magnet_line() {
                    println!("{line}");
                }
            }
            Ok(())
        }
    }
}

/// Console layer on stderr plus an optional JSON file layer.
///
/// `RUST_LOG` overrides `--log-level` for the console; the file layer uses
/// `[logging].level` (default info).
fn init_tracing(json: bool, level: &str, logging: &desk_config::Logging) {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(console_filter)
            .boxed()
    };

    let file = logging.file.as_deref().map(|path| {
        let path = std::path::Path::new(path);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "desk.log".into(), |n| n.to_string_lossy().into_owned());
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let file_filter = EnvFilter::new(logging.level.as_deref().unwrap_or("info"));
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(file_filter)
    });

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init();
}
