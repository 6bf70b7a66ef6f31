//! `sideline` command-line entry point.

mod cli;
mod error_fmt;
mod replay;
mod run;
mod score;

use std::fs;
use std::path::Path;

use clap::Parser;
use eyre::WrapErr;
use sideline_core::{AssessCfg, SessionKind};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporter: {e}");
    }

    if let Err(err) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli.config, cli.vocabulary.as_deref())?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging);
    tracing::debug!(config = %cli.config.display(), "config loaded");
    let assess = AssessCfg::from(&cfg);

    match cli.cmd {
        Commands::CheckConfig => check_config(&assess, cli.json),
        Commands::Score { what } => score::run_score(&assess, what, cli.json),
        Commands::Replay {
            script,
            kind,
            anchor,
            restore,
            save,
        } => replay::run_replay(
            assess,
            &replay::ReplayArgs {
                script: &script,
                kind: kind.into(),
                anchor: anchor.as_deref(),
                restore: restore.as_deref(),
                save: save.as_deref(),
            },
        ),
        Commands::Run {
            kind,
            restore,
            save,
            event,
        } => run::run_live(
            assess,
            kind.into(),
            restore.as_deref(),
            save.as_deref(),
            event,
        ),
    }
}

fn load_config(path: &Path, vocabulary: Option<&Path>) -> eyre::Result<sideline_config::Config> {
    let text = fs::read_to_string(path)
        .wrap_err_with(|| format!("read config file {}", path.display()))?;
    let mut cfg: sideline_config::Config =
        toml::from_str(&text).wrap_err("parse config TOML")?;
    if let Some(csv) = vocabulary {
        let rows = sideline_config::load_vocabulary_csv(csv)?;
        tracing::debug!(rows = rows.len(), "vocabulary aliases loaded");
        cfg.vocabulary.apply_rows(&rows);
    }
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

fn init_tracing(json: bool, level: &str, logging: &sideline_config::Logging) {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    // stdout carries command output; logs go to stderr
    if json {
        layers.push(
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_filter(console_filter)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(console_filter)
                .boxed(),
        );
    }

    if let Some(file) = logging.file.as_deref() {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "sideline.log".into(), std::ffi::OsStr::to_os_string);
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let file_filter = EnvFilter::new(logging.level.as_deref().unwrap_or("info"));
        layers.push(
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(file_filter)
                .boxed(),
        );
    }

    if tracing_subscriber::registry().with(layers).try_init().is_err() {
        eprintln!("tracing subscriber already installed");
    }
}

fn check_config(cfg: &AssessCfg, json: bool) -> eyre::Result<()> {
    let kinds = [
        SessionKind::Baseline,
        SessionKind::Concussion,
        SessionKind::PostExercise,
    ];
    if json {
        let orders: serde_json::Map<String, serde_json::Value> = kinds
            .iter()
            .map(|k| {
                let modules = cfg
                    .orders
                    .for_kind(*k)
                    .iter()
                    .map(|m| serde_json::Value::from(m.as_str()))
                    .collect();
                (k.as_str().to_string(), serde_json::Value::Array(modules))
            })
            .collect();
        println!("{}", serde_json::json!({ "status": "ok", "orders": orders }));
    } else {
        println!("config ok");
        for k in kinds {
            let names: Vec<&str> = cfg.orders.for_kind(k).iter().map(|m| m.as_str()).collect();
            println!("  {:<14} {}", k.as_str(), names.join(" -> "));
        }
    }
    Ok(())
}
