//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use sideline_core::SessionKind;
use sideline_core::scoring::OrientationItem;
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(
    name = "sideline",
    version,
    about = "Voice-driven concussion assessment sessions"
)]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/sideline.toml")]
    pub config: PathBuf,

    /// Optional vocabulary alias CSV (strict header: module,command,alias)
    #[arg(long, value_name = "FILE")]
    pub vocabulary: Option<PathBuf>,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum KindArg {
    Baseline,
    Concussion,
    PostExercise,
}

impl From<KindArg> for SessionKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Baseline => SessionKind::Baseline,
            KindArg::Concussion => SessionKind::Concussion,
            KindArg::PostExercise => SessionKind::PostExercise,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ItemArg {
    Month,
    Date,
    Weekday,
    Year,
    Time,
}

impl From<ItemArg> for OrientationItem {
    fn from(i: ItemArg) -> Self {
        match i {
            ItemArg::Month => OrientationItem::Month,
            ItemArg::Date => OrientationItem::Date,
            ItemArg::Weekday => OrientationItem::Weekday,
            ItemArg::Year => OrientationItem::Year,
            ItemArg::Time => OrientationItem::Time,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ScoreCmd {
    /// Score one reverse digit trial
    Digits {
        /// Presented digits, e.g. "7-2-4" or "724"
        #[arg(long)]
        presented: String,
        /// Spoken response, e.g. "four two seven"
        #[arg(long)]
        response: String,
    },
    /// Score one free-recall trial against a word list
    Recall {
        /// Comma-separated target words (defaults to the first configured list)
        #[arg(long, value_delimiter = ',')]
        words: Vec<String>,
        #[arg(long)]
        response: String,
    },
    /// Score a months-in-reverse recitation
    Months {
        #[arg(long)]
        response: String,
    },
    /// Check one orientation answer against a reference time
    Orientation {
        #[arg(long, value_enum)]
        item: ItemArg,
        #[arg(long)]
        response: String,
        /// Reference local time, `YYYY-MM-DDTHH:MM:SS` (defaults to now)
        #[arg(long, value_name = "DATETIME")]
        at: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load and validate the config, then print the session orders
    CheckConfig,
    /// Score a single response without running a session
    Score {
        #[command(subcommand)]
        what: ScoreCmd,
    },
    /// Replay a JSONL input script against a simulated clock
    Replay {
        /// Script file, one JSON object per line
        #[arg(long, value_name = "FILE")]
        script: PathBuf,
        #[arg(long, value_enum, default_value = "concussion")]
        kind: KindArg,
        /// Wall-clock time at script start, `YYYY-MM-DDTHH:MM:SS` (defaults to now)
        #[arg(long, value_name = "DATETIME")]
        anchor: Option<String>,
        /// Resume from a previously saved session
        #[arg(long, value_name = "FILE")]
        restore: Option<PathBuf>,
        /// Write the final session as JSON
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,
    },
    /// Run a live session: transcripts on stdin, simulated pose tracking
    Run {
        #[arg(long, value_enum, default_value = "concussion")]
        kind: KindArg,
        /// Resume from a previously saved session
        #[arg(long, value_name = "FILE")]
        restore: Option<PathBuf>,
        /// Write the final session as JSON
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,
        /// Read pose in event mode instead of pacing at sampler.sample_rate_hz
        #[arg(long, action = ArgAction::SetTrue)]
        event: bool,
    },
}
