#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Sideline concussion-assessment engine (device-agnostic).
//!
//! Pose data comes in through `sideline_traits::PoseSource`, speech as
//! `TranscriptEvent`s from whatever recognizer the host runs, and time through
//! an injected `sideline_traits::Clock`.
//!
//! ## Architecture
//!
//! - **Scoring** (`scoring`): pure scoring of recall, digit span, months,
//!   orientation and balance errors
//! - **Metrics** (`metrics`): sway, head motion and focus from pose samples
//! - **Modules** (`modules`): one state machine per assessment module
//! - **Voice** (`voice`): transcript normalization, vocabularies and the
//!   single-slot command router
//! - **Session** (`session`): required modules, completion bookkeeping,
//!   resume and progress notifications
//! - **Driver** (`driver`, `runtime`): ties the above together, either
//!   called directly or on a worker thread with a pose sampler

pub mod builder;
pub mod config;
pub mod conversions;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod mocks;
pub mod modules;
pub mod runtime;
pub mod sampler;
pub mod scoring;
pub mod session;
pub mod status;
pub mod timer;
pub mod util;
pub mod voice;

pub use builder::SessionDriverBuilder;
pub use config::AssessCfg;
pub use driver::{DriverEvent, SessionDriver};
pub use error::{AssessError, BuildError, Result};
pub use metrics::{LiveMetrics, SensorMetricsProcessor};
pub use modules::{ModuleId, ModuleResult};
pub use runtime::{Inbound, RuntimeEvent, SamplingMode, SessionRuntime};
pub use scoring::ScoringEngine;
pub use session::{Session, SessionKind, SessionOrchestrator};
pub use status::ModuleStatus;
pub use voice::{DispatchOutcome, TranscriptEvent, VoiceCommand, VoiceCommandRouter};
