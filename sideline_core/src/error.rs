use thiserror::Error;

/// Failure taxonomy for the assessment engine.
///
/// None of these end a session: every variant is resolved by the component
/// that detected it (logged, dropped, or scored) and the session carries on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssessError {
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),
    #[error("speech was not recognized with enough confidence")]
    RecognitionFailure,
    #[error("transcript did not resolve to a command")]
    AmbiguousCommand,
    #[error("pose tracking unavailable")]
    SensorUnavailable,
    #[error("response window elapsed")]
    Timeout,
    #[error("retention gate still closed for {remaining_ms} ms")]
    RetentionGate { remaining_ms: u64 },
    #[error("module result already finalized")]
    AlreadyFinalized,
    #[error("configuration error: {0}")]
    Config(String),
}

impl AssessError {
    pub fn transition(msg: impl Into<String>) -> Self {
        AssessError::InvalidStateTransition(msg.into())
    }
}

/// Raised by `SessionDriverBuilder::try_build` before any session exists.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
