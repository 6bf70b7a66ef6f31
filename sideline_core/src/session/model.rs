use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::{ModuleId, ModuleResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Baseline,
    Concussion,
    PostExercise,
}

impl SessionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionKind::Baseline => "baseline",
            SessionKind::Concussion => "concussion",
            SessionKind::PostExercise => "post_exercise",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "baseline" => Ok(SessionKind::Baseline),
            "concussion" => Ok(SessionKind::Concussion),
            "post_exercise" => Ok(SessionKind::PostExercise),
            other => Err(format!(
                "unknown session kind '{other}' (expected baseline, concussion or post_exercise)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionStatus {
    NotStarted,
    InProgress { current_index: usize },
    Completed,
    Abandoned,
}

/// One assessment session and everything recorded in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub kind: SessionKind,
    /// Modules to run, in canonical order.
    pub required: Vec<ModuleId>,
    /// Completed modules, in completion order.
    pub completed: Vec<ModuleId>,
    pub skipped: Vec<ModuleId>,
    pub results: Vec<ModuleResult>,
    /// Word list used by both recall modules.
    pub word_list: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub status: SessionStatus,
}

/// Completion counts for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionProgress {
    pub completed: usize,
    pub skipped: usize,
    pub required: usize,
    pub fraction: f64,
}

impl Session {
    pub fn new(
        kind: SessionKind,
        required: Vec<ModuleId>,
        word_list: Vec<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            required,
            completed: Vec::new(),
            skipped: Vec::new(),
            results: Vec::new(),
            word_list,
            created_at,
            status: SessionStatus::NotStarted,
        }
    }

    /// `|completed| / |required|`, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.required.is_empty() {
            return 1.0;
        }
        self.completed.len() as f64 / self.required.len() as f64
    }

    pub fn progress_summary(&self) -> SessionProgress {
        SessionProgress {
            completed: self.completed.len(),
            skipped: self.skipped.len(),
            required: self.required.len(),
            fraction: self.progress(),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::NotStarted | SessionStatus::InProgress { .. }
        )
    }

    pub fn all_required_completed(&self) -> bool {
        self.required.iter().all(|m| self.completed.contains(m))
    }

    pub fn is_completed(&self, module: ModuleId) -> bool {
        self.completed.contains(&module)
    }

    pub fn is_skipped(&self, module: ModuleId) -> bool {
        self.skipped.contains(&module)
    }

    /// First required module neither completed nor skipped.
    pub fn next_pending(&self) -> Option<(usize, ModuleId)> {
        self.required
            .iter()
            .copied()
            .enumerate()
            .find(|(_, m)| !self.is_completed(*m) && !self.is_skipped(*m))
    }

    pub fn result(&self, module: ModuleId) -> Option<&ModuleResult> {
        self.results.iter().find(|r| r.module_id() == module)
    }
}
