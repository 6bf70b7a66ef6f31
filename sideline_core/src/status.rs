//! Module status returned from each poll of the active module.

use serde::{Deserialize, Serialize};

/// Public status of the active module after a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    /// Keep going; the module still needs input or time.
    Running,
    /// All trials done; `finalize` will produce a result.
    Complete,
    /// The examiner skipped the module; no result is recorded.
    Skipped,
    /// The examiner left the module; the session stays resumable.
    Exited,
}

impl ModuleStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ModuleStatus::Running)
    }
}
