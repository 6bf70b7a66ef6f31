use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusSegment {
    pub axis: Axis,
    pub focused_ms: u64,
    pub total_ms: u64,
    /// Focused-to-unfocused transitions.
    pub breaks: u32,
    pub valid: bool,
}

impl FocusSegment {
    pub fn focus_ratio(&self) -> f64 {
        if self.total_ms == 0 {
            return 0.0;
        }
        self.focused_ms as f64 / self.total_ms as f64
    }
}

/// Gaze-focus accounting for one pursuit axis.
#[derive(Debug, Clone)]
pub struct FocusTracker {
    axis: Axis,
    started_ms: u64,
    focused_since: Option<u64>,
    focused_ms: u64,
    breaks: u32,
    ended: Option<FocusSegment>,
    valid: bool,
}

impl FocusTracker {
    pub fn begin(axis: Axis, now_ms: u64, focused: bool) -> Self {
        Self {
            axis,
            started_ms: now_ms,
            focused_since: focused.then_some(now_ms),
            focused_ms: 0,
            breaks: 0,
            ended: None,
            valid: true,
        }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn set_focused(&mut self, focused: bool, now_ms: u64) {
        if self.ended.is_some() {
            return;
        }
        match (self.focused_since, focused) {
            (None, true) => self.focused_since = Some(now_ms),
            (Some(since), false) => {
                self.focused_ms += now_ms.saturating_sub(since);
                self.focused_since = None;
                self.breaks += 1;
            }
            _ => {}
        }
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Close the segment. Later calls return the first result.
    pub fn end(&mut self, now_ms: u64) -> FocusSegment {
        if let Some(done) = self.ended {
            return done;
        }
        let open = self
            .focused_since
            .take()
            .map_or(0, |since| now_ms.saturating_sub(since));
        let done = FocusSegment {
            axis: self.axis,
            focused_ms: self.focused_ms + open,
            total_ms: now_ms.saturating_sub(self.started_ms),
            breaks: self.breaks,
            valid: self.valid,
        };
        self.ended = Some(done);
        done
    }
}
