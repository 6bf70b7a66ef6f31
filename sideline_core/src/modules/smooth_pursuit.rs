//! Smooth pursuit: the athlete follows a target along each axis while gaze
//! focus and head motion are measured per axis.

use sideline_traits::PoseSample;

use super::result::{PursuitResult, PursuitSegment};
use super::{AssessmentModule, CommandReceiver, ModuleCore, ModuleId, ModuleResult};
use crate::config::HeadMotionCfg;
use crate::error::AssessError;
use crate::metrics::{Axis, FocusTracker, HeadMotionTracker};
use crate::status::ModuleStatus;
use crate::timer::Countdown;
use crate::voice::{Vocabulary, VoiceCommand};

const AXES: [Axis; 2] = [Axis::Horizontal, Axis::Vertical];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PursuitPhase {
    Ready,
    Tracking,
    BetweenAxes,
    Done,
}

pub struct SmoothPursuitModule {
    core: ModuleCore,
    phase: PursuitPhase,
    axis_idx: usize,
    countdown: Countdown,
    head_cfg: HeadMotionCfg,
    focus: Option<FocusTracker>,
    head: HeadMotionTracker,
    focused: bool,
    segments: Vec<PursuitSegment>,
}

impl SmoothPursuitModule {
    pub fn new(core: ModuleCore, segment_ms: u64, head_cfg: HeadMotionCfg) -> Self {
        Self {
            core,
            phase: PursuitPhase::Ready,
            axis_idx: 0,
            countdown: Countdown::new(segment_ms),
            head_cfg,
            focus: None,
            head: HeadMotionTracker::new(head_cfg),
            focused: false,
            segments: Vec::new(),
        }
    }

    pub fn phase(&self) -> PursuitPhase {
        self.phase
    }

    pub fn current_axis(&self) -> Option<Axis> {
        AXES.get(self.axis_idx).copied()
    }

    fn begin_segment(&mut self, now: u64) {
        let Some(axis) = self.current_axis() else {
            return;
        };
        self.focus = Some(FocusTracker::begin(axis, now, self.focused));
        self.head = HeadMotionTracker::new(self.head_cfg);
        self.countdown.start(now);
        self.phase = PursuitPhase::Tracking;
        tracing::info!(?axis, "pursuit segment start");
    }

    fn end_segment(&mut self, now: u64) {
        self.countdown.cancel();
        if let Some(mut focus) = self.focus.take() {
            let segment = PursuitSegment {
                focus: focus.end(now),
                head: self.head.summary(),
            };
            tracing::info!(
                axis = ?segment.focus.axis,
                focus_ratio = segment.focus.focus_ratio(),
                breaks = segment.focus.breaks,
                head_events = segment.head.motion_events,
                "pursuit segment complete"
            );
            self.segments.push(segment);
        }
        self.axis_idx += 1;
        self.phase = if self.axis_idx >= AXES.len() {
            PursuitPhase::Done
        } else {
            PursuitPhase::BetweenAxes
        };
    }

    fn settle(&mut self, now: u64) {
        if self.phase == PursuitPhase::Tracking && self.countdown.poll(now) {
            self.end_segment(now);
        }
    }
}

impl CommandReceiver for SmoothPursuitModule {
    fn vocabulary(&self) -> &Vocabulary {
        self.core.vocabulary()
    }

    fn execute(&mut self, command: VoiceCommand) -> Result<(), AssessError> {
        self.core.ensure_open()?;
        if self.core.handle_common(&command) {
            self.countdown.cancel();
            return Ok(());
        }
        let now = self.core.now_ms();
        self.settle(now);

        match (&command, self.phase) {
            (
                VoiceCommand::Start | VoiceCommand::Next | VoiceCommand::Select,
                PursuitPhase::Ready | PursuitPhase::BetweenAxes,
            ) => self.begin_segment(now),
            (VoiceCommand::Stop, PursuitPhase::Tracking) => self.end_segment(now),
            _ => return Err(self.core.rejected(&command, self.phase)),
        }
        Ok(())
    }
}

impl AssessmentModule for SmoothPursuitModule {
    fn id(&self) -> ModuleId {
        ModuleId::SmoothPursuit
    }

    fn poll(&mut self) -> ModuleStatus {
        if let Some(status) = self.core.early_exit() {
            return status;
        }
        let now = self.core.now_ms();
        self.settle(now);
        if self.phase == PursuitPhase::Done {
            ModuleStatus::Complete
        } else {
            ModuleStatus::Running
        }
    }

    fn on_pose(&mut self, sample: &PoseSample) {
        if self.phase == PursuitPhase::Tracking {
            self.head.ingest(sample);
        }
    }

    fn on_focus(&mut self, focused: bool) {
        self.focused = focused;
        let now = self.core.now_ms();
        if let Some(focus) = self.focus.as_mut() {
            focus.set_focused(focused, now);
        }
    }

    fn on_tracking(&mut self, available: bool) {
        if !available && self.phase == PursuitPhase::Tracking {
            if let Some(focus) = self.focus.as_mut() {
                focus.invalidate();
            }
            self.head.invalidate();
            tracing::info!(axis = ?self.current_axis(), "pursuit segment invalidated");
        }
    }

    fn cancel(&mut self) {
        self.countdown.cancel();
    }

    fn finalize(&mut self) -> Result<ModuleResult, AssessError> {
        if self.phase != PursuitPhase::Done {
            self.core.ensure_open()?;
            return Err(AssessError::transition("smooth pursuit finalized before completion"));
        }
        self.core.begin_finalize()?;
        let valid: Vec<&PursuitSegment> = self
            .segments
            .iter()
            .filter(|s| s.focus.valid && s.head.valid)
            .collect();
        let focused: u64 = valid.iter().map(|s| s.focus.focused_ms).sum();
        let total: u64 = valid.iter().map(|s| s.focus.total_ms).sum();
        let focus_ratio = if total == 0 {
            0.0
        } else {
            focused as f64 / total as f64
        };
        Ok(ModuleResult::SmoothPursuit(PursuitResult {
            focus_ratio,
            focus_breaks: valid.iter().map(|s| s.focus.breaks).sum(),
            head_motion_events: valid.iter().map(|s| s.head.motion_events).sum(),
            segments: self.segments.clone(),
            completed_at: self.core.wall_now(),
        }))
    }
}
