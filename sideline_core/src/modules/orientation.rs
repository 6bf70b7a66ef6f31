use super::result::{OrientationAnswer, OrientationResult};
use super::{AssessmentModule, CommandReceiver, ModuleCore, ModuleId, ModuleResult};
use crate::error::AssessError;
use crate::scoring::{OrientationQuestion, is_correct};
use crate::status::ModuleStatus;
use crate::voice::{Vocabulary, VoiceCommand};

/// Orientation questions, answered in order with back-navigation.
pub struct OrientationModule {
    core: ModuleCore,
    questions: Vec<OrientationQuestion>,
    responses: Vec<Option<String>>,
    current: usize,
    done: bool,
    tolerance_min: u32,
}

impl OrientationModule {
    pub fn new(core: ModuleCore, questions: Vec<OrientationQuestion>, tolerance_min: u32) -> Self {
        let responses = vec![None; questions.len()];
        let done = questions.is_empty();
        Self {
            core,
            questions,
            responses,
            current: 0,
            done,
            tolerance_min,
        }
    }

    pub fn current_question(&self) -> Option<&OrientationQuestion> {
        if self.done {
            return None;
        }
        self.questions.get(self.current)
    }

    fn advance(&mut self) {
        self.current += 1;
        if self.current >= self.questions.len() {
            self.done = true;
        }
    }
}

impl CommandReceiver for OrientationModule {
    fn vocabulary(&self) -> &Vocabulary {
        self.core.vocabulary()
    }

    fn accepts_answers(&self) -> bool {
        !self.done
    }

    fn execute(&mut self, command: VoiceCommand) -> Result<(), AssessError> {
        self.core.ensure_open()?;
        // per-question skip; the module itself is only skipped once all questions are done
        if matches!(command, VoiceCommand::Skip) && !self.done {
            tracing::debug!(question = self.current, "orientation question skipped");
            self.responses[self.current] = None;
            self.advance();
            return Ok(());
        }
        if self.core.handle_common(&command) {
            return Ok(());
        }
        if self.done {
            return Err(self.core.rejected(&command, "all questions answered"));
        }
        match command {
            VoiceCommand::Answer(text) => {
                tracing::debug!(question = self.current, "orientation answer recorded");
                self.responses[self.current] = Some(text);
                self.advance();
            }
            VoiceCommand::Next => self.advance(),
            VoiceCommand::Previous if self.current > 0 => self.current -= 1,
            VoiceCommand::Complete => self.done = true,
            other => return Err(self.core.rejected(&other, format!("question {}", self.current))),
        }
        Ok(())
    }
}

impl AssessmentModule for OrientationModule {
    fn id(&self) -> ModuleId {
        ModuleId::Orientation
    }

    fn poll(&mut self) -> ModuleStatus {
        if let Some(status) = self.core.early_exit() {
            return status;
        }
        if self.done {
            ModuleStatus::Complete
        } else {
            ModuleStatus::Running
        }
    }

    fn cancel(&mut self) {}

    fn finalize(&mut self) -> Result<ModuleResult, AssessError> {
        if !self.done {
            self.core.ensure_open()?;
            return Err(AssessError::transition("orientation finalized before completion"));
        }
        self.core.begin_finalize()?;
        let answers: Vec<OrientationAnswer> = self
            .questions
            .iter()
            .zip(&self.responses)
            .map(|(q, r)| OrientationAnswer {
                item: q.item,
                expected: q.expected.clone(),
                response: r.clone(),
                correct: r
                    .as_deref()
                    .is_some_and(|text| is_correct(q, text, self.tolerance_min)),
            })
            .collect();
        let score = u32::try_from(answers.iter().filter(|a| a.correct).count()).unwrap_or(u32::MAX);
        Ok(ModuleResult::Orientation(OrientationResult {
            max: u32::try_from(answers.len()).unwrap_or(u32::MAX),
            answers,
            score,
            completed_at: self.core.wall_now(),
        }))
    }
}
