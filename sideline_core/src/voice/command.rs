use serde::{Deserialize, Serialize};

/// A command delivered to a module controller.
///
/// Voice transcripts and manual taps both end up here and go through the same
/// `CommandReceiver::execute` entry point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceCommand {
    Next,
    Previous,
    Select,
    /// Select a named item (a balance stance, for instance).
    SelectByName(String),
    Start,
    Stop,
    Pause,
    Resume,
    AddError,
    UndoError,
    MarkCorrect,
    MarkIncorrect,
    Complete,
    Skip,
    Exit,
    /// Free-form response text from the athlete.
    Answer(String),
}

impl VoiceCommand {
    /// Short stable label, used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            VoiceCommand::Next => "next",
            VoiceCommand::Previous => "previous",
            VoiceCommand::Select => "select",
            VoiceCommand::SelectByName(_) => "select_by_name",
            VoiceCommand::Start => "start",
            VoiceCommand::Stop => "stop",
            VoiceCommand::Pause => "pause",
            VoiceCommand::Resume => "resume",
            VoiceCommand::AddError => "add_error",
            VoiceCommand::UndoError => "undo_error",
            VoiceCommand::MarkCorrect => "mark_correct",
            VoiceCommand::MarkIncorrect => "mark_incorrect",
            VoiceCommand::Complete => "complete",
            VoiceCommand::Skip => "skip",
            VoiceCommand::Exit => "exit",
            VoiceCommand::Answer(_) => "answer",
        }
    }
}

/// Payload-free command kinds a vocabulary alias can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Next,
    Previous,
    Select,
    Start,
    Stop,
    Pause,
    Resume,
    AddError,
    UndoError,
    MarkCorrect,
    MarkIncorrect,
    Complete,
    Skip,
    Exit,
}

impl From<CommandKind> for VoiceCommand {
    fn from(k: CommandKind) -> Self {
        match k {
            CommandKind::Next => VoiceCommand::Next,
            CommandKind::Previous => VoiceCommand::Previous,
            CommandKind::Select => VoiceCommand::Select,
            CommandKind::Start => VoiceCommand::Start,
            CommandKind::Stop => VoiceCommand::Stop,
            CommandKind::Pause => VoiceCommand::Pause,
            CommandKind::Resume => VoiceCommand::Resume,
            CommandKind::AddError => VoiceCommand::AddError,
            CommandKind::UndoError => VoiceCommand::UndoError,
            CommandKind::MarkCorrect => VoiceCommand::MarkCorrect,
            CommandKind::MarkIncorrect => VoiceCommand::MarkIncorrect,
            CommandKind::Complete => VoiceCommand::Complete,
            CommandKind::Skip => VoiceCommand::Skip,
            CommandKind::Exit => VoiceCommand::Exit,
        }
    }
}

/// One transcript from the speech recognizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub text: String,
    /// Partial transcripts are provisional and never dispatched.
    #[serde(default = "default_final")]
    pub is_final: bool,
    /// Recognizer confidence in `[0, 1]`, when reported.
    #[serde(default)]
    pub confidence: Option<f32>,
}

fn default_final() -> bool {
    true
}

impl TranscriptEvent {
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            confidence: None,
        }
    }

    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            confidence: None,
        }
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}
