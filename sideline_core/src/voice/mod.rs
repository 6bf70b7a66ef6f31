//! Voice command resolution and routing.

pub mod command;
pub mod normalize;
pub mod router;
pub mod vocabulary;

pub use command::{CommandKind, TranscriptEvent, VoiceCommand};
pub use normalize::{normalize, tokens};
pub use router::{DispatchOutcome, Registration, SharedReceiver, VoiceCommandRouter};
pub use vocabulary::{VocabEntry, Vocabulary};
