//! Conversational registration wizard.

pub mod assistant;
pub mod prompts;
pub mod state;
pub mod steps;
pub mod transcript;

pub use assistant::{RegistrationAssistant, TurnOutcome};
pub use state::{DialogueSnapshot, DialogueState, Position};
pub use steps::{Choice, Step, StepCatalog, StepKind};
pub use transcript::{Message, Transcript};
