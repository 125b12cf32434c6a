//! Dialogue state: which step the user is on and what has been said.

use serde::Serialize;

use super::transcript::{Message, Transcript};

/// Where the dialogue is in the step catalog.
///
/// Progresses linearly: Collecting(0) → … → Collecting(n-1) → Confirming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "step")]
pub enum Position {
    /// Asking the question at this index.
    Collecting(usize),
    /// All steps answered; waiting for yes/no before submitting.
    Confirming,
}

impl Position {
    /// Position for `index` in a catalog of `len` steps.
    pub fn at(index: usize, len: usize) -> Self {
        if index < len {
            Self::Collecting(index)
        } else {
            Self::Confirming
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirming)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Collecting(i) => write!(f, "collecting({i})"),
            Self::Confirming => write!(f, "confirming"),
        }
    }
}

/// Mutable dialogue state. The step count is fixed for its lifetime.
#[derive(Debug, Clone)]
pub struct DialogueState {
    /// Index into the catalog; equal to `step_count` in the terminal state.
    pub current_step: usize,
    step_count: usize,
    /// Whether the chat window is visible.
    pub is_open: bool,
    pub transcript: Transcript,
}

impl DialogueState {
    pub fn new(step_count: usize) -> Self {
        Self {
            current_step: 0,
            step_count,
            is_open: false,
            transcript: Transcript::new(),
        }
    }

    pub fn position(&self) -> Position {
        Position::at(self.current_step, self.step_count)
    }

    /// Move to the next step. Returns an error if already confirming.
    pub fn advance(&mut self) -> Result<Position, String> {
        if self.position().is_terminal() {
            return Err("Already at the confirmation step".to_string());
        }
        self.current_step += 1;
        Ok(self.position())
    }

    /// Back to the first step with a single greeting.
    pub fn reset(&mut self, greeting: impl Into<String>) {
        self.current_step = 0;
        self.transcript.reset_to(greeting);
    }
}

/// Read-only copy of the dialogue for rendering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueSnapshot {
    pub current_step_index: usize,
    pub position: Position,
    pub is_open: bool,
    pub is_typing: bool,
    pub current_question: String,
    pub messages: Vec<Message>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_walks_to_confirming() {
        let mut state = DialogueState::new(3);
        assert_eq!(state.position(), Position::Collecting(0));
        assert_eq!(state.advance().unwrap(), Position::Collecting(1));
        assert_eq!(state.advance().unwrap(), Position::Collecting(2));
        assert_eq!(state.advance().unwrap(), Position::Confirming);
        assert_eq!(state.current_step, 3);

        // Should fail at terminal
        assert!(state.advance().is_err());
        assert_eq!(state.current_step, 3);
    }

    #[test]
    fn reset_returns_to_first_step() {
        let mut state = DialogueState::new(2);
        state.advance().unwrap();
        state.transcript.push_user("x");
        state.reset("Let's start over.");
        assert_eq!(state.position(), Position::Collecting(0));
        assert_eq!(state.transcript.len(), 1);
    }

    #[test]
    fn position_serde_shape() {
        let json = serde_json::to_value(Position::Collecting(2)).unwrap();
        assert_eq!(json, serde_json::json!({"state": "collecting", "step": 2}));
        let json = serde_json::to_value(Position::Confirming).unwrap();
        assert_eq!(json, serde_json::json!({"state": "confirming"}));
    }
}
