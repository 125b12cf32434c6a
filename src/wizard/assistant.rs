//! RegistrationAssistant: coordinates the dialogue state, the shared form
//! store, and submission.
//!
//! Every operation takes `&self`; the dialogue state sits behind a lock and
//! is never held across a network call. While a submission or a fallback
//! call is outstanding the busy flag is set and new answers are refused.

use std::sync::Arc;

use tokio::sync::RwLock;

use super::prompts::{
    self, CONFIRM_SUBMIT, FALLBACK_NO_ANSWER, FALLBACK_UNAVAILABLE, FIELD_REQUIRED, GREETING,
    REVIEW_FIRST, SUBMIT_REJECTED, SUBMIT_SUCCESS, SUBMIT_TRANSPORT_FAILURE, UPLOAD_COMPLETE,
    UPLOAD_INSTRUCTIONS,
};
use super::state::{DialogueSnapshot, DialogueState, Position};
use super::steps::{Step, StepCatalog, StepKind, UPLOAD_NOW};
use super::transcript::Message;
use crate::busy::{BusyFlag, BusyGuard};
use crate::error::{SubmitError, ValidationError};
use crate::fallback::FallbackResponder;
use crate::form::{Field, FormStore, SelectedFile};
use crate::submission::{SubmissionBridge, SubmitReceipt};

/// What a single user action did to the dialogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Blank input; nothing recorded.
    Ignored,
    /// A submission or fallback call is outstanding; input refused.
    Busy,
    /// The answer was stored and the dialogue moved on.
    Advanced { next: Position },
    /// The answer failed validation; the same step is asked again.
    Rejected { message: String },
    /// Waiting for files on an upload step.
    AwaitingUpload,
    /// The user confirmed and a submission was attempted.
    Submitted(Result<SubmitReceipt, SubmitError>),
    /// The user declined to submit at the confirmation step.
    ReviewRequested,
    /// Input was not understood and went to the fallback.
    Redirected,
    /// The action does not apply to the current step.
    NotApplicable,
}

pub struct RegistrationAssistant {
    catalog: Arc<StepCatalog>,
    state: RwLock<DialogueState>,
    busy: BusyFlag,
    form: FormStore,
    bridge: SubmissionBridge,
    fallback: Option<Arc<dyn FallbackResponder>>,
}

impl RegistrationAssistant {
    pub fn new(catalog: StepCatalog, form: FormStore, bridge: SubmissionBridge) -> Self {
        let mut state = DialogueState::new(catalog.len());
        state.transcript.push_assistant(GREETING);
        if let Some(first) = catalog.get(0) {
            state.transcript.push_assistant(first.prompt);
        }
        Self {
            catalog: Arc::new(catalog),
            state: RwLock::new(state),
            busy: BusyFlag::new(),
            form,
            bridge,
            fallback: None,
        }
    }

    /// Forward unrecognized input to `responder`.
    pub fn with_fallback(mut self, responder: Arc<dyn FallbackResponder>) -> Self {
        self.fallback = Some(responder);
        self
    }

    pub fn catalog(&self) -> &StepCatalog {
        &self.catalog
    }

    pub fn form(&self) -> &FormStore {
        &self.form
    }

    /// True while a submission or fallback call is outstanding.
    pub fn is_typing(&self) -> bool {
        self.busy.is_set()
    }

    pub async fn current_step_index(&self) -> usize {
        self.state.read().await.current_step
    }

    pub async fn position(&self) -> Position {
        self.state.read().await.position()
    }

    /// The step being asked, or `None` at the confirmation state.
    pub async fn current_step(&self) -> Option<Step> {
        let index = self.state.read().await.current_step;
        self.catalog.get(index).copied()
    }

    /// The question currently on screen.
    pub async fn current_prompt(&self) -> String {
        let position = self.state.read().await.position();
        self.prompt_for(position).to_string()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.state.read().await.transcript.as_slice().to_vec()
    }

    pub async fn snapshot(&self) -> DialogueSnapshot {
        let state = self.state.read().await;
        let position = state.position();
        DialogueSnapshot {
            current_step_index: state.current_step,
            position,
            is_open: state.is_open,
            is_typing: self.busy.is_set(),
            current_question: self.prompt_for(position).to_string(),
            messages: state.transcript.as_slice().to_vec(),
        }
    }

    /// Show or hide the chat. Returns the new visibility.
    pub async fn toggle_chat(&self) -> bool {
        let mut state = self.state.write().await;
        state.is_open = !state.is_open;
        state.is_open
    }

    /// Handle a free-text answer to the current question.
    pub async fn submit_answer(&self, text: &str) -> TurnOutcome {
        if self.busy.is_set() {
            return TurnOutcome::Busy;
        }
        let answer = text.trim();
        if answer.is_empty() {
            return TurnOutcome::Ignored;
        }

        let mut state = self.state.write().await;
        let step = match state.position() {
            Position::Confirming => {
                state.transcript.push_user(answer);
                drop(state);
                return self.confirm(answer).await;
            }
            Position::Collecting(index) => match self.catalog.get(index) {
                Some(step) => *step,
                None => return TurnOutcome::NotApplicable,
            },
        };

        match step.kind {
            StepKind::Text { .. } => {
                state.transcript.push_user(answer);
                if let Err(message) = step.validate(answer) {
                    tracing::debug!(step = step.id, "Answer rejected");
                    state.transcript.push_assistant(message);
                    return TurnOutcome::Rejected {
                        message: message.to_string(),
                    };
                }
                self.store_and_advance(&mut state, &step, answer)
            }
            StepKind::Choice { .. } | StepKind::FileUpload { .. } => {
                if let Some(choice) = step.find_choice(answer) {
                    state.transcript.push_user(answer);
                    return self.apply_choice(&mut state, &step, choice.value);
                }
                let Some(busy) = self.busy.try_acquire() else {
                    return TurnOutcome::Busy;
                };
                let history = state.transcript.as_slice().to_vec();
                state.transcript.push_user(answer);
                drop(state);
                self.redirect(answer, history, busy).await
            }
        }
    }

    /// Pick an option on a choice or upload step (or at confirmation).
    pub async fn select_choice(&self, value: &str) -> TurnOutcome {
        if self.busy.is_set() {
            return TurnOutcome::Busy;
        }
        let value = value.trim();
        if value.is_empty() {
            return TurnOutcome::Ignored;
        }

        let mut state = self.state.write().await;
        let step = match state.position() {
            Position::Confirming => {
                state.transcript.push_user(value);
                drop(state);
                return self.confirm(value).await;
            }
            Position::Collecting(index) => match self.catalog.get(index) {
                Some(step) => *step,
                None => return TurnOutcome::NotApplicable,
            },
        };
        if matches!(step.kind, StepKind::Text { .. }) {
            return TurnOutcome::NotApplicable;
        }

        let (label, chosen) = match step.find_choice(value) {
            Some(choice) => (choice.label, choice.value),
            None => (value, value),
        };
        state.transcript.push_user(label);
        self.apply_choice(&mut state, &step, chosen)
    }

    /// Move past an optional step without answering it.
    pub async fn skip_step(&self) -> TurnOutcome {
        if self.busy.is_set() {
            return TurnOutcome::Busy;
        }
        let mut state = self.state.write().await;
        let Position::Collecting(index) = state.position() else {
            return TurnOutcome::NotApplicable;
        };
        let Some(step) = self.catalog.get(index).copied() else {
            return TurnOutcome::NotApplicable;
        };
        if step.required {
            state.transcript.push_assistant(FIELD_REQUIRED);
            return TurnOutcome::Rejected {
                message: FIELD_REQUIRED.to_string(),
            };
        }
        tracing::debug!(step = step.id, "Optional step skipped");
        TurnOutcome::Advanced {
            next: self.advance(&mut state),
        }
    }

    /// Write a text field on the dialogue's behalf. Moves the dialogue on
    /// unless the current step is waiting for files.
    pub async fn update_form_field(
        &self,
        field: Field,
        value: impl Into<String>,
    ) -> Result<TurnOutcome, ValidationError> {
        if self.busy.is_set() {
            return Ok(TurnOutcome::Busy);
        }
        self.form.set_text(field, value)?;
        let mut state = self.state.write().await;
        if state.position().is_terminal() || self.on_upload_step(&state) {
            return Ok(TurnOutcome::NotApplicable);
        }
        Ok(TurnOutcome::Advanced {
            next: self.advance(&mut state),
        })
    }

    /// Finish the upload step. Does nothing on any other step.
    pub async fn complete_file_upload(&self) -> TurnOutcome {
        if self.busy.is_set() {
            return TurnOutcome::Busy;
        }
        let mut state = self.state.write().await;
        if !self.on_upload_step(&state) {
            return TurnOutcome::NotApplicable;
        }
        self.finish_upload(&mut state)
    }

    /// Store picked files in the documents field and finish the upload step.
    /// Off the upload step nothing is written.
    pub async fn attach_documents(&self, files: Vec<SelectedFile>) -> TurnOutcome {
        if self.busy.is_set() {
            return TurnOutcome::Busy;
        }
        if files.is_empty() {
            return TurnOutcome::Ignored;
        }
        let mut state = self.state.write().await;
        if !self.on_upload_step(&state) {
            return TurnOutcome::NotApplicable;
        }
        let count = files.len();
        self.form.set_documents(files);
        state.transcript.push_user(prompts::files_uploaded(count));
        self.finish_upload(&mut state)
    }

    /// Submit through whichever submitter is registered on the bridge.
    ///
    /// Always returns a structured result and records exactly one outcome
    /// message. Form values are left as they are, whatever the outcome.
    pub async fn trigger_submit(&self) -> Result<SubmitReceipt, SubmitError> {
        let Some(handler) = self.bridge.handler() else {
            tracing::warn!("No submission handler registered");
            self.push_assistant(SUBMIT_TRANSPORT_FAILURE).await;
            return Err(SubmitError::HandlerNotFound);
        };
        let Some(_busy) = self.busy.try_acquire() else {
            return Err(SubmitError::InProgress);
        };

        let values = self.form.snapshot();
        let result = handler.submit(&values).await;

        let reply = match &result {
            Ok(receipt) => {
                tracing::info!(company_id = ?receipt.company_id, "Registration submitted from dialogue");
                SUBMIT_SUCCESS.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Registration submission failed");
                match e {
                    SubmitError::Rejected { detail, .. } => prompts::submit_rejected(detail.as_deref()),
                    SubmitError::Transport(_) | SubmitError::HandlerNotFound => {
                        SUBMIT_TRANSPORT_FAILURE.to_string()
                    }
                    _ => SUBMIT_REJECTED.to_string(),
                }
            }
        };
        self.push_assistant(reply).await;
        result
    }

    /// Send input the flow could not use to the fallback, then re-ask.
    pub async fn handle_unexpected_input(&self, text: &str) -> TurnOutcome {
        let input = text.trim();
        if input.is_empty() {
            return TurnOutcome::Ignored;
        }
        let Some(busy) = self.busy.try_acquire() else {
            return TurnOutcome::Busy;
        };
        let history = {
            let mut state = self.state.write().await;
            let history = state.transcript.as_slice().to_vec();
            state.transcript.push_user(input);
            history
        };
        self.redirect(input, history, busy).await
    }

    /// Back to the first question with an empty form.
    pub async fn start_over(&self) {
        let first_prompt = self.catalog.get(0).map(|s| s.prompt).unwrap_or_default();
        let mut state = self.state.write().await;
        state.reset(prompts::start_over(first_prompt));
        self.form.reset();
        tracing::info!("Registration dialogue restarted");
    }

    // ── internals ───────────────────────────────────────────────────

    fn prompt_for(&self, position: Position) -> &'static str {
        match position {
            Position::Collecting(index) => self
                .catalog
                .get(index)
                .map(|s| s.prompt)
                .unwrap_or(CONFIRM_SUBMIT),
            Position::Confirming => CONFIRM_SUBMIT,
        }
    }

    /// Move to the next step and ask its question.
    fn advance(&self, state: &mut DialogueState) -> Position {
        match state.advance() {
            Ok(next) => {
                tracing::debug!(%next, "Dialogue advanced");
                state.transcript.push_assistant(self.prompt_for(next));
                next
            }
            Err(e) => {
                tracing::warn!("Failed to advance dialogue: {}", e);
                state.position()
            }
        }
    }

    fn on_upload_step(&self, state: &DialogueState) -> bool {
        match state.position() {
            Position::Collecting(index) => self
                .catalog
                .get(index)
                .is_some_and(|step| step.is_file_upload()),
            Position::Confirming => false,
        }
    }

    fn finish_upload(&self, state: &mut DialogueState) -> TurnOutcome {
        state.transcript.push_assistant(UPLOAD_COMPLETE);
        TurnOutcome::Advanced {
            next: self.advance(state),
        }
    }

    fn store_and_advance(&self, state: &mut DialogueState, step: &Step, value: &str) -> TurnOutcome {
        if let Err(e) = self.form.set_text(step.field, value) {
            let message = e.to_string();
            state.transcript.push_assistant(message.clone());
            return TurnOutcome::Rejected { message };
        }
        TurnOutcome::Advanced {
            next: self.advance(state),
        }
    }

    fn apply_choice(&self, state: &mut DialogueState, step: &Step, value: &str) -> TurnOutcome {
        match step.kind {
            StepKind::FileUpload { .. } if value.eq_ignore_ascii_case(UPLOAD_NOW) => {
                state.transcript.push_assistant(UPLOAD_INSTRUCTIONS);
                TurnOutcome::AwaitingUpload
            }
            StepKind::FileUpload { .. } => TurnOutcome::Advanced {
                next: self.advance(state),
            },
            StepKind::Choice { .. } => self.store_and_advance(state, step, value),
            StepKind::Text { .. } => TurnOutcome::NotApplicable,
        }
    }

    async fn confirm(&self, answer: &str) -> TurnOutcome {
        if answer.to_lowercase().contains("yes") {
            TurnOutcome::Submitted(self.trigger_submit().await)
        } else {
            self.push_assistant(REVIEW_FIRST).await;
            TurnOutcome::ReviewRequested
        }
    }

    async fn redirect(&self, input: &str, history: Vec<Message>, _busy: BusyGuard) -> TurnOutcome {
        let reply = match &self.fallback {
            None => FALLBACK_NO_ANSWER.to_string(),
            Some(responder) => match responder.respond(input, &history).await {
                Ok(Some(text)) => text,
                Ok(None) => FALLBACK_NO_ANSWER.to_string(),
                Err(e) => {
                    tracing::warn!(error = %e, "Assist fallback failed");
                    FALLBACK_UNAVAILABLE.to_string()
                }
            },
        };

        let mut state = self.state.write().await;
        state.transcript.push_assistant(reply);
        let prompt = self.prompt_for(state.position());
        state.transcript.push_assistant(prompt);
        TurnOutcome::Redirected
    }

    async fn push_assistant(&self, text: impl Into<String>) {
        self.state.write().await.transcript.push_assistant(text);
    }
}
