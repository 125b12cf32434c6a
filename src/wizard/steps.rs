//! Step catalog: the fixed, ordered list of registration questions.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ConfigError;
use crate::form::Field;

/// Shown when a validator rejects input and the step has no message of its own.
pub const GENERIC_INVALID_INPUT: &str = "Please provide a valid input.";

/// Choice value that opens the file picker on an upload step.
pub const UPLOAD_NOW: &str = "yes";
/// Choice value that skips an upload step.
pub const SKIP_UPLOAD: &str = "no";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern")
});

/// Predicate over a trimmed answer.
pub type Validator = fn(&str) -> bool;

pub fn is_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

/// One selectable option on a choice or upload step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choice {
    pub label: &'static str,
    pub value: &'static str,
}

impl Choice {
    /// Whether free text names this choice, by value or label.
    pub fn matches(&self, input: &str) -> bool {
        let input = input.trim();
        input.eq_ignore_ascii_case(self.value) || input.eq_ignore_ascii_case(self.label)
    }
}

pub const UPLOAD_CHOICES: &[Choice] = &[
    Choice {
        label: "Yes, upload documents",
        value: UPLOAD_NOW,
    },
    Choice {
        label: "No, skip for now",
        value: SKIP_UPLOAD,
    },
];

/// How a step collects its answer.
#[derive(Debug, Clone, Copy)]
pub enum StepKind {
    /// Free text, optionally checked by a validator.
    Text { validator: Option<Validator> },
    /// One of a fixed set of values, written into the field as-is.
    Choice { choices: &'static [Choice] },
    /// Files, completed only by an explicit upload (or skipped via a choice).
    FileUpload { choices: &'static [Choice] },
}

#[derive(Debug, Clone, Copy)]
pub struct Step {
    pub id: &'static str,
    pub prompt: &'static str,
    pub field: Field,
    pub required: bool,
    pub kind: StepKind,
    pub error_message: Option<&'static str>,
}

impl Step {
    pub const fn text(id: &'static str, prompt: &'static str, field: Field, required: bool) -> Self {
        Self {
            id,
            prompt,
            field,
            required,
            kind: StepKind::Text { validator: None },
            error_message: None,
        }
    }

    pub const fn validated(mut self, validator: Validator, error_message: &'static str) -> Self {
        self.kind = StepKind::Text {
            validator: Some(validator),
        };
        self.error_message = Some(error_message);
        self
    }

    /// Check a trimmed answer. The error is the message to show the user.
    pub fn validate(&self, answer: &str) -> Result<(), &'static str> {
        match self.kind {
            StepKind::Text {
                validator: Some(check),
            } if !check(answer) => Err(self.error_message.unwrap_or(GENERIC_INVALID_INPUT)),
            _ => Ok(()),
        }
    }

    pub fn is_file_upload(&self) -> bool {
        matches!(self.kind, StepKind::FileUpload { .. })
    }

    pub fn choices(&self) -> &'static [Choice] {
        match self.kind {
            StepKind::Choice { choices } | StepKind::FileUpload { choices } => choices,
            StepKind::Text { .. } => &[],
        }
    }

    pub fn find_choice(&self, input: &str) -> Option<&'static Choice> {
        self.choices().iter().find(|c| c.matches(input))
    }
}

/// Ordered, immutable list of steps.
#[derive(Debug, Clone)]
pub struct StepCatalog {
    steps: Vec<Step>,
}

impl StepCatalog {
    /// Build a catalog, checking that ids are unique and that each step's
    /// kind fits its field.
    pub fn new(steps: Vec<Step>) -> Result<Self, ConfigError> {
        if steps.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "steps".into(),
                message: "catalog must contain at least one step".into(),
            });
        }
        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(step.id) {
                return Err(ConfigError::InvalidValue {
                    key: "steps".into(),
                    message: format!("duplicate step id: {}", step.id),
                });
            }
            if step.field.is_file() != step.is_file_upload() {
                return Err(ConfigError::InvalidValue {
                    key: "steps".into(),
                    message: format!("step {} does not fit field {}", step.id, step.field),
                });
            }
        }
        Ok(Self { steps })
    }

    /// The six-step company registration flow.
    pub fn registration() -> Self {
        Self {
            steps: vec![
                Step::text(
                    "companyName",
                    "What is your company name?",
                    Field::CompanyName,
                    true,
                ),
                Step::text(
                    "areaOfService",
                    "Where does your company operate?",
                    Field::AreaOfService,
                    false,
                ),
                Step::text("fullName", "What is your full name?", Field::FullName, true),
                Step::text("email", "What is your email address?", Field::Email, true)
                    .validated(is_email, "Please enter a valid email address."),
                Step::text("phone", "What is your contact number?", Field::Phone, false),
                Step {
                    id: "documents",
                    prompt: "Please upload your required documents.",
                    field: Field::Documents,
                    required: false,
                    kind: StepKind::FileUpload {
                        choices: UPLOAD_CHOICES,
                    },
                    error_message: None,
                },
            ],
        }
    }

    /// Step at `index`; `None` past the end means the confirmation state.
    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }
}
