//! RegistrationForm: the direct-entry form bound to the shared store.
//!
//! Mounting the form registers its submitter on the [`SubmissionBridge`] so
//! the dialogue can trigger a submission; dropping the form deregisters it.

use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tokio::sync::RwLock;

use super::store::FormStore;
use super::values::{Field, FormValues, SelectedFile, check_documents};
use crate::busy::BusyFlag;
use crate::config::UploadLimits;
use crate::error::{SubmitError, ValidationError};
use crate::submission::{Registration, SubmissionBridge, SubmitReceipt, Submitter};

/// Banner text after a successful direct submission.
pub const FORM_SUCCESS_MESSAGE: &str = "Registration successful! Your company has been registered.";

static FORM_EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").expect("valid email pattern")
});

/// Outcome banner shown above the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitStatus {
    pub success: bool,
    pub message: String,
}

pub struct RegistrationForm {
    store: FormStore,
    submitter: Arc<dyn Submitter>,
    limits: UploadLimits,
    submitting: BusyFlag,
    status: RwLock<Option<SubmitStatus>>,
    _registration: Registration,
}

impl RegistrationForm {
    /// Mount the form: bind it to `store` and register `submitter` on `bridge`.
    pub fn mount(
        store: FormStore,
        bridge: &SubmissionBridge,
        submitter: Arc<dyn Submitter>,
        limits: UploadLimits,
    ) -> Self {
        let registration = bridge.register(Arc::clone(&submitter));
        Self {
            store,
            submitter,
            limits,
            submitting: BusyFlag::new(),
            status: RwLock::new(None),
            _registration: registration,
        }
    }

    pub fn store(&self) -> &FormStore {
        &self.store
    }

    pub fn values(&self) -> FormValues {
        self.store.snapshot()
    }

    /// Edit a text field directly. Does not touch the dialogue's step.
    pub fn set_field(&self, field: Field, value: impl Into<String>) -> Result<(), ValidationError> {
        self.store.set_text(field, value)
    }

    /// Replace the document selection after checking the upload limits.
    pub fn set_documents(&self, files: Vec<SelectedFile>) -> Result<(), ValidationError> {
        check_documents(&self.limits, &files)?;
        self.store.set_documents(files);
        Ok(())
    }

    /// Read files from disk and make them the document selection.
    pub async fn select_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<usize, ValidationError> {
        let files = load_files(paths).await?;
        let count = files.len();
        self.set_documents(files)?;
        Ok(count)
    }

    /// Field-level validation of the current values.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        self.store.read(validate_values)
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.is_set()
    }

    /// The banner from the last direct submission.
    pub async fn status(&self) -> Option<SubmitStatus> {
        self.status.read().await.clone()
    }

    /// Validate and submit the form. Clears the form only on success.
    pub async fn submit(&self) -> Result<SubmitReceipt, SubmitError> {
        let Some(_submitting) = self.submitting.try_acquire() else {
            return Err(SubmitError::InProgress);
        };
        *self.status.write().await = None;

        let values = self.store.snapshot();
        if let Err(errors) = validate_values(&values) {
            return Err(SubmitError::Validation(errors));
        }

        let result = self.submitter.submit(&values).await;
        let status = match &result {
            Ok(_) => {
                self.store.reset();
                SubmitStatus {
                    success: true,
                    message: FORM_SUCCESS_MESSAGE.to_string(),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Form submission failed");
                SubmitStatus {
                    success: false,
                    message: e.to_string(),
                }
            }
        };
        *self.status.write().await = Some(status);
        result
    }
}

/// Read every path into a [`SelectedFile`].
pub async fn load_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<SelectedFile>, ValidationError> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(SelectedFile::from_path(path.as_ref()).await?);
    }
    Ok(files)
}

fn validate_values(values: &FormValues) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for field in [Field::CompanyName, Field::FullName, Field::Email] {
        if values.text(field).unwrap_or("").trim().is_empty() {
            errors.push(ValidationError::Required { field });
        }
    }

    let email = values.email.trim();
    if !email.is_empty() && !FORM_EMAIL_PATTERN.is_match(email) {
        errors.push(ValidationError::Invalid {
            field: Field::Email.name().to_string(),
            message: "Invalid email address".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
