//! FormStore: the one observable container for registration answers.
//!
//! The dialogue and the form view each hold a clone of the same store, so a
//! write from either side is visible to the other on its next read.
//! Subscribers are notified through a `tokio::sync::watch` channel.

use std::sync::Arc;

use tokio::sync::watch;

use super::values::{Field, FormValues, SelectedFile};
use crate::error::ValidationError;

#[derive(Clone)]
pub struct FormStore {
    tx: Arc<watch::Sender<FormValues>>,
}

impl FormStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(FormValues::default());
        Self { tx: Arc::new(tx) }
    }

    /// Clone of the current values.
    pub fn snapshot(&self) -> FormValues {
        self.tx.borrow().clone()
    }

    /// Read the current values without cloning.
    pub fn read<R>(&self, f: impl FnOnce(&FormValues) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Current text of a field (`None` for documents).
    pub fn text(&self, field: Field) -> Option<String> {
        self.read(|v| v.text(field).map(str::to_string))
    }

    pub fn set_text(&self, field: Field, value: impl Into<String>) -> Result<(), ValidationError> {
        if field.is_file() {
            return Err(ValidationError::NotATextField {
                field: field.name().to_string(),
            });
        }
        let value = value.into();
        self.tx
            .send_if_modified(|values| values.set_text(field, value).unwrap_or(false));
        Ok(())
    }

    pub fn set_documents(&self, files: Vec<SelectedFile>) {
        self.tx.send_modify(|values| values.set_documents(files));
    }

    /// Restore every field to its initial empty value.
    pub fn reset(&self) {
        self.tx.send_if_modified(|values| {
            if values.is_initial() {
                return false;
            }
            *values = FormValues::default();
            true
        });
    }

    /// Receive a notification whenever any field changes.
    pub fn subscribe(&self) -> watch::Receiver<FormValues> {
        self.tx.subscribe()
    }
}

impl Default for FormStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FormStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormStore")
            .field("values", &*self.tx.borrow())
            .finish()
    }
}
