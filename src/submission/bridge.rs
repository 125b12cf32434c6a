//! SubmissionBridge: holds the one registered submitter.
//!
//! The form view registers its submitter when mounted and the returned
//! [`Registration`] deregisters it on drop. A newer registration replaces an
//! older one; dropping the older guard afterwards leaves the newer one alone.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::Submitter;

struct Slot {
    generation: u64,
    submitter: Arc<dyn Submitter>,
}

#[derive(Default)]
struct BridgeInner {
    slot: Mutex<Option<Slot>>,
    next_generation: AtomicU64,
}

impl BridgeInner {
    fn slot(&self) -> MutexGuard<'_, Option<Slot>> {
        // A poisoned slot still holds a valid Option; keep using it.
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Clone, Default)]
pub struct SubmissionBridge {
    inner: Arc<BridgeInner>,
}

impl SubmissionBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `submitter`, replacing any current one.
    pub fn register(&self, submitter: Arc<dyn Submitter>) -> Registration {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let replaced = self
            .inner
            .slot()
            .replace(Slot {
                generation,
                submitter,
            })
            .is_some();
        if replaced {
            tracing::debug!(generation, "Submission handler replaced");
        } else {
            tracing::debug!(generation, "Submission handler registered");
        }
        Registration {
            inner: Arc::clone(&self.inner),
            generation,
        }
    }

    /// The currently registered submitter, if any.
    pub fn handler(&self) -> Option<Arc<dyn Submitter>> {
        self.inner
            .slot()
            .as_ref()
            .map(|slot| Arc::clone(&slot.submitter))
    }

    pub fn is_registered(&self) -> bool {
        self.inner.slot().is_some()
    }
}

/// Keeps a submitter registered until dropped.
#[must_use = "the submitter is deregistered when the Registration is dropped"]
pub struct Registration {
    inner: Arc<BridgeInner>,
    generation: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut slot = self.inner.slot();
        if slot.as_ref().is_some_and(|s| s.generation == self.generation) {
            *slot = None;
            tracing::debug!(generation = self.generation, "Submission handler deregistered");
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::SubmitError;
    use crate::form::FormValues;
    use crate::submission::SubmitReceipt;

    struct Named(&'static str);

    #[async_trait]
    impl Submitter for Named {
        async fn submit(&self, _values: &FormValues) -> Result<SubmitReceipt, SubmitError> {
            Ok(SubmitReceipt {
                company_id: None,
                message: self.0.to_string(),
            })
        }
    }

    #[test]
    fn empty_bridge_has_no_handler() {
        let bridge = SubmissionBridge::new();
        assert!(!bridge.is_registered());
        assert!(bridge.handler().is_none());
    }

    #[test]
    fn drop_deregisters() {
        let bridge = SubmissionBridge::new();
        let registration = bridge.register(Arc::new(Named("form")));
        assert!(bridge.is_registered());
        drop(registration);
        assert!(!bridge.is_registered());
    }

    #[tokio::test]
    async fn newer_registration_survives_older_drop() {
        let bridge = SubmissionBridge::new();
        let first = bridge.register(Arc::new(Named("first")));
        let _second = bridge.register(Arc::new(Named("second")));

        drop(first);
        let handler = bridge.handler().expect("second handler still registered");
        let receipt = handler.submit(&FormValues::default()).await.unwrap();
        assert_eq!(receipt.message, "second");
    }
}
