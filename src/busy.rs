//! Busy flag: admission control while a network call is outstanding.
//!
//! At most one guard exists at a time. Dropping the guard clears the flag,
//! so the flag is released on every exit path, including a dropped future.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Default)]
pub struct BusyFlag {
    inner: Arc<AtomicBool>,
}

impl BusyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }

    /// Set the flag, or return `None` if it is already set.
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.inner
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard {
                inner: Arc::clone(&self.inner),
            })
    }
}

/// Holds the busy flag until dropped.
#[derive(Debug)]
pub struct BusyGuard {
    inner: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.inner.store(false, Ordering::Release);
    }
}
