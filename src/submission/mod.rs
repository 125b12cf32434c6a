//! Registration submission: the transport seam between the dialogue and
//! whichever component owns the network call.

pub mod bridge;
pub mod http;

pub use bridge::{Registration, SubmissionBridge};
pub use http::{HttpRegistrationClient, REGISTER_PATH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SubmitError;
use crate::form::FormValues;

/// Message used when the backend accepts a registration without saying more.
pub const DEFAULT_RECEIPT_MESSAGE: &str = "Registration successful";

/// What the backend returns for an accepted registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,
    pub message: String,
}

impl Default for SubmitReceipt {
    fn default() -> Self {
        Self {
            company_id: None,
            message: DEFAULT_RECEIPT_MESSAGE.to_string(),
        }
    }
}

/// Sends a completed registration somewhere.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, values: &FormValues) -> Result<SubmitReceipt, SubmitError>;
}
