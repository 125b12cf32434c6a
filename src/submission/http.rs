//! HTTP submitter: multipart `POST /api/v1/register`.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use uuid::Uuid;

use super::{DEFAULT_RECEIPT_MESSAGE, SubmitReceipt, Submitter};
use crate::config::{ClientConfig, UploadLimits};
use crate::error::{SubmitError, ValidationError};
use crate::form::{Field, FormValues, check_documents};

/// Registration endpoint, relative to the API base URL.
pub const REGISTER_PATH: &str = "/api/v1/register";

/// Sends registrations to the backend as multipart form data.
pub struct HttpRegistrationClient {
    client: reqwest::Client,
    url: String,
    limits: UploadLimits,
}

impl HttpRegistrationClient {
    pub fn new(config: &ClientConfig) -> Result<Self, SubmitError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SubmitError::Transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: config.endpoint(REGISTER_PATH),
            limits: config.upload_limits.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Build the multipart body: the five text parts, then one `files` part per document.
pub fn build_form(values: &FormValues) -> Result<Form, SubmitError> {
    let mut form = Form::new();
    for (field, value) in values.text_parts() {
        form = form.text(field.wire_name(), value.to_string());
    }
    for file in &values.documents {
        let part = Part::bytes(file.data.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|_| {
                SubmitError::Validation(vec![ValidationError::UnsupportedFileType {
                    name: file.file_name.clone(),
                    content_type: file.content_type.clone(),
                }])
            })?;
        form = form.part(Field::Documents.wire_name(), part);
    }
    Ok(form)
}

/// Pull a string `detail` out of an error body, if there is one.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("detail")?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Decode a 2xx body. A body that says `"success": false` is a backend
/// failure even though the status was successful.
pub fn parse_receipt(body: &str) -> Result<SubmitReceipt, SubmitError> {
    if body.trim().is_empty() {
        return Err(SubmitError::InvalidResponse("empty body".to_string()));
    }

    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        // Non-JSON 2xx bodies still count as accepted.
        Err(_) => return Ok(SubmitReceipt::default()),
    };

    let message = value
        .get("message")
        .and_then(|m| m.as_str())
        .map(String::from);

    if value.get("success").and_then(|s| s.as_bool()) == Some(false) {
        return Err(SubmitError::Rejected {
            status: None,
            detail: extract_detail(body).or(message),
        });
    }

    let company_id = value
        .get("company_id")
        .and_then(|id| id.as_str())
        .and_then(|id| Uuid::parse_str(id).ok());

    Ok(SubmitReceipt {
        company_id,
        message: message.unwrap_or_else(|| DEFAULT_RECEIPT_MESSAGE.to_string()),
    })
}

#[async_trait]
impl Submitter for HttpRegistrationClient {
    async fn submit(&self, values: &FormValues) -> Result<SubmitReceipt, SubmitError> {
        check_documents(&self.limits, &values.documents)
            .map_err(|e| SubmitError::Validation(vec![e]))?;
        let form = build_form(values)?;

        let resp = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %self.url, error = %e, "Registration request failed");
                SubmitError::Transport(e.to_string())
            })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| SubmitError::Transport(e.to_string()))?;

        if !status.is_success() {
            let detail = extract_detail(&body);
            tracing::warn!(
                status = status.as_u16(),
                detail = detail.as_deref().unwrap_or(""),
                "Registration rejected"
            );
            return Err(SubmitError::Rejected {
                status: Some(status.as_u16()),
                detail,
            });
        }

        let receipt = parse_receipt(&body)?;
        tracing::info!(
            company_id = ?receipt.company_id,
            files = values.documents.len(),
            "Registration submitted"
        );
        Ok(receipt)
    }
}
