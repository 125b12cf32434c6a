//! Unexpected-input fallback: forwards free text to `/api/ai/chat`.
//!
//! The endpoint is an opaque collaborator: it receives `{message, history}`
//! and may answer `{response}`. Anything else is treated as "no answer".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::error::AssistError;
use crate::wizard::Message;

/// Assist endpoint, relative to the API base URL.
pub const ASSIST_PATH: &str = "/api/ai/chat";

#[derive(Debug, Serialize)]
pub struct AssistRequest<'a> {
    pub message: &'a str,
    pub history: &'a [Message],
}

#[derive(Debug, Default, Deserialize)]
pub struct AssistResponse {
    #[serde(default)]
    pub response: Option<String>,
}

/// Answers input the dialogue could not classify.
#[async_trait]
pub trait FallbackResponder: Send + Sync {
    /// `Ok(None)` means the collaborator had nothing to say.
    async fn respond(&self, message: &str, history: &[Message]) -> Result<Option<String>, AssistError>;
}

/// HTTP client for the assist endpoint.
pub struct AssistClient {
    client: reqwest::Client,
    url: String,
}

impl AssistClient {
    pub fn new(config: &ClientConfig) -> Result<Self, AssistError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AssistError::Transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: config.endpoint(ASSIST_PATH),
        })
    }
}

#[async_trait]
impl FallbackResponder for AssistClient {
    async fn respond(&self, message: &str, history: &[Message]) -> Result<Option<String>, AssistError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&AssistRequest { message, history })
            .send()
            .await
            .map_err(|e| AssistError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AssistError::Transport(format!("HTTP {status}")));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| AssistError::Transport(e.to_string()))?;
        parse_assist_body(&body)
    }
}

/// Decode an assist reply body. Empty bodies and blank replies are `None`.
pub fn parse_assist_body(body: &str) -> Result<Option<String>, AssistError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let parsed: AssistResponse =
        serde_json::from_str(body).map_err(|e| AssistError::InvalidResponse(e.to_string()))?;
    Ok(parsed
        .response
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty()))
}
