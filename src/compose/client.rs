use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ComposeError;
use crate::util::{is_local_host, validate_url};

const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB
const COMPLETIONS_PATH: &str = "v1/chat/completions";
/// Longest service error message carried into [`ServiceError::HttpStatus`].
const MAX_ERROR_MESSAGE: usize = 300;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {status}: {message}")]
    HttpStatus { status: u16, message: String },
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("Insecure API base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ReplyMessage>,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Client for an OpenAI-compatible chat-completions endpoint.
///
/// Each compose call builds its own `ChatClient`; the underlying
/// `reqwest::Client` is shared and cheap to clone.
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
    model: String,
}

impl ChatClient {
    /// SEC-002: Plain-HTTP bases are only accepted for localhost so the API
    /// key never crosses the network unencrypted.
    pub fn new(
        http: reqwest::Client,
        api_base: &str,
        api_key: SecretString,
        model: &str,
    ) -> Result<Self, ServiceError> {
        let base = validate_url(api_base).map_err(|e| ServiceError::InvalidBaseUrl(e.to_string()))?;

        if base.scheme() != "https" {
            if !is_local_host(&base) {
                tracing::error!(api_base = %api_base, "Rejecting non-HTTPS API base URL (HTTPS required except for localhost)");
                return Err(ServiceError::InsecureBaseUrl);
            }
            tracing::warn!(api_base = %api_base, "Using non-HTTPS API base URL (localhost only)");
        }

        let endpoint = format!("{}/{}", base.as_str().trim_end_matches('/'), COMPLETIONS_PATH);

        Ok(Self {
            http,
            endpoint,
            api_key,
            model: model.to_string(),
        })
    }

    /// Sends a system + user message pair and returns the first choice's text
    /// verbatim.
    ///
    /// # Errors
    ///
    /// - [`ComposeError::Service`] - network failure or non-2xx status
    /// - [`ComposeError::Data`] - undecodable body, no choices, or empty text
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, ComposeError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };
        let body = serde_json::to_vec(&request).map_err(ServiceError::Encode)?;

        tracing::debug!(endpoint = %self.endpoint, model = %self.model, "Sending chat completion request");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(ServiceError::Network)?;

        let status = response.status();
        let bytes = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;

        if !status.is_success() {
            return Err(ServiceError::HttpStatus {
                status: status.as_u16(),
                message: error_message(&bytes),
            }
            .into());
        }

        extract_text(&bytes)
    }
}

/// Pulls the first choice's content out of a completion body.
fn extract_text(bytes: &[u8]) -> Result<String, ComposeError> {
    let parsed: ChatResponse = serde_json::from_slice(bytes)
        .map_err(|e| ComposeError::Data(format!("undecodable response body: {e}")))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ComposeError::Data("response has no choices".to_string()))?
        .message
        .and_then(|m| m.content)
        .ok_or_else(|| ComposeError::Data("first choice has no message content".to_string()))?;

    if content.trim().is_empty() {
        return Err(ComposeError::Data("first choice has empty content".to_string()));
    }

    Ok(content)
}

/// Best-effort human-readable message from an error response body.
fn error_message(bytes: &[u8]) -> String {
    let message = serde_json::from_slice::<ErrorEnvelope>(bytes)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned());
    message.chars().take(MAX_ERROR_MESSAGE).collect()
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, ServiceError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ServiceError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ServiceError::Network)?;
        // SEC-003: Use saturating_add to prevent integer overflow in size check
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ServiceError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
