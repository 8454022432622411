//! Draft writing and draft review through a chat-completions service.
//!
//! Both operations follow the same shape: check the credential, load the
//! relevant system message from the prompt file, build a [`ChatClient`],
//! send one request. Nothing is cached between calls.

mod client;
mod reviewer;
mod writer;

use secrecy::SecretString;
use thiserror::Error;

use crate::config::{ConfigError, ModelSettings, API_KEY_ENV};

pub use client::{ChatClient, ServiceError};
pub use reviewer::{reviewer_prompt, select, validate_drafts, Selection, DRAFT_COUNT};
pub use writer::{generate, writer_prompt};

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Chat service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Invalid response format from chat service: {0}")]
    Data(String),
}

/// Returns the configured API key or a `MissingCredential` error.
fn require_api_key(settings: &ModelSettings) -> Result<SecretString, ConfigError> {
    settings.api_key.clone().ok_or_else(|| {
        tracing::error!(env = API_KEY_ENV, "API key is not set in environment variables");
        ConfigError::MissingCredential(API_KEY_ENV)
    })
}
