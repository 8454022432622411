use super::{require_api_key, ChatClient, ComposeError};
use crate::config::{load_system_message, ModelSettings, PromptRole};

/// User message asking for a LinkedIn post body about `article_text`.
pub fn writer_prompt(article_text: &str) -> String {
    format!(
        "Given the Medium article content between the <article> tags, generate the body of a LinkedIn post.\n<article> {article_text} <article>"
    )
}

/// Drafts one post body for an article.
///
/// `article_text` is the article title, a newline, and its HTML body. The
/// prompt file is re-read and a fresh [`ChatClient`] is built on every call.
///
/// # Errors
///
/// Checked in order, each returned unchanged:
/// - [`ComposeError::Config`] - missing credential (before any request),
///   missing, malformed or incomplete prompt file
/// - [`ComposeError::Service`] - network failure or non-2xx response
/// - [`ComposeError::Data`] - response carried no usable text
pub async fn generate(
    http: &reqwest::Client,
    settings: &ModelSettings,
    article_text: &str,
) -> Result<String, ComposeError> {
    let api_key = require_api_key(settings)?;
    let system_message = load_system_message(&settings.prompts_path, PromptRole::Writer)?;

    let client = ChatClient::new(http.clone(), &settings.api_base, api_key, &settings.model)?;
    let draft = client
        .complete(&system_message, &writer_prompt(article_text))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Draft generation failed");
            e
        })?;

    tracing::info!(chars = draft.chars().count(), "Successfully generated draft");
    Ok(draft)
}
