use super::{require_api_key, ChatClient, ComposeError};
use crate::config::{load_system_message, ModelSettings, PromptRole};

/// Number of drafts the reviewer chooses between.
pub const DRAFT_COUNT: usize = 3;

/// The reviewer's verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// The chosen post, exactly as the service replied.
    pub text: String,
    /// Zero-based position of the chosen draft, when the reply can be matched
    /// to one.
    pub index: Option<usize>,
}

/// User message presenting the drafts in numbered `<post>` sections.
pub fn reviewer_prompt(drafts: &[String]) -> String {
    let mut prompt = String::from(
        "Given the three posts below (each between the <post> tags) output the best post word for word.",
    );
    for (i, draft) in drafts.iter().enumerate() {
        prompt.push_str(&format!("\n\n# POST #{} <post> {} <post>", i + 1, draft));
    }
    prompt
}

/// Checks that there are exactly [`DRAFT_COUNT`] drafts and none is blank.
pub fn validate_drafts(drafts: &[String]) -> Result<(), ComposeError> {
    if drafts.len() != DRAFT_COUNT || drafts.iter().any(|d| d.trim().is_empty()) {
        tracing::error!(
            count = drafts.len(),
            blank = drafts.iter().filter(|d| d.trim().is_empty()).count(),
            "Invalid drafts for review"
        );
        return Err(ComposeError::Validation(
            "`posts` must be a list of exactly three non-empty strings.".to_string(),
        ));
    }
    Ok(())
}

/// Asks the chat service to pick the best of three drafts.
///
/// The service is instructed to reproduce the winner word for word; the
/// reply is then matched back to a draft to fill [`Selection::index`].
///
/// # Errors
///
/// - [`ComposeError::Config`] - missing credential, checked first
/// - [`ComposeError::Validation`] - not exactly three non-blank drafts;
///   raised before the prompt file is read or any request is made
/// - [`ComposeError::Config`] - missing, malformed or incomplete prompt file
/// - [`ComposeError::Service`] / [`ComposeError::Data`] - as for drafting
pub async fn select(
    http: &reqwest::Client,
    settings: &ModelSettings,
    drafts: &[String],
) -> Result<Selection, ComposeError> {
    let api_key = require_api_key(settings)?;
    validate_drafts(drafts)?;
    let system_message = load_system_message(&settings.prompts_path, PromptRole::Reviewer)?;

    let client = ChatClient::new(http.clone(), &settings.api_base, api_key, &settings.model)?;
    let reply = client
        .complete(&system_message, &reviewer_prompt(drafts))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Draft review failed");
            e
        })?;

    let selection = resolve_selection(drafts, reply);
    match selection.index {
        Some(index) => tracing::info!(option = index + 1, "Successfully retrieved best post"),
        None => tracing::warn!("Reviewer reply does not match any draft, using it verbatim"),
    }
    Ok(selection)
}

/// Matches a reviewer reply to one of the drafts.
///
/// Tried in order: exact text, text ignoring surrounding whitespace, text
/// ignoring all whitespace differences, then a bare number such as `2`,
/// `#2` or `POST #2`.
///
/// The reply text is never altered; only `index` reflects the match.
fn resolve_selection(drafts: &[String], reply: String) -> Selection {
    let trimmed = reply.trim();
    let squashed = squash_whitespace(trimmed);

    let index = drafts
        .iter()
        .position(|d| *d == reply)
        .or_else(|| drafts.iter().position(|d| d.trim() == trimmed))
        .or_else(|| drafts.iter().position(|d| squash_whitespace(d) == squashed))
        .or_else(|| {
            parse_draft_number(trimmed)
                .filter(|n| (1..=drafts.len()).contains(n))
                .map(|n| n - 1)
        });

    Selection { text: reply, index }
}

fn squash_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_draft_number(reply: &str) -> Option<usize> {
    let lowered = reply.to_ascii_lowercase();
    let rest = ["post", "option", "draft"]
        .iter()
        .find_map(|prefix| lowered.strip_prefix(prefix))
        .unwrap_or(&lowered);
    rest.trim()
        .trim_start_matches('#')
        .trim_end_matches('.')
        .trim()
        .parse()
        .ok()
}
