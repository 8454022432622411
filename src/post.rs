//! Final post assembly: the chosen draft plus a fixed closing block.

const CALL_TO_ACTION: &str = "Check out the article here -->";
const SIGN_OFF: &str = "Until next time… ☟";
const SITE_URL: &str = "https://www.beardeddata.com";

/// Builds the hashtag line from article tags.
///
/// Tags are joined with `" #"`, leading whitespace is trimmed, every hyphen
/// is deleted, and the result is prefixed with `#`. No tags gives a bare `#`.
pub fn hashtag_line(tags: &[String]) -> String {
    let joined = tags.join(" #");
    format!("#{}", joined.trim_start().replace('-', ""))
}

/// Appends the call-to-action, sign-off, site URL and hashtags to a draft.
///
/// ```
/// use postwright::post::assemble;
///
/// let post = assemble("Hello", &["Tag1".to_string(), "Tag2".to_string()], "https://x");
/// assert_eq!(
///     post,
///     "Hello\n\nCheck out the article here --> https://x\n\nUntil next time… ☟\nhttps://www.beardeddata.com\n\n#Tag1 #Tag2"
/// );
/// ```
pub fn assemble(selected_draft: &str, tags: &[String], article_url: &str) -> String {
    format!(
        "{selected_draft}\n\n{CALL_TO_ACTION} {article_url}\n\n{SIGN_OFF}\n{SITE_URL}\n\n{}",
        hashtag_line(tags)
    )
}
