use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Base of every Medium author feed; the username is appended after `@`.
const MEDIUM_FEED_BASE: &str = "https://medium.com/feed/@";

/// Errors that can occur during URL validation.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component (e.g. `http:/feed`).
    #[error("URL has no host: {0}")]
    MissingHost(String),
    /// The username used to build a feed URL was empty or contained whitespace.
    #[error("Invalid username: {0:?}")]
    InvalidUsername(String),
}

/// Validates a URL string for use as a feed source or API base.
///
/// Only syntax is checked: the URL must parse, use `http` or `https`, and
/// name a host. Reachability is left to the HTTP client.
///
/// # Examples
///
/// ```
/// use postwright::util::validate_url;
///
/// let url = validate_url("https://example.com/feed.xml").unwrap();
/// assert_eq!(url.host_str(), Some("example.com"));
///
/// assert!(validate_url("file:///etc/passwd").is_err());
/// assert!(validate_url("not a url").is_err());
/// ```
pub fn validate_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlValidationError::MissingHost(url_str.to_owned()));
    }

    Ok(url)
}

/// Builds the RSS feed URL of a Medium author.
///
/// A leading `@` on the username is tolerated, so both `jane` and `@jane`
/// resolve to `https://medium.com/feed/@jane`.
pub fn medium_feed_url(username: &str) -> Result<Url, UrlValidationError> {
    let name = username.trim();
    let name = name.strip_prefix('@').unwrap_or(name);

    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(UrlValidationError::InvalidUsername(username.to_owned()));
    }

    validate_url(&format!("{MEDIUM_FEED_BASE}{name}"))
}

/// Returns true when the URL points at the local machine.
///
/// Used to allow plain-HTTP API base URLs for local testing only.
pub fn is_local_host(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    if host == "localhost" {
        return true;
    }

    // Strip brackets from IPv6 addresses for parsing
    let host_for_parse = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    host_for_parse
        .parse::<IpAddr>()
        .is_ok_and(|ip| ip.is_loopback())
}
