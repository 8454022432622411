//! Shared HTTP client for feed fetches and chat requests.

use reqwest::redirect::Policy;
use std::time::Duration;

/// Generous enough for a long completion; feeds return well within it.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const USER_AGENT: &str = concat!("postwright/", env!("CARGO_PKG_VERSION"));

/// Feed hosts commonly bounce `http` to `https` or a vanity domain to its
/// canonical one; anything longer than this is treated as misconfiguration.
const MAX_REDIRECTS: usize = 3;

/// Follows at most [`MAX_REDIRECTS`] hops and refuses a URL already visited
/// in the same chain. A refused redirect surfaces as a transport error, so a
/// feed fetch reports `FetchError::Network` and a chat call
/// `ServiceError::Network`.
fn redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        let hops = attempt.previous().len();
        if hops >= MAX_REDIRECTS {
            return attempt.error(format!("Too many redirects (max {MAX_REDIRECTS})"));
        }
        if attempt.previous().iter().any(|seen| seen == attempt.url()) {
            return attempt.error("Redirect loop detected");
        }

        tracing::debug!(to = %attempt.url(), hop = hops + 1, "Following redirect");
        attempt.follow()
    })
}

/// Builds the client used for the whole run.
///
/// Each request carries a 60-second timeout; nothing is retried.
pub fn build_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .redirect(redirect_policy())
        .timeout(REQUEST_TIMEOUT)
        .build()
}
