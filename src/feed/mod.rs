//! Feed retrieval and article lookup.
//!
//! - **Fetching**: a single HTTP GET with a size-bounded body read
//! - **Parsing**: RSS `<item>` elements into [`FeedEntry`] values
//! - **Locating**: exact-title lookup over the parsed entries
//!
//! # Example
//!
//! ```ignore
//! use postwright::feed::{fetch_feed, locate};
//!
//! let entries = fetch_feed(&client, "https://medium.com/feed/@jane").await?;
//! let article = locate(&entries, "My Article");
//! ```

mod fetcher;
mod locator;
mod parser;

use thiserror::Error;

pub use fetcher::fetch_feed;
pub use locator::locate;
pub use parser::{parse_feed, FeedEntry, ParseOutcome};

/// Errors that can occur while fetching or parsing a feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The feed URL is not an absolute http(s) URL
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] crate::util::UrlValidationError),
    /// Network-level error (DNS, connection, TLS, timeout, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response body is not valid UTF-8
    #[error("Invalid UTF-8 in feed")]
    InvalidUtf8,
    /// Feed markup could not be walked
    #[error("Parse error: {0}")]
    Parse(String),
}
