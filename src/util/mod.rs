//! Small helpers shared by the feed and compose layers.
//!
//! - **URL validation**: syntactic checks for feed and API base URLs
//! - **Feed URL construction**: Medium author feeds from a username
//!
//! # Examples
//!
//! ```
//! use postwright::util::{medium_feed_url, validate_url};
//!
//! let feed = medium_feed_url("matt.dixon1010").unwrap();
//! assert_eq!(feed.as_str(), "https://medium.com/feed/@matt.dixon1010");
//!
//! assert!(validate_url("ftp://example.com/feed").is_err());
//! ```

mod url_validator;

pub use url_validator::{is_local_host, medium_feed_url, validate_url, UrlValidationError};
