//! Turn a blog article from an RSS feed into a LinkedIn post.
//!
//! The [`pipeline::Pipeline`] fetches the feed, finds the article by exact
//! title, has a chat model write three drafts, has it pick the best one, and
//! appends a fixed closing block with the article link and hashtags.

pub mod compose;
pub mod config;
pub mod feed;
pub mod http;
pub mod pipeline;
pub mod post;
pub mod util;
