//! Forum backend access.
//!
//! The sync core talks to the forum through the [`ForumApi`] trait so the
//! pagination and voting logic can be driven by either the real HTTP client
//! ([`HttpForumApi`]) or a scripted implementation in tests.
//!
//! - [`types`] - Wire types (`Topic`, `Category`) and response envelopes
//! - [`client`] - `reqwest`-based implementation with bounded responses

mod client;
mod types;

pub use client::HttpForumApi;
pub use types::{Category, Pid, Tid, Topic};
pub(crate) use types::{CategoryList, Envelope, TopicList, VoteBody};

use crate::feed::PageRequest;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while talking to the forum backend.
///
/// Everything except [`FetchError::InvalidRequest`] is a transient
/// network-class failure: the caller may retry by refreshing the feed or
/// requesting the next page again.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body was not the expected JSON shape
    #[error("Decode error: {0}")]
    Decode(String),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// The request itself was malformed (page 0, page size 0, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl FetchError {
    /// Returns true for failures that may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network(_)
            | FetchError::Timeout
            | FetchError::Decode(_)
            | FetchError::ResponseTooLarge => true,
            FetchError::HttpStatus(status) => *status >= 500 || *status == 429,
            FetchError::InvalidRequest(_) => false,
        }
    }
}

/// Backend operations consumed by the sync core.
///
/// Implementations must not retry internally; retry is a caller decision
/// (pull-to-refresh or another next-page request).
#[async_trait]
pub trait ForumApi: Send + Sync {
    /// Fetch one page of topics for an already-resolved query.
    async fn fetch_topics(&self, request: &PageRequest) -> Result<Vec<Topic>, FetchError>;

    /// Fetch the list of categories available as feed sources.
    async fn categories(&self) -> Result<Vec<Category>, FetchError>;

    /// Cast a vote of `delta` (+1 or -1) on a post.
    async fn vote(&self, pid: Pid, delta: i64) -> Result<(), FetchError>;
}
