//! Feed identities and their mapping onto backend queries.
//!
//! Raw feed keys (`"recent"`, `"popular"`, `"category:12"`, `"12"`) are
//! validated once, here, into the closed [`FeedIdentity`] union. Everything
//! downstream works with the typed value and can no longer see a bad key.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedError {
    /// The raw key did not name a known feed source.
    #[error("Invalid feed identity: {0:?}")]
    InvalidFeedIdentity(String),
}

/// Identifier of a forum category. Numeric ids and slugs are both accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CategoryId(String);

impl CategoryId {
    /// Validate a category identifier.
    ///
    /// The id is interpolated into a URL path, so only ASCII alphanumerics,
    /// `-` and `_` are allowed.
    pub fn new(raw: &str) -> Result<Self, FeedError> {
        let trimmed = raw.trim();
        let valid = !trimmed.is_empty()
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(FeedError::InvalidFeedIdentity(raw.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for CategoryId {
    fn from(cid: u64) -> Self {
        Self(cid.to_string())
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which topic list is being viewed. Used as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedIdentity {
    Recent,
    Popular,
    Category(CategoryId),
}

impl FeedIdentity {
    /// Category feed for a numeric category id.
    pub fn category(cid: u64) -> Self {
        FeedIdentity::Category(CategoryId::from(cid))
    }
}

impl FromStr for FeedIdentity {
    type Err = FeedError;

    /// Parse a raw feed key.
    ///
    /// Accepts `recent`, `popular`, `category:<id>`, or a bare numeric
    /// category id. Anything else is rejected, never defaulted.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key = raw.trim();
        match key {
            "recent" => Ok(FeedIdentity::Recent),
            "popular" => Ok(FeedIdentity::Popular),
            _ => {
                if let Some(id) = key.strip_prefix("category:") {
                    return CategoryId::new(id)
                        .map(FeedIdentity::Category)
                        .map_err(|_| FeedError::InvalidFeedIdentity(raw.to_string()));
                }
                if !key.is_empty() && key.chars().all(|c| c.is_ascii_digit()) {
                    return Ok(FeedIdentity::Category(CategoryId(key.to_string())));
                }
                Err(FeedError::InvalidFeedIdentity(raw.to_string()))
            }
        }
    }
}

impl fmt::Display for FeedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedIdentity::Recent => f.write_str("recent"),
            FeedIdentity::Popular => f.write_str("popular"),
            FeedIdentity::Category(cid) => write!(f, "category:{}", cid),
        }
    }
}

// ============================================================================
// Query descriptors
// ============================================================================

/// Backend endpoint serving a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    RecentTopics,
    PopularTopics,
    CategoryTopics(CategoryId),
}

impl Endpoint {
    /// Path relative to the forum base URL.
    pub fn path(&self) -> String {
        match self {
            Endpoint::RecentTopics => "/api/recent".to_string(),
            Endpoint::PopularTopics => "/api/popular".to_string(),
            Endpoint::CategoryTopics(cid) => format!("/api/v3/categories/{}/topics", cid),
        }
    }
}

/// One bounded page request: endpoint plus pagination parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub endpoint: Endpoint,
    /// 1-based page index.
    pub page: u32,
    pub page_size: u32,
}

/// Map a feed identity onto the endpoint that serves it.
pub fn resolve(identity: &FeedIdentity) -> Endpoint {
    match identity {
        FeedIdentity::Recent => Endpoint::RecentTopics,
        FeedIdentity::Popular => Endpoint::PopularTopics,
        FeedIdentity::Category(cid) => Endpoint::CategoryTopics(cid.clone()),
    }
}
