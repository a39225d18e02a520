use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Identifiers
// ============================================================================

/// Topic identifier, unique within a feed's lifetime.
pub type Tid = u64;

/// Post identifier. Votes are cast against a topic's main post.
pub type Pid = u64;

// ============================================================================
// Topic
// ============================================================================

/// A forum topic as returned by the topic list endpoints.
///
/// Only `tid`, `main_pid`, `votes` and `deleted` drive the sync core. The
/// remaining fields are decoded when present for display and are never
/// required. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Topic {
    pub tid: Tid,
    #[serde(rename = "mainPid", default)]
    pub main_pid: Option<Pid>,
    #[serde(default)]
    pub votes: i64,
    /// Soft-deleted by the server: hidden from view, still cached.
    #[serde(default, deserialize_with = "bool_or_int")]
    pub deleted: bool,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(rename = "postcount", default)]
    pub post_count: Option<u64>,
    /// Creation time in milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl Topic {
    /// Minimal topic carrying just the fields the sync core depends on.
    pub fn new(tid: Tid, main_pid: Option<Pid>, votes: i64) -> Self {
        Self {
            tid,
            main_pid,
            votes,
            deleted: false,
            title: None,
            slug: None,
            post_count: None,
            timestamp: None,
        }
    }

    /// Builder-style helper for marking a topic as soft-deleted.
    pub fn deleted(mut self, deleted: bool) -> Self {
        self.deleted = deleted;
        self
    }

    /// Builder-style helper for attaching a display title.
    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Forum servers report flags as either JSON booleans or 0/1 integers.
fn bool_or_int<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Null(()),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
        Flag::Null(()) => false,
    })
}

// ============================================================================
// Category
// ============================================================================

/// A forum category, used to build additional feed tabs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    pub cid: u64,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

// ============================================================================
// Wire envelopes
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct TopicList {
    pub topics: Vec<Topic>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryList {
    pub categories: Vec<Category>,
}

/// Legacy endpoints return the payload bare, v3 endpoints wrap it in
/// `{status, response}`. Either shape is accepted everywhere.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    Wrapped { response: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { response } => response,
            Envelope::Bare(inner) => inner,
        }
    }
}

/// Request body for a vote confirmation.
#[derive(Debug, Serialize)]
pub(crate) struct VoteBody {
    pub delta: i64,
}
