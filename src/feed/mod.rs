//! Feed synchronization core.
//!
//! Turns a paginated, mutable topic feed into a consistent local view:
//!
//! - [`source`] - Closed set of feed identities and their backend endpoints
//! - [`fetcher`] - One bounded page request per call, no retry
//! - [`cache`] - Ordered pages per identity, pagination continuation,
//!   invalidation with stale-result fencing
//! - [`vote`] - Optimistic vote deltas with exact rollback
//! - [`projector`] - Render sequence with soft-deleted topics hidden
//!
//! None of these perform I/O on their own except [`fetch_page`]. The
//! [`crate::session`] module wires them to a runtime.

pub mod cache;
pub mod fetcher;
pub mod projector;
pub mod source;
pub mod vote;

pub use cache::{FeedCache, FeedStatus, FetchKind, FetchOutcome, FetchTicket, Footer};
pub use fetcher::fetch_page;
pub use projector::project;
pub use source::{resolve, CategoryId, Endpoint, FeedError, FeedIdentity, PageRequest};
pub use vote::{apply_vote, settle_vote, VoteDirection, VoteError, VoteTicket};
