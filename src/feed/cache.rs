//! Per-feed page cache with pagination continuation and stale-result fencing.
//!
//! The cache is a plain state machine. It never performs I/O itself: the
//! operations that start a fetch hand back a [`FetchTicket`] describing the
//! request to make, and the caller reports the response with
//! [`FeedCache::complete_fetch`]. This keeps every mutation on the owning
//! thread while network calls run elsewhere.
//!
//! Each ticket carries the generation of the feed state it was issued
//! against. Invalidation and discard move the feed to a fresh generation, so
//! a response that arrives for an older generation is dropped instead of
//! appended.

use crate::api::{FetchError, Tid, Topic};
use crate::feed::source::FeedIdentity;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Why a fetch was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// Continuation of the feed (including the very first page).
    NextPage,
    /// Full refresh after an invalidate.
    Refresh,
}

/// A fetch the cache has admitted and is waiting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub identity: FeedIdentity,
    pub page_param: u32,
    pub generation: u64,
    pub kind: FetchKind,
}

/// Result of reporting a fetch response to the cache.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The page was appended.
    Appended {
        page_param: u32,
        len: usize,
        has_next_page: bool,
    },
    /// The fetch failed. Cached pages are untouched.
    Failed(FetchError),
    /// The response belonged to an older generation and was dropped.
    Stale,
}

/// Footer affordance for the rendered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Footer {
    /// A continuation page is being fetched.
    LoadingMore,
    /// The feed is exhausted.
    NoMoreData,
    Idle,
}

/// Loading and pagination status of one feed, for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedStatus {
    pub has_next_page: bool,
    pub is_fetching: bool,
    pub is_fetching_next_page: bool,
    pub is_refreshing: bool,
    pub page_count: usize,
    pub topic_count: usize,
    /// Message of the most recent failed fetch, cleared by the next success.
    pub error: Option<String>,
}

impl FeedStatus {
    pub fn footer(&self) -> Footer {
        if !self.has_next_page {
            Footer::NoMoreData
        } else if self.is_fetching_next_page {
            Footer::LoadingMore
        } else {
            Footer::Idle
        }
    }

    /// True when the list should show its empty placeholder.
    pub fn is_empty(&self) -> bool {
        self.topic_count == 0 && !self.is_fetching
    }
}

#[derive(Debug)]
struct Page {
    page_param: u32,
    tids: Vec<Tid>,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    page_param: u32,
    kind: FetchKind,
}

#[derive(Debug)]
struct FeedState {
    /// Ascending, contiguous from page 1.
    pages: Vec<Page>,
    topics: HashMap<Tid, Arc<Topic>>,
    /// Speculative votes awaiting confirmation, per topic.
    pending_votes: HashMap<Tid, u32>,
    has_next_page: bool,
    in_flight: Option<InFlight>,
    generation: u64,
    error: Option<String>,
}

impl FeedState {
    fn new(generation: u64) -> Self {
        Self {
            pages: Vec::new(),
            topics: HashMap::new(),
            pending_votes: HashMap::new(),
            has_next_page: true,
            in_flight: None,
            generation,
            error: None,
        }
    }

    fn next_page_param(&self) -> u32 {
        self.pages.last().map_or(1, |p| p.page_param + 1)
    }
}

/// Ordered page cache for every feed identity currently in view.
#[derive(Debug)]
pub struct FeedCache {
    page_size: u32,
    feeds: HashMap<FeedIdentity, FeedState>,
    /// Shared across identities so a recreated feed never reuses a
    /// generation an outstanding ticket could still carry.
    next_generation: u64,
}

impl FeedCache {
    /// Create an empty cache. `page_size` is clamped to at least 1.
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            feeds: HashMap::new(),
            next_generation: 0,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    fn bump_generation(&mut self) -> u64 {
        self.next_generation = self.next_generation.wrapping_add(1);
        self.next_generation
    }

    /// Admit a fetch of the next page, if one is due.
    ///
    /// Returns `None` (and changes nothing) when a fetch is already in flight
    /// for `identity` or the feed is exhausted. A trigger that arrives while
    /// a fetch is pending is dropped, not queued. Creates the feed state on
    /// first use.
    pub fn ensure_next_page(&mut self, identity: &FeedIdentity) -> Option<FetchTicket> {
        if !self.feeds.contains_key(identity) {
            let generation = self.bump_generation();
            self.feeds.insert(identity.clone(), FeedState::new(generation));
        }
        let state = self.feeds.get_mut(identity)?;

        if let Some(in_flight) = state.in_flight {
            tracing::debug!(
                feed = %identity,
                pending_page = in_flight.page_param,
                "Fetch already in flight, dropping trigger"
            );
            return None;
        }
        if !state.has_next_page {
            tracing::debug!(feed = %identity, "Feed exhausted, nothing to fetch");
            return None;
        }

        let page_param = state.next_page_param();
        state.in_flight = Some(InFlight {
            page_param,
            kind: FetchKind::NextPage,
        });

        Some(FetchTicket {
            identity: identity.clone(),
            page_param,
            generation: state.generation,
            kind: FetchKind::NextPage,
        })
    }

    /// Drop every cached page for `identity` and admit a fresh fetch of page 1.
    ///
    /// Any fetch already in flight is orphaned: its response will be
    /// reported against an old generation and discarded.
    pub fn invalidate(&mut self, identity: &FeedIdentity) -> FetchTicket {
        let generation = self.bump_generation();
        let mut state = FeedState::new(generation);
        state.in_flight = Some(InFlight {
            page_param: 1,
            kind: FetchKind::Refresh,
        });
        if let Some(old) = self.feeds.insert(identity.clone(), state) {
            tracing::debug!(
                feed = %identity,
                dropped_pages = old.pages.len(),
                orphaned = old.in_flight.is_some(),
                generation,
                "Feed invalidated"
            );
        }

        FetchTicket {
            identity: identity.clone(),
            page_param: 1,
            generation,
            kind: FetchKind::Refresh,
        }
    }

    /// Forget a feed entirely (its view went away).
    ///
    /// Outstanding fetches are not cancelled; their results are discarded
    /// when they arrive. Returns true if the feed was cached.
    pub fn discard(&mut self, identity: &FeedIdentity) -> bool {
        self.feeds.remove(identity).is_some()
    }

    /// Report the response for a previously admitted fetch.
    pub fn complete_fetch(
        &mut self,
        ticket: &FetchTicket,
        result: Result<Vec<Topic>, FetchError>,
    ) -> FetchOutcome {
        let page_size = self.page_size as usize;
        let Some(state) = self.feeds.get_mut(&ticket.identity) else {
            tracing::debug!(feed = %ticket.identity, page = ticket.page_param, "Result for discarded feed dropped");
            return FetchOutcome::Stale;
        };

        let current = state.generation == ticket.generation
            && state
                .in_flight
                .is_some_and(|f| f.page_param == ticket.page_param);
        if !current {
            tracing::debug!(
                feed = %ticket.identity,
                page = ticket.page_param,
                ticket_generation = ticket.generation,
                generation = state.generation,
                "Stale fetch result dropped"
            );
            return FetchOutcome::Stale;
        }

        state.in_flight = None;

        let topics = match result {
            Ok(topics) => topics,
            Err(e) => {
                tracing::warn!(
                    feed = %ticket.identity,
                    page = ticket.page_param,
                    error = %e,
                    "Page fetch failed"
                );
                state.error = Some(e.to_string());
                return FetchOutcome::Failed(e);
            }
        };

        let len = topics.len();
        let mut tids = Vec::with_capacity(len);
        for topic in topics {
            tids.push(topic.tid);
            match state.topics.get_mut(&topic.tid) {
                // Drifted down from an earlier page: the newer copy is server
                // truth, except for a count carrying an unconfirmed vote.
                Some(existing) => {
                    let mut topic = topic;
                    if state.pending_votes.contains_key(&topic.tid) {
                        topic.votes = existing.votes;
                    }
                    tracing::debug!(
                        feed = %ticket.identity,
                        page = ticket.page_param,
                        tid = topic.tid,
                        "Topic repeated on a later page, record refreshed"
                    );
                    *existing = Arc::new(topic);
                }
                None => {
                    state.topics.insert(topic.tid, Arc::new(topic));
                }
            }
        }
        state.pages.push(Page {
            page_param: ticket.page_param,
            tids,
        });
        state.has_next_page = len == page_size;
        state.error = None;

        if ticket.kind == FetchKind::Refresh {
            tracing::info!(feed = %ticket.identity, topics = len, "Feed refreshed");
        }

        FetchOutcome::Appended {
            page_param: ticket.page_param,
            len,
            has_next_page: state.has_next_page,
        }
    }

    /// All cached topics of `identity`, concatenated in page order.
    ///
    /// Soft-deleted topics are included; hiding them is the projector's job.
    /// A topic listed on more than one page appears once, at its first slot.
    pub fn display_sequence(&self, identity: &FeedIdentity) -> Vec<Arc<Topic>> {
        let Some(state) = self.feeds.get(identity) else {
            return Vec::new();
        };
        let mut seen = HashSet::with_capacity(state.topics.len());
        state
            .pages
            .iter()
            .flat_map(|page| page.tids.iter())
            .filter(|tid| seen.insert(**tid))
            .filter_map(|tid| state.topics.get(tid).map(Arc::clone))
            .collect()
    }

    /// Page params and lengths, in order.
    pub fn pages(&self, identity: &FeedIdentity) -> Vec<(u32, usize)> {
        self.feeds
            .get(identity)
            .map(|state| {
                state
                    .pages
                    .iter()
                    .map(|p| (p.page_param, p.tids.len()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn topic(&self, identity: &FeedIdentity, tid: Tid) -> Option<Arc<Topic>> {
        self.feeds.get(identity)?.topics.get(&tid).map(Arc::clone)
    }

    pub fn has_next_page(&self, identity: &FeedIdentity) -> bool {
        self.feeds.get(identity).map_or(true, |s| s.has_next_page)
    }

    pub fn is_fetching(&self, identity: &FeedIdentity) -> bool {
        self.feeds
            .get(identity)
            .is_some_and(|s| s.in_flight.is_some())
    }

    pub fn status(&self, identity: &FeedIdentity) -> FeedStatus {
        let Some(state) = self.feeds.get(identity) else {
            return FeedStatus {
                has_next_page: true,
                is_fetching: false,
                is_fetching_next_page: false,
                is_refreshing: false,
                page_count: 0,
                topic_count: 0,
                error: None,
            };
        };
        let in_flight = state.in_flight;
        FeedStatus {
            has_next_page: state.has_next_page,
            is_fetching: in_flight.is_some(),
            is_fetching_next_page: in_flight
                .is_some_and(|f| f.kind == FetchKind::NextPage && f.page_param > 1),
            is_refreshing: in_flight.is_some_and(|f| f.kind == FetchKind::Refresh),
            page_count: state.pages.len(),
            topic_count: state.topics.len(),
            error: state.error.clone(),
        }
    }

    /// Current generation of a cached feed.
    pub(crate) fn generation(&self, identity: &FeedIdentity) -> Option<u64> {
        self.feeds.get(identity).map(|s| s.generation)
    }

    /// Add `delta` to a cached topic's vote count, copy-on-write.
    ///
    /// Views holding the previous `Arc<Topic>` keep the old value. Returns the
    /// new count, or `None` if the topic is not cached.
    pub(crate) fn adjust_votes(
        &mut self,
        identity: &FeedIdentity,
        tid: Tid,
        delta: i64,
    ) -> Option<i64> {
        let topic = self.feeds.get_mut(identity)?.topics.get_mut(&tid)?;
        let updated = Arc::make_mut(topic);
        updated.votes += delta;
        Some(updated.votes)
    }

    /// Record a speculative vote on `tid` that has not been settled yet.
    pub(crate) fn begin_vote(&mut self, identity: &FeedIdentity, tid: Tid) {
        if let Some(state) = self.feeds.get_mut(identity) {
            *state.pending_votes.entry(tid).or_insert(0) += 1;
        }
    }

    /// Forget one settled vote on `tid`.
    pub(crate) fn end_vote(&mut self, identity: &FeedIdentity, tid: Tid) {
        let Some(state) = self.feeds.get_mut(identity) else {
            return;
        };
        if let Some(count) = state.pending_votes.get_mut(&tid) {
            *count -= 1;
            if *count == 0 {
                state.pending_votes.remove(&tid);
            }
        }
    }
}
