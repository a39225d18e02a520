//! Runtime wiring for the feed core.
//!
//! [`FeedSession`] owns the single mutable [`FeedCache`], the tab selection
//! and an API handle. Operations that need the network spawn a tokio task
//! and return at once; the task reports back with a [`SyncEvent`] on the
//! session's channel, and the owner of the event loop feeds it to
//! [`FeedSession::handle_event`]. All state changes therefore happen on the
//! event loop's task, in the order events are handled.

use crate::api::{FetchError, ForumApi, Tid, Topic};
use crate::feed::{
    apply_vote, fetch_page, project, settle_vote, FeedCache, FeedIdentity, FeedStatus,
    FetchOutcome, FetchTicket, VoteDirection, VoteError, VoteTicket,
};
use crate::tabs::{Tab, TabError, TabSet};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Completion of a background request.
#[derive(Debug)]
pub enum SyncEvent {
    PageLoaded {
        ticket: FetchTicket,
        result: Result<Vec<Topic>, FetchError>,
    },
    VoteSettled {
        ticket: VoteTicket,
        result: Result<(), FetchError>,
    },
}

/// Side-channel report for the UI. Never blocks browsing.
#[derive(Debug)]
pub enum Notice {
    /// A page fetch failed. Cached pages are still shown.
    FetchFailed {
        identity: FeedIdentity,
        page_param: u32,
        error: FetchError,
    },
    /// A vote could not be confirmed and was rolled back.
    VoteFailed(VoteError),
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::FetchFailed {
                identity,
                page_param,
                error,
            } => write!(f, "Could not load page {} of {}: {}", page_param, identity, error),
            Notice::VoteFailed(e) => write!(f, "{}", e),
        }
    }
}

/// What changed after handling a [`SyncEvent`].
#[derive(Debug)]
pub struct EventResult {
    /// Feed whose cached content or status changed, if any.
    pub changed: Option<FeedIdentity>,
    pub notice: Option<Notice>,
}

pub struct FeedSession<A: ForumApi + 'static> {
    api: Arc<A>,
    cache: FeedCache,
    tabs: TabSet,
    event_tx: mpsc::Sender<SyncEvent>,
}

impl<A: ForumApi + 'static> FeedSession<A> {
    pub fn new(
        api: Arc<A>,
        page_size: u32,
        tabs: TabSet,
        event_tx: mpsc::Sender<SyncEvent>,
    ) -> Self {
        Self {
            api,
            cache: FeedCache::new(page_size),
            tabs,
            event_tx,
        }
    }

    pub fn cache(&self) -> &FeedCache {
        &self.cache
    }

    pub fn tabs(&self) -> &TabSet {
        &self.tabs
    }

    /// Identity of the selected tab.
    pub fn active_identity(&self) -> &FeedIdentity {
        &self.tabs.selected().identity
    }

    /// Request the next page of `identity` if one is due.
    ///
    /// Returns false when the trigger was dropped (fetch pending or feed
    /// exhausted).
    pub fn ensure_next_page(&mut self, identity: &FeedIdentity) -> bool {
        match self.cache.ensure_next_page(identity) {
            Some(ticket) => {
                self.spawn_fetch(ticket);
                true
            }
            None => false,
        }
    }

    /// Discard the cached pages of `identity` and reload from page 1.
    pub fn invalidate(&mut self, identity: &FeedIdentity) {
        let ticket = self.cache.invalidate(identity);
        self.spawn_fetch(ticket);
    }

    /// Forget a feed whose view went away.
    pub fn discard(&mut self, identity: &FeedIdentity) -> bool {
        self.cache.discard(identity)
    }

    /// Vote on a cached topic. The count changes before this returns; the
    /// confirmation runs in the background.
    pub fn apply_vote(
        &mut self,
        identity: &FeedIdentity,
        tid: Tid,
        direction: VoteDirection,
    ) -> Result<(), VoteError> {
        let ticket = apply_vote(&mut self.cache, identity, tid, direction)?;

        let api = Arc::clone(&self.api);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = api.vote(ticket.pid, ticket.direction.delta()).await;
            if let Err(e) = tx.send(SyncEvent::VoteSettled { ticket, result }).await {
                tracing::warn!(error = %e, "Failed to send vote result (receiver dropped)");
            }
        });
        Ok(())
    }

    /// Handle a page-change event. Starts the first load of the newly
    /// selected feed if it has never been fetched.
    pub fn select_tab(&mut self, index: usize) -> Result<&Tab, TabError> {
        self.tabs.select(index)?;
        let identity = self.tabs.selected().identity.clone();
        if self.cache.pages(&identity).is_empty() && !self.cache.is_fetching(&identity) {
            self.ensure_next_page(&identity);
        }
        Ok(self.tabs.selected())
    }

    /// Apply a background completion to the cache.
    pub fn handle_event(&mut self, event: SyncEvent) -> EventResult {
        match event {
            SyncEvent::PageLoaded { ticket, result } => {
                match self.cache.complete_fetch(&ticket, result) {
                    FetchOutcome::Appended { .. } => EventResult {
                        changed: Some(ticket.identity),
                        notice: None,
                    },
                    FetchOutcome::Failed(error) => EventResult {
                        notice: Some(Notice::FetchFailed {
                            identity: ticket.identity.clone(),
                            page_param: ticket.page_param,
                            error,
                        }),
                        changed: Some(ticket.identity),
                    },
                    FetchOutcome::Stale => EventResult {
                        changed: None,
                        notice: None,
                    },
                }
            }
            SyncEvent::VoteSettled { ticket, result } => {
                match settle_vote(&mut self.cache, &ticket, result) {
                    Ok(()) => EventResult {
                        changed: None,
                        notice: None,
                    },
                    Err(e) => EventResult {
                        changed: Some(ticket.identity),
                        notice: Some(Notice::VoteFailed(e)),
                    },
                }
            }
        }
    }

    /// Raw concatenation of cached pages, deleted topics included.
    pub fn display_sequence(&self, identity: &FeedIdentity) -> Vec<Arc<Topic>> {
        self.cache.display_sequence(identity)
    }

    /// Render-ready topics: cached pages with soft-deleted topics hidden.
    pub fn visible_topics(&self, identity: &FeedIdentity) -> Vec<Arc<Topic>> {
        project(&self.cache.display_sequence(identity))
    }

    pub fn status(&self, identity: &FeedIdentity) -> FeedStatus {
        self.cache.status(identity)
    }

    fn spawn_fetch(&self, ticket: FetchTicket) {
        let api = Arc::clone(&self.api);
        let tx = self.event_tx.clone();
        let page_size = self.cache.page_size();

        tracing::debug!(
            feed = %ticket.identity,
            page = ticket.page_param,
            generation = ticket.generation,
            "Spawning page fetch"
        );

        tokio::spawn(async move {
            let result = fetch_page(&*api, &ticket.identity, ticket.page_param, page_size).await;
            if let Err(e) = tx.send(SyncEvent::PageLoaded { ticket, result }).await {
                // Teardown: nobody is consuming results any more.
                tracing::debug!(error = %e, "Failed to send page result (receiver dropped)");
            }
        });
    }
}

/// Build the tab set, optionally extended with the forum's categories.
///
/// A failed category fetch falls back to the default tabs.
pub async fn load_tabs<A: ForumApi + ?Sized>(api: &A, with_categories: bool) -> TabSet {
    if !with_categories {
        return TabSet::default_tabs();
    }
    match api.categories().await {
        Ok(categories) => {
            tracing::debug!(count = categories.len(), "Loaded categories");
            TabSet::with_categories(&categories)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load categories, using default tabs");
            TabSet::default_tabs()
        }
    }
}
