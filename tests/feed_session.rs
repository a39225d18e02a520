//! Integration tests for the feed session: pagination, refresh fencing,
//! optimistic votes and tab selection.
//!
//! The backend is a scripted [`ForumApi`] that parks every request until the
//! test answers it, so the order in which responses land is fully controlled.

use async_trait::async_trait;
use mistree::api::{Category, FetchError, ForumApi, Pid, Topic};
use mistree::feed::{Endpoint, FeedIdentity, Footer, PageRequest, VoteDirection, VoteError};
use mistree::session::{FeedSession, Notice, SyncEvent};
use mistree::tabs::TabSet;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

// ============================================================================
// Scripted backend
// ============================================================================

enum Call {
    Page {
        request: PageRequest,
        reply: oneshot::Sender<Result<Vec<Topic>, FetchError>>,
    },
    Vote {
        pid: Pid,
        delta: i64,
        reply: oneshot::Sender<Result<(), FetchError>>,
    },
}

struct ScriptedApi {
    calls: mpsc::UnboundedSender<Call>,
    categories: Vec<Category>,
}

#[async_trait]
impl ForumApi for ScriptedApi {
    async fn fetch_topics(&self, request: &PageRequest) -> Result<Vec<Topic>, FetchError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.calls.send(Call::Page {
            request: request.clone(),
            reply,
        });
        rx.await.unwrap_or(Err(FetchError::Timeout))
    }

    async fn categories(&self) -> Result<Vec<Category>, FetchError> {
        Ok(self.categories.clone())
    }

    async fn vote(&self, pid: Pid, delta: i64) -> Result<(), FetchError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.calls.send(Call::Vote { pid, delta, reply });
        rx.await.unwrap_or(Err(FetchError::Timeout))
    }
}

struct Harness {
    session: FeedSession<ScriptedApi>,
    calls: mpsc::UnboundedReceiver<Call>,
    events: mpsc::Receiver<SyncEvent>,
}

impl Harness {
    fn new(page_size: u32) -> Self {
        Self::with_tabs(page_size, TabSet::default_tabs())
    }

    fn with_tabs(page_size: u32, tabs: TabSet) -> Self {
        let (call_tx, calls) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::channel(32);
        let api = Arc::new(ScriptedApi {
            calls: call_tx,
            categories: Vec::new(),
        });
        Self {
            session: FeedSession::new(api, page_size, tabs, event_tx),
            calls,
            events,
        }
    }

    async fn next_call(&mut self) -> Call {
        tokio::time::timeout(Duration::from_secs(5), self.calls.recv())
            .await
            .expect("no backend call was made")
            .expect("call channel closed")
    }

    async fn next_page_call(
        &mut self,
    ) -> (PageRequest, oneshot::Sender<Result<Vec<Topic>, FetchError>>) {
        match self.next_call().await {
            Call::Page { request, reply } => (request, reply),
            Call::Vote { .. } => panic!("expected a page request, got a vote"),
        }
    }

    async fn next_vote_call(&mut self) -> (Pid, i64, oneshot::Sender<Result<(), FetchError>>) {
        match self.next_call().await {
            Call::Vote { pid, delta, reply } => (pid, delta, reply),
            Call::Page { .. } => panic!("expected a vote, got a page request"),
        }
    }

    /// Wait for the next completion and apply it.
    async fn pump(&mut self) -> mistree::session::EventResult {
        let event = tokio::time::timeout(Duration::from_secs(5), self.events.recv())
            .await
            .expect("no completion arrived")
            .expect("event channel closed");
        self.session.handle_event(event)
    }

    /// Answer the next page request with `topics` and apply the completion.
    async fn serve_page(&mut self, topics: Vec<Topic>) -> PageRequest {
        let (request, reply) = self.next_page_call().await;
        reply.send(Ok(topics)).unwrap();
        self.pump().await;
        request
    }

    fn tids(&self, feed: &FeedIdentity) -> Vec<u64> {
        self.session
            .visible_topics(feed)
            .iter()
            .map(|t| t.tid)
            .collect()
    }

    fn votes(&self, feed: &FeedIdentity, tid: u64) -> i64 {
        self.session.cache().topic(feed, tid).unwrap().votes
    }
}

fn topics(range: std::ops::RangeInclusive<u64>) -> Vec<Topic> {
    range.map(|tid| Topic::new(tid, Some(tid * 10), 0)).collect()
}

// ============================================================================
// Pagination
// ============================================================================

#[tokio::test]
async fn test_two_pages_then_exhausted() {
    let mut h = Harness::new(20);
    let feed = FeedIdentity::Recent;

    assert!(h.session.ensure_next_page(&feed));
    let first = h.serve_page(topics(1..=20)).await;
    assert_eq!(
        first,
        PageRequest {
            endpoint: Endpoint::RecentTopics,
            page: 1,
            page_size: 20
        }
    );
    assert!(h.session.status(&feed).has_next_page);

    assert!(h.session.ensure_next_page(&feed));
    let second = h.serve_page(topics(21..=34)).await;
    assert_eq!(second.page, 2);

    let status = h.session.status(&feed);
    assert_eq!(status.page_count, 2);
    assert_eq!(status.topic_count, 34);
    assert!(!status.has_next_page);
    assert_eq!(status.footer(), Footer::NoMoreData);
    assert_eq!(h.tids(&feed), (1..=34).collect::<Vec<_>>());

    // Exhausted: further triggers issue no request.
    assert!(!h.session.ensure_next_page(&feed));
    assert!(h.calls.try_recv().is_err());
}

#[tokio::test]
async fn test_trigger_while_pending_is_dropped() {
    let mut h = Harness::new(20);
    let feed = FeedIdentity::Popular;

    assert!(h.session.ensure_next_page(&feed));
    assert!(!h.session.ensure_next_page(&feed));
    assert!(!h.session.ensure_next_page(&feed));

    let (request, reply) = h.next_page_call().await;
    assert_eq!(request.endpoint, Endpoint::PopularTopics);
    assert!(h.session.status(&feed).is_fetching);

    reply.send(Ok(topics(1..=20))).unwrap();
    h.pump().await;
    assert!(h.calls.try_recv().is_err());
    assert_eq!(h.session.status(&feed).page_count, 1);
}

#[tokio::test]
async fn test_failed_page_keeps_cache_and_can_be_retried() {
    let mut h = Harness::new(20);
    let feed = FeedIdentity::Recent;

    h.session.ensure_next_page(&feed);
    h.serve_page(topics(1..=20)).await;

    h.session.ensure_next_page(&feed);
    let (_, reply) = h.next_page_call().await;
    reply.send(Err(FetchError::HttpStatus(503))).unwrap();
    let result = h.pump().await;
    assert!(matches!(
        result.notice,
        Some(Notice::FetchFailed { page_param: 2, .. })
    ));

    let status = h.session.status(&feed);
    assert_eq!(status.topic_count, 20);
    assert!(status.error.is_some());

    // The next trigger asks for page 2 again.
    assert!(h.session.ensure_next_page(&feed));
    let retry = h.serve_page(topics(21..=25)).await;
    assert_eq!(retry.page, 2);
    assert!(h.session.status(&feed).error.is_none());
}

// ============================================================================
// Refresh and stale results
// ============================================================================

#[tokio::test]
async fn test_stale_next_page_dropped_after_invalidate() {
    let mut h = Harness::new(20);
    let feed = FeedIdentity::Recent;

    h.session.ensure_next_page(&feed);
    h.serve_page(topics(1..=20)).await;

    // Page 2 is requested, then the feed is refreshed before it lands.
    h.session.ensure_next_page(&feed);
    let (_, stale_reply) = h.next_page_call().await;
    h.session.invalidate(&feed);
    let (refresh_request, refresh_reply) = h.next_page_call().await;
    assert_eq!(refresh_request.page, 1);
    assert!(h.session.status(&feed).is_refreshing);

    stale_reply.send(Ok(topics(21..=40))).unwrap();
    let stale = h.pump().await;
    assert!(stale.changed.is_none());
    assert!(stale.notice.is_none());
    assert!(h.tids(&feed).is_empty());

    refresh_reply.send(Ok(topics(101..=105))).unwrap();
    h.pump().await;
    assert_eq!(h.tids(&feed), (101..=105).collect::<Vec<_>>());
    assert_eq!(h.session.status(&feed).page_count, 1);
}

#[tokio::test]
async fn test_feeds_are_independent() {
    let mut h = Harness::new(20);
    let recent = FeedIdentity::Recent;
    let category = FeedIdentity::category(7);

    h.session.ensure_next_page(&recent);
    h.serve_page(topics(1..=3)).await;
    h.session.ensure_next_page(&category);
    let request = h.serve_page(topics(50..=51)).await;
    assert_eq!(request.endpoint.path(), "/api/v3/categories/7/topics");

    h.session.invalidate(&category);
    let _pending = h.next_page_call().await;

    assert_eq!(h.tids(&recent), vec![1, 2, 3]);
    assert!(h.tids(&category).is_empty());
}

// ============================================================================
// Projection
// ============================================================================

#[tokio::test]
async fn test_deleted_topics_hidden_but_cached() {
    let mut h = Harness::new(20);
    let feed = FeedIdentity::Recent;

    h.session.ensure_next_page(&feed);
    h.serve_page(vec![
        Topic::new(1, Some(10), 0),
        Topic::new(2, Some(20), 0).deleted(true),
        Topic::new(3, Some(30), 0),
    ])
    .await;

    assert_eq!(h.tids(&feed), vec![1, 3]);
    assert_eq!(h.session.display_sequence(&feed).len(), 3);
    assert_eq!(h.session.status(&feed).topic_count, 3);
}

// ============================================================================
// Votes
// ============================================================================

#[tokio::test]
async fn test_vote_failure_rolls_back_and_reports_once() {
    let mut h = Harness::new(20);
    let feed = FeedIdentity::Recent;

    h.session.ensure_next_page(&feed);
    h.serve_page(vec![Topic::new(5, Some(100), 3)]).await;

    h.session.apply_vote(&feed, 5, VoteDirection::Up).unwrap();
    assert_eq!(h.votes(&feed, 5), 4);

    let (pid, delta, reply) = h.next_vote_call().await;
    assert_eq!((pid, delta), (100, 1));
    reply.send(Err(FetchError::HttpStatus(500))).unwrap();

    let result = h.pump().await;
    assert!(matches!(
        result.notice,
        Some(Notice::VoteFailed(VoteError::ConfirmationFailed { tid: 5, .. }))
    ));
    assert_eq!(h.votes(&feed, 5), 3);

    // Exactly one completion, no retry.
    assert!(h.events.try_recv().is_err());
    assert!(h.calls.try_recv().is_err());
}

#[tokio::test]
async fn test_vote_confirmed_keeps_delta() {
    let mut h = Harness::new(20);
    let feed = FeedIdentity::Recent;

    h.session.ensure_next_page(&feed);
    h.serve_page(vec![Topic::new(8, Some(80), 0)]).await;

    h.session.apply_vote(&feed, 8, VoteDirection::Down).unwrap();
    let (_, delta, reply) = h.next_vote_call().await;
    assert_eq!(delta, -1);
    reply.send(Ok(())).unwrap();

    let result = h.pump().await;
    assert!(result.notice.is_none());
    assert_eq!(h.votes(&feed, 8), -1);
}

#[tokio::test]
async fn test_vote_without_main_post_rejected_locally() {
    let mut h = Harness::new(20);
    let feed = FeedIdentity::Recent;

    h.session.ensure_next_page(&feed);
    h.serve_page(vec![Topic::new(5, None, 3)]).await;

    let err = h
        .session
        .apply_vote(&feed, 5, VoteDirection::Up)
        .unwrap_err();
    assert!(matches!(err, VoteError::MissingVoteTarget { tid: 5 }));
    assert_eq!(h.votes(&feed, 5), 3);
    assert!(h.calls.try_recv().is_err());
}

#[tokio::test]
async fn test_vote_failure_after_refresh_not_rolled_back() {
    let mut h = Harness::new(20);
    let feed = FeedIdentity::Recent;

    h.session.ensure_next_page(&feed);
    h.serve_page(vec![Topic::new(5, Some(100), 3)]).await;

    h.session.apply_vote(&feed, 5, VoteDirection::Up).unwrap();
    let (_, _, vote_reply) = h.next_vote_call().await;

    h.session.invalidate(&feed);
    h.serve_page(vec![Topic::new(5, Some(100), 3)]).await;

    vote_reply.send(Err(FetchError::Timeout)).unwrap();
    let result = h.pump().await;
    assert!(result.notice.is_some());
    assert_eq!(h.votes(&feed, 5), 3);
}

// ============================================================================
// Tabs
// ============================================================================

#[tokio::test]
async fn test_select_tab_loads_unfetched_feed() {
    let mut h = Harness::new(20);
    assert_eq!(h.session.active_identity(), &FeedIdentity::Recent);

    let tab = h.session.select_tab(1).unwrap();
    assert_eq!(tab.identity, FeedIdentity::Popular);
    let (request, _reply) = h.next_page_call().await;
    assert_eq!(request.endpoint, Endpoint::PopularTopics);

    let selected: Vec<bool> = h
        .session
        .tabs()
        .tabs()
        .iter()
        .map(|t| t.is_selected())
        .collect();
    assert_eq!(selected, vec![false, true]);
}

#[tokio::test]
async fn test_select_out_of_range_keeps_selection() {
    let mut h = Harness::new(20);
    assert!(h.session.select_tab(9).is_err());
    assert_eq!(h.session.tabs().selected_index(), 0);
    assert!(h.calls.try_recv().is_err());
}

#[tokio::test]
async fn test_category_tabs_from_backend() {
    let (call_tx, _calls) = mpsc::unbounded_channel();
    let api = ScriptedApi {
        calls: call_tx,
        categories: vec![Category {
            cid: 4,
            name: "General".to_string(),
            slug: None,
            description: None,
        }],
    };

    let tabs = mistree::session::load_tabs(&api, true).await;
    let titles: Vec<&str> = tabs.tabs().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Latest", "Popular", "General"]);
    assert_eq!(tabs.tabs()[2].identity, FeedIdentity::category(4));

    let plain = mistree::session::load_tabs(&api, false).await;
    assert_eq!(plain.len(), 2);
}
