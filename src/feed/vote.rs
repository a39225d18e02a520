//! Optimistic vote updates.
//!
//! [`apply_vote`] changes the cached count immediately and returns a
//! [`VoteTicket`] for the confirming request. Once the request resolves,
//! [`settle_vote`] either accepts the speculative value or applies the exact
//! inverse delta.
//!
//! Votes on the same topic are not serialized. Two votes issued before either
//! confirms both apply at once, and a failure reverts only its own delta, so
//! the displayed count can drift from the server tally until the feed is
//! next refreshed.

use crate::api::{FetchError, Pid, Tid};
use crate::feed::cache::FeedCache;
use crate::feed::source::FeedIdentity;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn delta(self) -> i64 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteDirection::Up => f.write_str("upvote"),
            VoteDirection::Down => f.write_str("downvote"),
        }
    }
}

#[derive(Debug, Error)]
pub enum VoteError {
    /// The topic has no main post to vote on. Nothing was changed.
    #[error("Topic {tid} has no post to vote on")]
    MissingVoteTarget { tid: Tid },
    /// The topic is not in the cached feed.
    #[error("Topic {tid} is not in feed {identity}")]
    UnknownTopic { identity: FeedIdentity, tid: Tid },
    /// The server rejected or never received the vote; the local delta was
    /// reverted.
    #[error("Failed to confirm {direction} on topic {tid}: {source}")]
    ConfirmationFailed {
        tid: Tid,
        direction: VoteDirection,
        #[source]
        source: FetchError,
    },
}

/// A speculative vote awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteTicket {
    pub identity: FeedIdentity,
    pub tid: Tid,
    pub pid: Pid,
    pub direction: VoteDirection,
    /// Feed generation the delta was applied to.
    pub generation: u64,
}

/// Apply a vote to the cached topic before confirming it with the server.
///
/// # Errors
///
/// - [`VoteError::UnknownTopic`] - `tid` is not cached under `identity`
/// - [`VoteError::MissingVoteTarget`] - the topic has no `main_pid`
///
/// Both leave the cache unchanged.
pub fn apply_vote(
    cache: &mut FeedCache,
    identity: &FeedIdentity,
    tid: Tid,
    direction: VoteDirection,
) -> Result<VoteTicket, VoteError> {
    let topic = cache
        .topic(identity, tid)
        .ok_or_else(|| VoteError::UnknownTopic {
            identity: identity.clone(),
            tid,
        })?;
    let pid = topic.main_pid.ok_or(VoteError::MissingVoteTarget { tid })?;
    let generation = cache
        .generation(identity)
        .ok_or_else(|| VoteError::UnknownTopic {
            identity: identity.clone(),
            tid,
        })?;

    let votes = cache.adjust_votes(identity, tid, direction.delta());
    cache.begin_vote(identity, tid);
    tracing::debug!(feed = %identity, tid, pid, %direction, ?votes, "Speculative vote applied");

    Ok(VoteTicket {
        identity: identity.clone(),
        tid,
        pid,
        direction,
        generation,
    })
}

/// Settle a speculative vote with the outcome of its confirming request.
///
/// On failure the inverse delta is applied to the same topic, unless the
/// feed has been refreshed since the vote: the refetched record is server
/// truth and never contained the failed delta. The failure is returned for
/// reporting and is not retried.
pub fn settle_vote(
    cache: &mut FeedCache,
    ticket: &VoteTicket,
    result: Result<(), FetchError>,
) -> Result<(), VoteError> {
    let current = cache.generation(&ticket.identity) == Some(ticket.generation);
    if current {
        cache.end_vote(&ticket.identity, ticket.tid);
    }

    let source = match result {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };

    if current {
        let votes = cache.adjust_votes(&ticket.identity, ticket.tid, -ticket.direction.delta());
        tracing::warn!(
            feed = %ticket.identity,
            tid = ticket.tid,
            direction = %ticket.direction,
            ?votes,
            error = %source,
            "Vote confirmation failed, rolled back"
        );
    } else {
        tracing::warn!(
            feed = %ticket.identity,
            tid = ticket.tid,
            direction = %ticket.direction,
            error = %source,
            "Vote confirmation failed after feed refresh, nothing to roll back"
        );
    }

    Err(VoteError::ConfirmationFailed {
        tid: ticket.tid,
        direction: ticket.direction,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Topic;

    fn cache_with(topics: Vec<Topic>) -> (FeedCache, FeedIdentity) {
        let feed = FeedIdentity::Recent;
        let mut cache = FeedCache::new(20);
        let ticket = cache.ensure_next_page(&feed).unwrap();
        cache.complete_fetch(&ticket, Ok(topics));
        (cache, feed)
    }

    fn votes(cache: &FeedCache, feed: &FeedIdentity, tid: Tid) -> i64 {
        cache.topic(feed, tid).unwrap().votes
    }

    #[test]
    fn test_upvote_applies_immediately() {
        let (mut cache, feed) = cache_with(vec![Topic::new(5, Some(100), 3)]);
        let ticket = apply_vote(&mut cache, &feed, 5, VoteDirection::Up).unwrap();
        assert_eq!(ticket.pid, 100);
        assert_eq!(votes(&cache, &feed, 5), 4);
    }

    #[test]
    fn test_upvote_confirmed_keeps_increment() {
        let (mut cache, feed) = cache_with(vec![Topic::new(5, Some(100), 3)]);
        let ticket = apply_vote(&mut cache, &feed, 5, VoteDirection::Up).unwrap();
        settle_vote(&mut cache, &ticket, Ok(())).unwrap();
        assert_eq!(votes(&cache, &feed, 5), 4);
    }

    #[test]
    fn test_upvote_failure_restores_count() {
        let (mut cache, feed) = cache_with(vec![Topic::new(5, Some(100), 3)]);
        let ticket = apply_vote(&mut cache, &feed, 5, VoteDirection::Up).unwrap();
        assert_eq!(votes(&cache, &feed, 5), 4);

        let err = settle_vote(&mut cache, &ticket, Err(FetchError::HttpStatus(500))).unwrap_err();
        assert!(matches!(
            err,
            VoteError::ConfirmationFailed {
                tid: 5,
                direction: VoteDirection::Up,
                ..
            }
        ));
        assert_eq!(votes(&cache, &feed, 5), 3);
    }

    #[test]
    fn test_downvote_failure_restores_negative_count() {
        let (mut cache, feed) = cache_with(vec![Topic::new(8, Some(80), 0)]);
        let ticket = apply_vote(&mut cache, &feed, 8, VoteDirection::Down).unwrap();
        assert_eq!(votes(&cache, &feed, 8), -1);
        settle_vote(&mut cache, &ticket, Err(FetchError::Timeout)).unwrap_err();
        assert_eq!(votes(&cache, &feed, 8), 0);
    }

    #[test]
    fn test_missing_main_pid_is_noop() {
        let (mut cache, feed) = cache_with(vec![Topic::new(9, None, 2)]);
        let err = apply_vote(&mut cache, &feed, 9, VoteDirection::Up).unwrap_err();
        assert!(matches!(err, VoteError::MissingVoteTarget { tid: 9 }));
        assert_eq!(votes(&cache, &feed, 9), 2);
    }

    #[test]
    fn test_unknown_topic() {
        let (mut cache, feed) = cache_with(vec![Topic::new(1, Some(1), 0)]);
        assert!(matches!(
            apply_vote(&mut cache, &feed, 42, VoteDirection::Up),
            Err(VoteError::UnknownTopic { tid: 42, .. })
        ));
        assert!(matches!(
            apply_vote(&mut cache, &FeedIdentity::Popular, 1, VoteDirection::Up),
            Err(VoteError::UnknownTopic { .. })
        ));
    }

    #[test]
    fn test_vote_on_deleted_topic_still_applies() {
        let (mut cache, feed) = cache_with(vec![Topic::new(4, Some(40), 1).deleted(true)]);
        apply_vote(&mut cache, &feed, 4, VoteDirection::Up).unwrap();
        assert_eq!(votes(&cache, &feed, 4), 2);
    }

    /// Two votes race; the first fails after the second was applied. Only the
    /// failed delta is reverted, so the count reflects the second vote even
    /// though the server may have settled differently.
    #[test]
    fn test_concurrent_votes_revert_independently() {
        let (mut cache, feed) = cache_with(vec![Topic::new(5, Some(100), 3)]);

        let first = apply_vote(&mut cache, &feed, 5, VoteDirection::Up).unwrap();
        let second = apply_vote(&mut cache, &feed, 5, VoteDirection::Up).unwrap();
        assert_eq!(votes(&cache, &feed, 5), 5);

        settle_vote(&mut cache, &first, Err(FetchError::HttpStatus(503))).unwrap_err();
        assert_eq!(votes(&cache, &feed, 5), 4);

        settle_vote(&mut cache, &second, Ok(())).unwrap();
        assert_eq!(votes(&cache, &feed, 5), 4);
    }

    /// Up then down before either confirms: both succeed locally, and when the
    /// up fails the count ends one below where it started.
    #[test]
    fn test_opposing_concurrent_votes_can_drift() {
        let (mut cache, feed) = cache_with(vec![Topic::new(5, Some(100), 3)]);

        let up = apply_vote(&mut cache, &feed, 5, VoteDirection::Up).unwrap();
        let down = apply_vote(&mut cache, &feed, 5, VoteDirection::Down).unwrap();
        assert_eq!(votes(&cache, &feed, 5), 3);

        settle_vote(&mut cache, &down, Ok(())).unwrap();
        settle_vote(&mut cache, &up, Err(FetchError::Timeout)).unwrap_err();
        assert_eq!(votes(&cache, &feed, 5), 2);
    }

    #[test]
    fn test_failure_after_refresh_does_not_touch_fresh_record() {
        let (mut cache, feed) = cache_with(vec![Topic::new(5, Some(100), 3)]);
        let ticket = apply_vote(&mut cache, &feed, 5, VoteDirection::Up).unwrap();

        let refresh = cache.invalidate(&feed);
        cache.complete_fetch(&refresh, Ok(vec![Topic::new(5, Some(100), 3)]));

        let err = settle_vote(&mut cache, &ticket, Err(FetchError::Timeout)).unwrap_err();
        assert!(matches!(err, VoteError::ConfirmationFailed { .. }));
        assert_eq!(votes(&cache, &feed, 5), 3);
    }

    #[test]
    fn test_repeated_page_during_vote_then_failure_restores_server_count() {
        let feed = FeedIdentity::Recent;
        let mut cache = FeedCache::new(1);
        let first = cache.ensure_next_page(&feed).unwrap();
        cache.complete_fetch(&first, Ok(vec![Topic::new(5, Some(100), 3)]));

        let ticket = apply_vote(&mut cache, &feed, 5, VoteDirection::Up).unwrap();

        // Topic 5 drifts onto page 2 before the vote settles.
        let second = cache.ensure_next_page(&feed).unwrap();
        cache.complete_fetch(&second, Ok(vec![Topic::new(5, Some(100), 3)]));
        assert_eq!(votes(&cache, &feed, 5), 4);

        settle_vote(&mut cache, &ticket, Err(FetchError::HttpStatus(500))).unwrap_err();
        assert_eq!(votes(&cache, &feed, 5), 3);
        assert_eq!(cache.display_sequence(&feed).len(), 1);
    }
}
