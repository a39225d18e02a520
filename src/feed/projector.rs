use crate::api::Topic;
use std::sync::Arc;

/// Derive the render sequence from the cache's concatenated pages.
///
/// Soft-deleted topics are hidden here and only here; the cache keeps them.
/// Holds no state, so callers re-run it after every cache mutation.
pub fn project(sequence: &[Arc<Topic>]) -> Vec<Arc<Topic>> {
    sequence
        .iter()
        .filter(|topic| !topic.deleted)
        .map(Arc::clone)
        .collect()
}
