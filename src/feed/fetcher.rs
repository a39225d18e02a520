use crate::api::{FetchError, ForumApi, Topic};
use crate::feed::source::{resolve, FeedIdentity, PageRequest};

/// Fetch one page of a feed.
///
/// Resolves `identity` to its endpoint and performs a single bounded request.
/// No retry and no caching happen here. A page shorter than `page_size` is
/// the only exhaustion signal; there is no end-of-feed sentinel.
///
/// # Errors
///
/// - [`FetchError::InvalidRequest`] - `page_param` or `page_size` is zero
/// - any transport error returned by `api`
pub async fn fetch_page<A>(
    api: &A,
    identity: &FeedIdentity,
    page_param: u32,
    page_size: u32,
) -> Result<Vec<Topic>, FetchError>
where
    A: ForumApi + ?Sized,
{
    if page_param == 0 {
        return Err(FetchError::InvalidRequest(
            "page numbers start at 1".to_string(),
        ));
    }
    if page_size == 0 {
        return Err(FetchError::InvalidRequest(
            "page size must be at least 1".to_string(),
        ));
    }

    let request = PageRequest {
        endpoint: resolve(identity),
        page: page_param,
        page_size,
    };

    tracing::debug!(feed = %identity, page = page_param, page_size, "Fetching page");
    let topics = api.fetch_topics(&request).await?;

    if topics.len() > page_size as usize {
        // Server ignored the page size. Kept as-is; only a page of exactly
        // `page_size` topics has a successor, so this ends the feed.
        tracing::debug!(
            feed = %identity,
            page = page_param,
            received = topics.len(),
            page_size,
            "Page larger than requested"
        );
    }

    Ok(topics)
}
