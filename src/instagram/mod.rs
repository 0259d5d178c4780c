//! Instagram integration - the content fetcher.
//!
//! Produces [`PostRecord`]s for a target account. The account is read page by
//! page; [`fetch_posts`] turns any [`PostSource`] into a lazy stream that stops
//! after `limit` posts. Calling it again starts over from the newest post.

pub mod dto;
mod adapter;
mod client;

use std::collections::VecDeque;

use futures::Stream;

use crate::model::PostRecord;
use crate::traits::PostSource;

pub use adapter::permalink;
pub use client::InstagramClient;

/// Position of the next page in an account's timeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pub user_id: String,
    pub max_id: String,
}

/// One page of posts, newest first
#[derive(Debug, Clone, Default)]
pub struct PostPage {
    pub posts: Vec<PostRecord>,
    /// `None` on the last page
    pub next: Option<PageCursor>,
}

/// Errors that can occur while fetching posts
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("Instagram authentication failed: {0}")]
    Auth(String),

    #[error("Instagram rate limit reached - try again later")]
    RateLimited,

    #[error("Instagram account not found: @{0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse Instagram response: {0}")]
    Parse(String),

    #[error("Instagram API error: {0}")]
    Api(String),
}

impl FetchError {
    /// Worth retrying after a short pause
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Network(_))
    }

    /// Stops the run: the account cannot be read at all
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FetchError::Auth(_) | FetchError::RateLimited | FetchError::NotFound(_)
        )
    }
}

struct FeedState {
    buffer: VecDeque<PostRecord>,
    cursor: Option<PageCursor>,
    started: bool,
    exhausted: bool,
    remaining: usize,
}

/// Stream up to `limit` posts from `account`, fetching pages on demand.
///
/// The stream ends after the first error it yields.
pub fn fetch_posts<'a, S>(
    source: &'a S,
    account: &'a str,
    limit: usize,
) -> impl Stream<Item = Result<PostRecord, FetchError>> + 'a
where
    S: PostSource + ?Sized,
{
    let state = FeedState {
        buffer: VecDeque::new(),
        cursor: None,
        started: false,
        exhausted: false,
        remaining: limit,
    };

    futures::stream::unfold(state, move |mut state| async move {
        loop {
            if state.remaining == 0 {
                return None;
            }

            if let Some(post) = state.buffer.pop_front() {
                state.remaining -= 1;
                return Some((Ok(post), state));
            }

            if state.exhausted {
                return None;
            }

            let cursor = if state.started {
                match state.cursor.take() {
                    Some(cursor) => Some(cursor),
                    None => return None,
                }
            } else {
                None
            };

            match source.fetch_page(account, cursor.as_ref()).await {
                Ok(page) => {
                    state.started = true;
                    // An empty page would otherwise be requested forever
                    state.exhausted = page.next.is_none() || page.posts.is_empty();
                    state.cursor = page.next;
                    state.buffer.extend(page.posts);
                    tracing::debug!(
                        buffered = state.buffer.len(),
                        more = !state.exhausted,
                        "Fetched page of posts"
                    );
                }
                Err(e) => {
                    state.exhausted = true;
                    state.buffer.clear();
                    return Some((Err(e), state));
                }
            }
        }
    })
}
