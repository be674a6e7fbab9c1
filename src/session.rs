//! Session: owns the article store, the feeds, and the reconciler.
//!
//! All mutation happens through `&mut FeedSession`, on one logical thread.
//! Each network-bound operation comes in two shapes:
//!
//! - split-phase (`begin_fetch`/`complete_fetch`, `rate`/`toggle_bookmark` +
//!   `resolve`) for event loops that run the network call in a spawned task
//!   and feed the result back later, possibly out of order
//! - awaited convenience methods (`load_newer`, `rate_and_sync`, ...) that
//!   call the collaborator in between

use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::config::Config;
use crate::feed::{
    Cursor, Direction, FeedFetcher, FeedList, FetchError, MergeOutcome, Page, PageRequest,
};
use crate::interaction::{
    Completion, InteractionEcho, InteractionReconciler, InteractionWriter, ReconcileError,
    Resolution, WriteError, WriteTicket,
};
use crate::snapshot::FeedSnapshot;
use crate::storage::{ArticleId, ArticleStore, InteractionState, Rating};

#[derive(Debug, Error)]
pub enum SessionError {
    /// Page retrieval failed; the feed is unchanged and the request may be retried
    #[error("Fetch failed for feed '{feed}': {source}")]
    FetchFailed {
        feed: String,
        #[source]
        source: FetchError,
    },
    /// The latest write for an interaction failed and was rolled back
    #[error("Interaction write failed for article {article_id}: {source}")]
    WriteFailed {
        article_id: ArticleId,
        #[source]
        source: WriteError,
    },
    #[error("A fetch for feed '{0}' is already in flight")]
    FetchInFlight(String),
    #[error("Unknown article: {0}")]
    UnknownArticle(ArticleId),
    #[error("Unknown feed: {0}")]
    UnknownFeed(String),
}

impl SessionError {
    /// Returns true if the caller can usefully repeat the operation.
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::FetchFailed { source, .. } => source.is_retryable(),
            SessionError::WriteFailed { .. } | SessionError::FetchInFlight(_) => true,
            SessionError::UnknownArticle(_) | SessionError::UnknownFeed(_) => false,
        }
    }
}

impl From<ReconcileError> for SessionError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::UnknownArticle(id) => SessionError::UnknownArticle(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub page_size: u32,
    pub bookmarks_feed: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            page_size: 20,
            bookmarks_feed: "bookmarks".to_string(),
        }
    }
}

impl From<&Config> for SessionOptions {
    fn from(config: &Config) -> Self {
        Self {
            page_size: config.page_size,
            bookmarks_feed: config.bookmarks_feed.clone(),
        }
    }
}

/// A page fetch that has been started but not completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFetch {
    request: PageRequest,
    direction: Direction,
}

impl PendingFetch {
    pub fn request(&self) -> &PageRequest {
        &self.request
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

pub struct FeedSession<F, W> {
    fetcher: F,
    writer: W,
    store: ArticleStore,
    feeds: HashMap<String, FeedList>,
    reconciler: InteractionReconciler,
    in_flight: HashSet<String>,
    options: SessionOptions,
}

impl<F, W> std::fmt::Debug for FeedSession<F, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedSession")
            .field("articles", &self.store.len())
            .field("feeds", &self.feeds.keys().collect::<Vec<_>>())
            .field("in_flight", &self.in_flight)
            .field("pending_writes", &self.reconciler.pending_count())
            .field("options", &self.options)
            .finish()
    }
}

/// Clears a feed's in-flight flag when dropped, so a fetch future that is
/// cancelled mid-await does not leave the feed locked.
struct InFlightGuard<'a> {
    in_flight: &'a mut HashSet<String>,
    feed: &'a str,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(self.feed);
    }
}

/// The bookmarks feed exists for the whole session; this re-creates it if a
/// caller somehow removed it rather than failing.
fn bookmarks_list<'a>(feeds: &'a mut HashMap<String, FeedList>, name: &str) -> &'a mut FeedList {
    feeds
        .entry(name.to_string())
        .or_insert_with(|| FeedList::non_paginating(name))
}

impl<F, W> FeedSession<F, W>
where
    F: FeedFetcher,
    W: InteractionWriter,
{
    pub fn new(fetcher: F, writer: W, options: SessionOptions) -> Self {
        let mut feeds = HashMap::new();
        bookmarks_list(&mut feeds, &options.bookmarks_feed);
        Self {
            fetcher,
            writer,
            store: ArticleStore::new(),
            feeds,
            reconciler: InteractionReconciler::new(),
            in_flight: HashSet::new(),
            options,
        }
    }

    // ========================================================================
    // Read Access
    // ========================================================================

    pub fn store(&self) -> &ArticleStore {
        &self.store
    }

    pub fn feed(&self, name: &str) -> Option<&FeedList> {
        self.feeds.get(name)
    }

    pub fn bookmarks(&self) -> Option<&FeedList> {
        self.feeds.get(&self.options.bookmarks_feed)
    }

    pub fn interaction(&self, id: &ArticleId) -> Option<&InteractionState> {
        self.store.interaction(id)
    }

    pub fn is_fetching(&self, feed: &str) -> bool {
        self.in_flight.contains(feed)
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn snapshot(&self, feed: &str) -> Option<FeedSnapshot> {
        self.feeds
            .get(feed)
            .map(|list| FeedSnapshot::capture(list, &self.store))
    }

    pub fn set_current(&mut self, feed: &str, index: usize) -> Result<usize, SessionError> {
        self.feeds
            .get_mut(feed)
            .map(|list| list.set_current(index))
            .ok_or_else(|| SessionError::UnknownFeed(feed.to_string()))
    }

    // ========================================================================
    // Paging
    // ========================================================================

    /// Start a page fetch for `feed`, deriving the cursor from its current
    /// contents. At most one fetch per feed may be outstanding.
    pub fn begin_fetch(
        &mut self,
        feed: &str,
        direction: Direction,
    ) -> Result<PendingFetch, SessionError> {
        if self.in_flight.contains(feed) {
            return Err(SessionError::FetchInFlight(feed.to_string()));
        }

        let list = self.feeds.get(feed);
        let cursor = match direction {
            Direction::Newer => list
                .and_then(FeedList::newest)
                .cloned()
                .map_or(Cursor::Latest, Cursor::Since),
            Direction::Older => list
                .and_then(FeedList::oldest)
                .cloned()
                .map_or(Cursor::Latest, Cursor::Before),
        };

        self.in_flight.insert(feed.to_string());
        let request = PageRequest::new(feed, cursor, self.options.page_size);
        tracing::debug!(feed = %feed, ?direction, cursor = ?request.cursor, "Fetch started");

        Ok(PendingFetch { request, direction })
    }

    /// Finish a fetch started with [`begin_fetch`](Self::begin_fetch).
    ///
    /// On failure nothing is merged and the feed is left exactly as it was.
    pub fn complete_fetch(
        &mut self,
        pending: PendingFetch,
        result: Result<Page, FetchError>,
    ) -> Result<MergeOutcome, SessionError> {
        let PendingFetch { request, direction } = pending;
        self.in_flight.remove(&request.feed);

        let Page { articles, sources } = match result {
            Ok(page) => page,
            Err(source) => {
                tracing::warn!(
                    feed = %request.feed,
                    ?direction,
                    error = %source,
                    retryable = source.is_retryable(),
                    "Feed fetch failed, feed unchanged"
                );
                return Err(SessionError::FetchFailed {
                    feed: request.feed,
                    source,
                });
            }
        };

        self.store.upsert_sources(sources);

        let is_bookmarks = request.feed == self.options.bookmarks_feed;
        let list = self.feeds.entry(request.feed.clone()).or_insert_with(|| {
            if is_bookmarks {
                FeedList::non_paginating(request.feed.as_str())
            } else {
                FeedList::new(request.feed.as_str())
            }
        });
        let outcome = list.merge(&mut self.store, articles, direction);
        if is_bookmarks {
            self.reconciler
                .adopt_bookmarks(&mut self.store, list, &outcome.added);
        }

        tracing::info!(
            feed = %request.feed,
            ?direction,
            added = outcome.added.len(),
            refreshed = outcome.refreshed,
            end_of_data = outcome.end_of_data,
            "Loaded feed page"
        );
        Ok(outcome)
    }

    /// Abandon a fetch started with [`begin_fetch`](Self::begin_fetch)
    /// without merging anything. The feed can be fetched again immediately.
    pub fn cancel_fetch(&mut self, pending: PendingFetch) {
        if self.in_flight.remove(&pending.request.feed) {
            tracing::debug!(
                feed = %pending.request.feed,
                direction = ?pending.direction,
                "Fetch cancelled"
            );
        }
    }

    pub async fn load_newer(&mut self, feed: &str) -> Result<MergeOutcome, SessionError> {
        self.load(feed, Direction::Newer).await
    }

    pub async fn load_older(&mut self, feed: &str) -> Result<MergeOutcome, SessionError> {
        self.load(feed, Direction::Older).await
    }

    async fn load(&mut self, feed: &str, direction: Direction) -> Result<MergeOutcome, SessionError> {
        let pending = self.begin_fetch(feed, direction)?;
        let result = {
            let _guard = InFlightGuard {
                in_flight: &mut self.in_flight,
                feed: &pending.request.feed,
            };
            self.fetcher.fetch(&pending.request).await
        };
        self.complete_fetch(pending, result)
    }

    // ========================================================================
    // Interactions
    // ========================================================================

    /// Apply a rating locally. Send the ticket's request to the endpoint and
    /// pass the outcome to [`resolve`](Self::resolve).
    pub fn rate(&mut self, id: &ArticleId, rating: Rating) -> Result<WriteTicket, SessionError> {
        Ok(self.reconciler.set_rating(&mut self.store, id, rating)?)
    }

    /// Toggle the bookmark locally, updating the bookmarks feed to match.
    pub fn toggle_bookmark(&mut self, id: &ArticleId) -> Result<WriteTicket, SessionError> {
        let bookmarks = bookmarks_list(&mut self.feeds, &self.options.bookmarks_feed);
        Ok(self
            .reconciler
            .toggle_bookmark(&mut self.store, bookmarks, id)?)
    }

    /// Apply the endpoint's answer for `ticket`. Completions that a newer
    /// ticket superseded are ignored.
    pub fn resolve(
        &mut self,
        ticket: &WriteTicket,
        result: &Result<InteractionEcho, WriteError>,
    ) -> Resolution {
        if let Err(e) = result {
            tracing::warn!(
                article_id = %ticket.article_id(),
                kind = ?ticket.kind(),
                error = %e,
                "Interaction write failed"
            );
        }
        let bookmarks = bookmarks_list(&mut self.feeds, &self.options.bookmarks_feed);
        self.reconciler
            .resolve(&mut self.store, bookmarks, ticket, Completion::of(result))
    }

    /// Send a ticket's request to the endpoint without resolving it.
    pub async fn send(&self, ticket: &WriteTicket) -> Result<InteractionEcho, WriteError> {
        self.writer.write(ticket.request()).await
    }

    /// Send and resolve in one step. A failure that rolled state back is
    /// reported as [`SessionError::WriteFailed`]; a superseded failure is
    /// `Ok(Resolution::Stale)`.
    pub async fn sync(&mut self, ticket: WriteTicket) -> Result<Resolution, SessionError> {
        let result = self.send(&ticket).await;
        let resolution = self.resolve(&ticket, &result);
        match (result, resolution) {
            (Err(source), Resolution::RolledBack) => Err(SessionError::WriteFailed {
                article_id: ticket.article_id().clone(),
                source,
            }),
            _ => Ok(resolution),
        }
    }

    pub async fn rate_and_sync(
        &mut self,
        id: &ArticleId,
        rating: Rating,
    ) -> Result<Resolution, SessionError> {
        let ticket = self.rate(id, rating)?;
        self.sync(ticket).await
    }

    pub async fn toggle_bookmark_and_sync(
        &mut self,
        id: &ArticleId,
    ) -> Result<Resolution, SessionError> {
        let ticket = self.toggle_bookmark(id)?;
        self.sync(ticket).await
    }
}
