use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::api::ApiError;
use crate::storage::{Article, ArticleId, Source};

/// Errors a [`FeedFetcher`] can report.
///
/// The session only distinguishes success from failure; the variants exist
/// so the caller can decide whether a retry is worthwhile.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure talking to the recommendations API
    #[error(transparent)]
    Api(#[from] ApiError),
    /// The producer could not serve the page right now
    #[error("Feed unavailable: {0}")]
    Unavailable(String),
    /// The producer has no feed by this name
    #[error("Unknown feed: {0}")]
    UnknownFeed(String),
}

impl FetchError {
    /// Returns true if repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Api(e) => e.is_retryable(),
            FetchError::Unavailable(_) => true,
            FetchError::UnknownFeed(_) => false,
        }
    }
}

/// Pagination position for a page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// The most recent `limit` items.
    Latest,
    /// Items newer than this id (exclusive).
    Since(ArticleId),
    /// Items older than this id (exclusive).
    Before(ArticleId),
}

/// One page request to a [`FeedFetcher`].
///
/// The cursor enum makes "at most one of `since_id` / `max_id`" structural.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub feed: String,
    pub cursor: Cursor,
    pub limit: u32,
}

impl PageRequest {
    /// Build a request; a zero `limit` is raised to 1.
    pub fn new(feed: impl Into<String>, cursor: Cursor, limit: u32) -> Self {
        Self {
            feed: feed.into(),
            cursor,
            limit: limit.max(1),
        }
    }

    pub fn latest(feed: impl Into<String>, limit: u32) -> Self {
        Self::new(feed, Cursor::Latest, limit)
    }

    pub fn newer(feed: impl Into<String>, since_id: ArticleId, limit: u32) -> Self {
        Self::new(feed, Cursor::Since(since_id), limit)
    }

    pub fn older(feed: impl Into<String>, max_id: ArticleId, limit: u32) -> Self {
        Self::new(feed, Cursor::Before(max_id), limit)
    }

    pub fn since_id(&self) -> Option<&ArticleId> {
        match &self.cursor {
            Cursor::Since(id) => Some(id),
            _ => None,
        }
    }

    pub fn max_id(&self) -> Option<&ArticleId> {
        match &self.cursor {
            Cursor::Before(id) => Some(id),
            _ => None,
        }
    }
}

/// A page of articles plus the sources they reference.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Page {
    pub articles: Vec<Article>,
    #[serde(default)]
    pub sources: HashMap<String, Source>,
}

/// Produces feed pages. Implemented over HTTP in production and by
/// [`FixtureFetcher`](super::FixtureFetcher) in development and tests.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, request: &PageRequest) -> Result<Page, FetchError>;
}

#[async_trait]
impl<T: FeedFetcher + ?Sized> FeedFetcher for Arc<T> {
    async fn fetch(&self, request: &PageRequest) -> Result<Page, FetchError> {
        (**self).fetch(request).await
    }
}

#[async_trait]
impl<T: FeedFetcher + ?Sized> FeedFetcher for Box<T> {
    async fn fetch(&self, request: &PageRequest) -> Result<Page, FetchError> {
        (**self).fetch(request).await
    }
}
