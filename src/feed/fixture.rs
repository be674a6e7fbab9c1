use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::fetcher::{Cursor, FeedFetcher, FetchError, Page, PageRequest};
use crate::storage::{Article, ArticleId, Source};

/// Deterministic in-memory [`FeedFetcher`].
///
/// Each feed is an ordered list of articles, newest first. Cursors are
/// resolved by position, so ids need not be numeric. Failures can be queued
/// with [`fail_next`](Self::fail_next) and are consumed one per fetch.
#[derive(Debug, Default)]
pub struct FixtureFetcher {
    feeds: Mutex<HashMap<String, Vec<Article>>>,
    sources: Mutex<HashMap<String, Source>>,
    failures: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a feed's contents (newest first).
    pub fn with_feed(self, name: impl Into<String>, articles: Vec<Article>) -> Self {
        lock(&self.feeds).insert(name.into(), articles);
        self
    }

    pub fn with_source(self, id: impl Into<String>, source: Source) -> Self {
        lock(&self.sources).insert(id.into(), source);
        self
    }

    /// Simulate new content arriving at the head of a feed.
    pub fn publish(&self, feed: &str, articles: Vec<Article>) {
        let mut feeds = lock(&self.feeds);
        let entry = feeds.entry(feed.to_string()).or_default();
        entry.splice(0..0, articles);
    }

    /// Make the next fetch fail with `reason`.
    pub fn fail_next(&self, reason: impl Into<String>) {
        lock(&self.failures).push_back(reason.into());
    }

    /// Requests served so far, in order.
    pub fn requests(&self) -> Vec<PageRequest> {
        lock(&self.requests).clone()
    }

    /// A small catalogue for running the CLI without a backend.
    pub fn demo(articles: usize) -> Self {
        let epoch = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default();
        let sources = [("wire", "The Wire Desk"), ("daily", "Daily Ledger")];

        let recommendations = (1..=articles as i64)
            .rev()
            .map(|n| {
                let (source_id, _) = sources[(n as usize) % sources.len()];
                Article {
                    id: ArticleId::from(n),
                    title: format!("Story {n}"),
                    url: format!("https://news.example.com/story/{n}"),
                    image_url: None,
                    source_id: source_id.to_string(),
                    published_at: Some(epoch + Duration::hours(n)),
                }
            })
            .collect();

        sources.iter().fold(
            Self::new().with_feed("recommendations", recommendations),
            |fixture, (id, name)| {
                fixture.with_source(
                    *id,
                    Source {
                        name: (*name).to_string(),
                        icon_data: None,
                    },
                )
            },
        )
    }

    fn slice(articles: &[Article], request: &PageRequest) -> Vec<Article> {
        let limit = request.limit as usize;
        let index_of = |id: &ArticleId| articles.iter().position(|a| &a.id == id);

        match &request.cursor {
            Cursor::Latest => articles.iter().take(limit).cloned().collect(),
            Cursor::Since(id) => {
                let end = index_of(id).unwrap_or(articles.len());
                articles[..end].iter().take(limit).cloned().collect()
            }
            // An unknown max_id has nothing older that we can name.
            Cursor::Before(id) => match index_of(id) {
                Some(pos) => articles[pos + 1..].iter().take(limit).cloned().collect(),
                None => Vec::new(),
            },
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl FeedFetcher for FixtureFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<Page, FetchError> {
        lock(&self.requests).push(request.clone());

        if let Some(reason) = lock(&self.failures).pop_front() {
            tracing::debug!(feed = %request.feed, reason = %reason, "Fixture fetch failing on request");
            return Err(FetchError::Unavailable(reason));
        }

        let articles = {
            let feeds = lock(&self.feeds);
            let feed = feeds
                .get(&request.feed)
                .ok_or_else(|| FetchError::UnknownFeed(request.feed.clone()))?;
            Self::slice(feed, request)
        };

        let all_sources = lock(&self.sources);
        let sources = articles
            .iter()
            .filter_map(|a| {
                all_sources
                    .get(&a.source_id)
                    .map(|s| (a.source_id.clone(), s.clone()))
            })
            .collect();

        Ok(Page { articles, sources })
    }
}
