use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::api::ApiError;
use crate::storage::{ArticleId, Rating};

/// Errors an [`InteractionWriter`] can report.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error(transparent)]
    Api(#[from] ApiError),
    /// The endpoint answered with an `{ "error": ... }` payload
    #[error("Interaction rejected: {0}")]
    Rejected(String),
}

/// Which interaction a write targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    Rating,
    Bookmark,
}

/// Partial interaction update. Serializes as `{ "rating": n }` or
/// `{ "bookmarked": b }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionPatch {
    Rating(Rating),
    Bookmarked(bool),
}

impl InteractionPatch {
    pub fn kind(&self) -> InteractionKind {
        match self {
            InteractionPatch::Rating(_) => InteractionKind::Rating,
            InteractionPatch::Bookmarked(_) => InteractionKind::Bookmark,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub article_id: ArticleId,
    pub patch: InteractionPatch,
}

/// Interaction state as applied by the endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InteractionEcho {
    #[serde(default)]
    pub rating: Option<Rating>,
    #[serde(default)]
    pub bookmarked: Option<bool>,
}

/// Remote endpoint that persists interaction changes.
#[async_trait]
pub trait InteractionWriter: Send + Sync {
    async fn write(&self, request: &WriteRequest) -> Result<InteractionEcho, WriteError>;
}

#[async_trait]
impl<T: InteractionWriter + ?Sized> InteractionWriter for Arc<T> {
    async fn write(&self, request: &WriteRequest) -> Result<InteractionEcho, WriteError> {
        (**self).write(request).await
    }
}

#[async_trait]
impl<T: InteractionWriter + ?Sized> InteractionWriter for Box<T> {
    async fn write(&self, request: &WriteRequest) -> Result<InteractionEcho, WriteError> {
        (**self).write(request).await
    }
}

// ============================================================================
// In-memory endpoint
// ============================================================================

/// In-memory [`InteractionWriter`] for development and tests.
///
/// Applies every accepted patch to its own table and echoes the result.
/// Rejections can be queued with [`reject_next`](Self::reject_next).
#[derive(Debug, Default)]
pub struct MemoryWriter {
    applied: Mutex<HashMap<ArticleId, InteractionEcho>>,
    rejections: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<WriteRequest>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_next(&self, reason: impl Into<String>) {
        lock(&self.rejections).push_back(reason.into());
    }

    /// State the endpoint has accepted for `id`.
    pub fn applied(&self, id: &ArticleId) -> Option<InteractionEcho> {
        lock(&self.applied).get(id).cloned()
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<WriteRequest> {
        lock(&self.requests).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl InteractionWriter for MemoryWriter {
    async fn write(&self, request: &WriteRequest) -> Result<InteractionEcho, WriteError> {
        lock(&self.requests).push(request.clone());

        if let Some(reason) = lock(&self.rejections).pop_front() {
            return Err(WriteError::Rejected(reason));
        }

        let mut applied = lock(&self.applied);
        let echo = applied.entry(request.article_id.clone()).or_default();
        match request.patch {
            InteractionPatch::Rating(rating) => echo.rating = Some(rating),
            InteractionPatch::Bookmarked(bookmarked) => echo.bookmarked = Some(bookmarked),
        }
        Ok(echo.clone())
    }
}
