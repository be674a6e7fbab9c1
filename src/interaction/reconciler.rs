use std::collections::HashMap;
use thiserror::Error;

use super::writer::{InteractionKind, InteractionPatch, WriteRequest};
use crate::feed::FeedList;
use crate::storage::{ArticleId, ArticleStore, Rating};

/// Identifies one dispatched write. Tokens are issued from a single counter,
/// so they increase monotonically for every (article, kind) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WriteToken(u64);

impl WriteToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// A write that has been applied locally and must be sent to the endpoint.
/// Hand it back to [`InteractionReconciler::resolve`] with the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteTicket {
    token: WriteToken,
    request: WriteRequest,
}

impl WriteTicket {
    pub fn token(&self) -> WriteToken {
        self.token
    }

    pub fn request(&self) -> &WriteRequest {
        &self.request
    }

    pub fn article_id(&self) -> &ArticleId {
        &self.request.article_id
    }

    pub fn kind(&self) -> InteractionKind {
        self.request.patch.kind()
    }
}

/// Remote outcome of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Success,
    Failure,
}

impl Completion {
    pub fn of<T, E>(result: &Result<T, E>) -> Self {
        if result.is_ok() {
            Completion::Success
        } else {
            Completion::Failure
        }
    }
}

/// What resolving a ticket did to local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Latest write succeeded; the optimistic value stands.
    Confirmed,
    /// Latest write failed; the last settled value was restored.
    RolledBack,
    /// A newer write superseded this one; nothing changed.
    Stale,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("Unknown article: {0}")]
    UnknownArticle(ArticleId),
}

/// Optimistic interaction state machine.
///
/// Per (article, kind) the state is `Idle` or `Pending`. Applying an
/// interaction mutates the store immediately, remembers the last settled
/// value in `InteractionState::pending_*`, and issues a fresh token. Only a
/// completion carrying the latest token for its (article, kind) may confirm
/// or roll back; older completions are stale and ignored.
///
/// While a write is pending, further writes of the same kind keep the
/// originally recorded settled value, so a rollback always lands on state the
/// endpoint is known to have accepted.
#[derive(Debug, Default)]
pub struct InteractionReconciler {
    next_token: u64,
    latest: HashMap<(ArticleId, InteractionKind), WriteToken>,
    /// Index a bookmarked article held before an in-flight un-bookmark.
    bookmark_slots: HashMap<ArticleId, usize>,
}

impl InteractionReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a write for (id, kind) is outstanding.
    pub fn is_pending(&self, id: &ArticleId, kind: InteractionKind) -> bool {
        self.latest.contains_key(&(id.clone(), kind))
    }

    pub fn pending_count(&self) -> usize {
        self.latest.len()
    }

    fn issue(&mut self, id: &ArticleId, kind: InteractionKind) -> WriteToken {
        self.next_token += 1;
        let token = WriteToken(self.next_token);
        if let Some(superseded) = self.latest.insert((id.clone(), kind), token) {
            tracing::debug!(
                article_id = %id,
                ?kind,
                superseded = superseded.0,
                token = token.0,
                "Superseding in-flight interaction write"
            );
        }
        token
    }

    // ========================================================================
    // Rating
    // ========================================================================

    /// Apply a rating optimistically.
    ///
    /// Requesting the rating the article already has clears it back to
    /// [`Rating::Neutral`].
    pub fn set_rating(
        &mut self,
        store: &mut ArticleStore,
        id: &ArticleId,
        requested: Rating,
    ) -> Result<WriteTicket, ReconcileError> {
        let state = store
            .interaction_mut(id)
            .ok_or_else(|| ReconcileError::UnknownArticle(id.clone()))?;

        let current = state.rating;
        let target = if current == requested {
            Rating::Neutral
        } else {
            requested
        };
        let settled = *state.pending_rating.get_or_insert(current);
        state.rating = target;

        let token = self.issue(id, InteractionKind::Rating);
        tracing::debug!(
            article_id = %id,
            token = token.0,
            %settled,
            %target,
            "Rating applied optimistically"
        );

        Ok(WriteTicket {
            token,
            request: WriteRequest {
                article_id: id.clone(),
                patch: InteractionPatch::Rating(target),
            },
        })
    }

    // ========================================================================
    // Bookmark
    // ========================================================================

    /// Flip the bookmark flag optimistically and bring `bookmarks` into
    /// agreement: bookmarking inserts the id at the head, un-bookmarking
    /// removes it by value.
    pub fn toggle_bookmark(
        &mut self,
        store: &mut ArticleStore,
        bookmarks: &mut FeedList,
        id: &ArticleId,
    ) -> Result<WriteTicket, ReconcileError> {
        let state = store
            .interaction_mut(id)
            .ok_or_else(|| ReconcileError::UnknownArticle(id.clone()))?;

        let current = state.bookmarked;
        let target = !current;
        if state.pending_bookmarked.is_none() {
            state.pending_bookmarked = Some(current);
            if let Some(index) = bookmarks.position(id) {
                self.bookmark_slots.insert(id.clone(), index);
            }
        }
        state.bookmarked = target;

        if target {
            bookmarks.insert_front(id.clone());
        } else {
            bookmarks.remove(id);
        }

        let token = self.issue(id, InteractionKind::Bookmark);
        tracing::debug!(
            article_id = %id,
            token = token.0,
            bookmarked = target,
            "Bookmark toggled optimistically"
        );

        Ok(WriteTicket {
            token,
            request: WriteRequest {
                article_id: id.clone(),
                patch: InteractionPatch::Bookmarked(target),
            },
        })
    }

    /// Mark ids that arrived through a bookmarks feed page as bookmarked.
    ///
    /// An id whose local un-bookmark is still in flight is taken back out of
    /// the list instead, since the local intent is newer than the page.
    pub fn adopt_bookmarks(
        &self,
        store: &mut ArticleStore,
        bookmarks: &mut FeedList,
        added: &[ArticleId],
    ) {
        for id in added {
            let Some(state) = store.interaction_mut(id) else {
                continue;
            };
            if state.is_bookmark_pending() && !state.bookmarked {
                tracing::debug!(article_id = %id, "Dropping fetched bookmark with pending removal");
                bookmarks.remove(id);
            } else {
                state.bookmarked = true;
            }
        }
    }

    // ========================================================================
    // Completion
    // ========================================================================

    /// Apply the remote outcome of `ticket`.
    ///
    /// `bookmarks` is only touched for bookmark rollbacks.
    pub fn resolve(
        &mut self,
        store: &mut ArticleStore,
        bookmarks: &mut FeedList,
        ticket: &WriteTicket,
        completion: Completion,
    ) -> Resolution {
        let id = ticket.article_id();
        let kind = ticket.kind();
        let key = (id.clone(), kind);

        if self.latest.get(&key) != Some(&ticket.token) {
            tracing::debug!(
                article_id = %id,
                ?kind,
                token = ticket.token.0,
                ?completion,
                "Ignoring stale interaction completion"
            );
            return Resolution::Stale;
        }
        self.latest.remove(&key);
        let slot = match kind {
            InteractionKind::Bookmark => self.bookmark_slots.remove(id),
            InteractionKind::Rating => None,
        };

        let Some(state) = store.interaction_mut(id) else {
            tracing::warn!(article_id = %id, "Completion for article missing from store");
            return Resolution::Stale;
        };

        match (kind, completion) {
            (InteractionKind::Rating, Completion::Success) => {
                state.pending_rating = None;
                Resolution::Confirmed
            }
            (InteractionKind::Rating, Completion::Failure) => {
                if let Some(settled) = state.pending_rating.take() {
                    state.rating = settled;
                }
                tracing::warn!(
                    article_id = %id,
                    rating = %state.rating,
                    "Rating write failed, rolled back"
                );
                Resolution::RolledBack
            }
            (InteractionKind::Bookmark, Completion::Success) => {
                state.pending_bookmarked = None;
                Resolution::Confirmed
            }
            (InteractionKind::Bookmark, Completion::Failure) => {
                if let Some(settled) = state.pending_bookmarked.take() {
                    state.bookmarked = settled;
                    if settled {
                        bookmarks.insert_at(slot.unwrap_or(0), id.clone());
                    } else {
                        bookmarks.remove(id);
                    }
                }
                tracing::warn!(
                    article_id = %id,
                    bookmarked = state.bookmarked,
                    "Bookmark write failed, rolled back"
                );
                Resolution::RolledBack
            }
        }
    }
}
