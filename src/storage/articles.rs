use std::collections::HashMap;

use super::types::{Article, ArticleId, InteractionState, Source};

/// In-memory table of articles, their interaction state, and their sources.
///
/// Records are created on first sight and updated in place afterwards; nothing
/// is ever evicted. Interaction state is only mutated through the reconciler,
/// so the mutable accessor is crate-private.
#[derive(Debug, Clone, Default)]
pub struct ArticleStore {
    articles: HashMap<ArticleId, Article>,
    interactions: HashMap<ArticleId, InteractionState>,
    sources: HashMap<String, Source>,
}

impl ArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Article Operations
    // ========================================================================

    /// Insert or refresh an article, returning `true` if the id was new.
    ///
    /// Non-interaction fields are last-write-wins. Optional fields that the
    /// newer fetch omits (`image_url`, `published_at`) keep their stored value.
    /// Interaction state is default-initialized on first insert and never
    /// touched by a refresh.
    pub fn upsert_article(&mut self, article: Article) -> bool {
        self.interactions.entry(article.id.clone()).or_default();

        match self.articles.get_mut(&article.id) {
            Some(existing) => {
                if existing.published_at != article.published_at && article.published_at.is_some()
                {
                    tracing::debug!(
                        article_id = %article.id,
                        "Article publish time corrected by later fetch"
                    );
                }
                let Article {
                    id: _,
                    title,
                    url,
                    image_url,
                    source_id,
                    published_at,
                } = article;
                existing.title = title;
                existing.url = url;
                existing.source_id = source_id;
                if image_url.is_some() {
                    existing.image_url = image_url;
                }
                if published_at.is_some() {
                    existing.published_at = published_at;
                }
                false
            }
            None => {
                self.articles.insert(article.id.clone(), article);
                true
            }
        }
    }

    pub fn article(&self, id: &ArticleId) -> Option<&Article> {
        self.articles.get(id)
    }

    pub fn contains(&self, id: &ArticleId) -> bool {
        self.articles.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    // ========================================================================
    // Interaction State
    // ========================================================================

    pub fn interaction(&self, id: &ArticleId) -> Option<&InteractionState> {
        self.interactions.get(id)
    }

    pub(crate) fn interaction_mut(&mut self, id: &ArticleId) -> Option<&mut InteractionState> {
        self.interactions.get_mut(id)
    }

    // ========================================================================
    // Sources
    // ========================================================================

    /// Insert or refresh source metadata. Sources are never removed.
    pub fn upsert_sources<I>(&mut self, sources: I)
    where
        I: IntoIterator<Item = (String, Source)>,
    {
        for (id, source) in sources {
            self.sources.insert(id, source);
        }
    }

    pub fn source(&self, source_id: &str) -> Option<&Source> {
        self.sources.get(source_id)
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}
