use serde::Serialize;
use std::collections::HashSet;

use crate::storage::{Article, ArticleId, ArticleStore};

/// Which end of a feed a page extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Content published after the feed's first item; prepended.
    Newer,
    /// Continuation past the feed's last item; appended.
    Older,
}

/// What a merge changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Ids that were not in the feed before, in the order they were inserted.
    pub added: Vec<ArticleId>,
    /// Page entries whose id was already present (record refreshed only).
    pub refreshed: usize,
    /// Feed end-of-data flag after the merge.
    pub end_of_data: bool,
}

/// Ordered, de-duplicated article ids for one named feed.
///
/// `seen` mirrors `items` for O(1) membership checks. Every mutation goes
/// through a method that keeps the two in sync, and the relative order of ids
/// already present is never changed.
#[derive(Debug, Clone, Serialize)]
pub struct FeedList {
    name: String,
    items: Vec<ArticleId>,
    #[serde(skip)]
    seen: HashSet<ArticleId>,
    current: usize,
    end_of_data: bool,
    paginates: bool,
}

impl FeedList {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
            seen: HashSet::new(),
            current: 0,
            end_of_data: false,
            paginates: true,
        }
    }

    /// A feed whose producer delivers everything in one page (e.g. bookmarks
    /// backed by local state). It reports end-of-data once loaded.
    pub fn non_paginating(name: impl Into<String>) -> Self {
        Self {
            paginates: false,
            ..Self::new(name)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &[ArticleId] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &ArticleId) -> bool {
        self.seen.contains(id)
    }

    pub fn position(&self, id: &ArticleId) -> Option<usize> {
        if !self.seen.contains(id) {
            return None;
        }
        self.items.iter().position(|item| item == id)
    }

    /// First (most recent) id; the `since_id` cursor for a newer page.
    pub fn newest(&self) -> Option<&ArticleId> {
        self.items.first()
    }

    /// Last id; the `max_id` cursor for an older page.
    pub fn oldest(&self) -> Option<&ArticleId> {
        self.items.last()
    }

    pub fn end_of_data(&self) -> bool {
        self.end_of_data
    }

    pub fn paginates(&self) -> bool {
        self.paginates
    }

    /// Index of the last-viewed item.
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_id(&self) -> Option<&ArticleId> {
        self.items.get(self.current)
    }

    /// Set the last-viewed index, clamped to the list bounds. Returns the
    /// index actually stored.
    pub fn set_current(&mut self, index: usize) -> usize {
        self.current = index.min(self.items.len().saturating_sub(1));
        self.current
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// Merge a successfully fetched page into the feed.
    ///
    /// Every article in the page is upserted into `store`, whether or not its
    /// id is new to this feed. Unseen ids keep page order and are prepended as
    /// a block for [`Direction::Newer`] or appended for [`Direction::Older`].
    /// A newer merge shifts `current` so the same item stays selected.
    ///
    /// An empty older page marks the feed as exhausted; newer pages never
    /// touch the flag. Merging the same page twice is a no-op on `items`.
    pub fn merge(
        &mut self,
        store: &mut ArticleStore,
        page: Vec<Article>,
        direction: Direction,
    ) -> MergeOutcome {
        let page_len = page.len();
        let mut unseen = Vec::new();
        let mut refreshed = 0;

        for article in page {
            if self.seen.insert(article.id.clone()) {
                unseen.push(article.id.clone());
            } else {
                refreshed += 1;
            }
            store.upsert_article(article);
        }

        match direction {
            Direction::Newer => {
                if !self.items.is_empty() {
                    self.current += unseen.len();
                }
                self.items.splice(0..0, unseen.iter().cloned());
            }
            Direction::Older => {
                self.items.extend(unseen.iter().cloned());
                if page_len == 0 {
                    self.end_of_data = true;
                }
            }
        }

        if !self.paginates {
            self.end_of_data = true;
        }

        tracing::debug!(
            feed = %self.name,
            ?direction,
            added = unseen.len(),
            refreshed,
            total = self.items.len(),
            end_of_data = self.end_of_data,
            "Merged page into feed"
        );

        MergeOutcome {
            added: unseen,
            refreshed,
            end_of_data: self.end_of_data,
        }
    }

    // ========================================================================
    // Direct Edits (bookmarks)
    // ========================================================================

    /// Insert `id` at the head. Returns `false` if it was already present.
    pub(crate) fn insert_front(&mut self, id: ArticleId) -> bool {
        self.insert_at(0, id)
    }

    /// Insert `id` at `index` (clamped to the end). Returns `false` if it was
    /// already present.
    pub(crate) fn insert_at(&mut self, index: usize, id: ArticleId) -> bool {
        if !self.seen.insert(id.clone()) {
            return false;
        }
        let index = index.min(self.items.len());
        let was_empty = self.items.is_empty();
        self.items.insert(index, id);
        if !was_empty && index <= self.current {
            self.current += 1;
        }
        true
    }

    /// Remove `id` by value, returning the index it occupied.
    pub(crate) fn remove(&mut self, id: &ArticleId) -> Option<usize> {
        let index = self.position(id)?;
        self.seen.remove(id);
        self.items.remove(index);
        if index < self.current {
            self.current -= 1;
        }
        self.current = self.current.min(self.items.len().saturating_sub(1));
        Some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn article(id: i64) -> Article {
        Article {
            id: ArticleId::from(id),
            title: format!("Article {id}"),
            url: format!("https://example.com/{id}"),
            image_url: None,
            source_id: "src".to_string(),
            published_at: None,
        }
    }

    fn page(ids: &[i64]) -> Vec<Article> {
        ids.iter().copied().map(article).collect()
    }

    fn ids(list: &FeedList) -> Vec<String> {
        list.items().iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_newer_page_into_empty_feed() {
        let mut store = ArticleStore::new();
        let mut feed = FeedList::new("recommendations");

        let outcome = feed.merge(&mut store, page(&[102, 101]), Direction::Newer);

        assert_eq!(ids(&feed), vec!["102", "101"]);
        assert_eq!(outcome.added.len(), 2);
        assert_eq!(outcome.refreshed, 0);
        assert!(!feed.end_of_data());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_newer_page_prepends_block() {
        let mut store = ArticleStore::new();
        let mut feed = FeedList::new("recommendations");
        feed.merge(&mut store, page(&[102, 101]), Direction::Newer);

        feed.merge(&mut store, page(&[105, 104, 103]), Direction::Newer);

        assert_eq!(ids(&feed), vec!["105", "104", "103", "102", "101"]);
    }

    #[test]
    fn test_older_page_appends() {
        let mut store = ArticleStore::new();
        let mut feed = FeedList::new("recommendations");
        feed.merge(&mut store, page(&[102, 101]), Direction::Newer);

        feed.merge(&mut store, page(&[100, 99]), Direction::Older);

        assert_eq!(ids(&feed), vec!["102", "101", "100", "99"]);
    }

    #[test]
    fn test_duplicates_are_refreshed_not_reinserted() {
        let mut store = ArticleStore::new();
        let mut feed = FeedList::new("recommendations");
        feed.merge(&mut store, page(&[102, 101]), Direction::Newer);

        let mut refreshed = page(&[103, 102]);
        refreshed[1].title = "Updated".to_string();
        let outcome = feed.merge(&mut store, refreshed, Direction::Newer);

        assert_eq!(ids(&feed), vec!["103", "102", "101"]);
        assert_eq!(outcome.added, vec![ArticleId::from(103)]);
        assert_eq!(outcome.refreshed, 1);
        assert_eq!(
            store.article(&ArticleId::from(102)).unwrap().title,
            "Updated"
        );
    }

    #[test]
    fn test_duplicate_within_page_inserted_once() {
        let mut store = ArticleStore::new();
        let mut feed = FeedList::new("recommendations");

        let outcome = feed.merge(&mut store, page(&[5, 4, 5]), Direction::Older);

        assert_eq!(ids(&feed), vec!["5", "4"]);
        assert_eq!(outcome.refreshed, 1);
    }

    #[test]
    fn test_empty_older_page_sets_end_of_data() {
        let mut store = ArticleStore::new();
        let mut feed = FeedList::new("recommendations");
        feed.merge(&mut store, page(&[2, 1]), Direction::Newer);

        let outcome = feed.merge(&mut store, Vec::new(), Direction::Older);

        assert!(outcome.end_of_data);
        assert!(feed.end_of_data());
        assert_eq!(ids(&feed), vec!["2", "1"]);
    }

    #[test]
    fn test_newer_page_never_changes_end_of_data() {
        let mut store = ArticleStore::new();
        let mut feed = FeedList::new("recommendations");

        feed.merge(&mut store, Vec::new(), Direction::Newer);
        assert!(!feed.end_of_data());

        feed.merge(&mut store, Vec::new(), Direction::Older);
        feed.merge(&mut store, page(&[3]), Direction::Newer);
        assert!(feed.end_of_data());
    }

    #[test]
    fn test_non_paginating_feed_ends_after_first_page() {
        let mut store = ArticleStore::new();
        let mut feed = FeedList::non_paginating("bookmarks");

        let outcome = feed.merge(&mut store, page(&[9, 8]), Direction::Newer);

        assert!(outcome.end_of_data);
        assert!(!feed.paginates());
    }

    #[test]
    fn test_newer_merge_keeps_current_item_selected() {
        let mut store = ArticleStore::new();
        let mut feed = FeedList::new("recommendations");
        feed.merge(&mut store, page(&[3, 2, 1]), Direction::Newer);
        feed.set_current(1);
        assert_eq!(feed.current_id(), Some(&ArticleId::from(2)));

        feed.merge(&mut store, page(&[5, 4]), Direction::Newer);

        assert_eq!(feed.current(), 3);
        assert_eq!(feed.current_id(), Some(&ArticleId::from(2)));
    }

    #[test]
    fn test_set_current_clamps() {
        let mut store = ArticleStore::new();
        let mut feed = FeedList::new("recommendations");
        assert_eq!(feed.set_current(10), 0);

        feed.merge(&mut store, page(&[3, 2, 1]), Direction::Newer);
        assert_eq!(feed.set_current(10), 2);
    }

    #[test]
    fn test_insert_and_remove_keep_membership_in_sync() {
        let mut feed = FeedList::non_paginating("bookmarks");
        assert!(feed.insert_front(ArticleId::from(1)));
        assert!(feed.insert_front(ArticleId::from(2)));
        assert!(!feed.insert_front(ArticleId::from(1)));
        assert_eq!(ids(&feed), vec!["2", "1"]);

        assert_eq!(feed.remove(&ArticleId::from(2)), Some(0));
        assert!(!feed.contains(&ArticleId::from(2)));
        assert_eq!(feed.remove(&ArticleId::from(2)), None);

        assert!(feed.insert_at(5, ArticleId::from(3)));
        assert_eq!(ids(&feed), vec!["1", "3"]);
    }

    #[test]
    fn test_remove_before_current_shifts_current() {
        let mut feed = FeedList::new("bookmarks");
        for id in [1, 2, 3] {
            feed.insert_at(usize::MAX, ArticleId::from(id));
        }
        feed.set_current(2);

        feed.remove(&ArticleId::from(1));

        assert_eq!(feed.current_id(), Some(&ArticleId::from(3)));
    }

    prop_compose! {
        fn arb_pages()(pages in prop::collection::vec(
            (prop::collection::vec(0i64..40, 0..8), any::<bool>()),
            1..6,
        )) -> Vec<(Vec<i64>, Direction)> {
            pages
                .into_iter()
                .map(|(ids, newer)| (ids, if newer { Direction::Newer } else { Direction::Older }))
                .collect()
        }
    }

    proptest! {
        #[test]
        fn prop_merge_is_idempotent(
            history in arb_pages(),
            replay in prop::collection::vec(0i64..40, 0..8),
            newer in any::<bool>(),
        ) {
            let direction = if newer { Direction::Newer } else { Direction::Older };
            let mut store = ArticleStore::new();
            let mut feed = FeedList::new("prop");
            for (ids, direction) in history {
                feed.merge(&mut store, page(&ids), direction);
            }

            feed.merge(&mut store, page(&replay), direction);
            let once = feed.items().to_vec();
            feed.merge(&mut store, page(&replay), direction);

            prop_assert_eq!(feed.items(), once.as_slice());
        }

        #[test]
        fn prop_items_never_contain_duplicates(history in arb_pages()) {
            let mut store = ArticleStore::new();
            let mut feed = FeedList::new("prop");
            for (ids, direction) in history {
                feed.merge(&mut store, page(&ids), direction);
            }

            let unique: HashSet<_> = feed.items().iter().collect();
            prop_assert_eq!(unique.len(), feed.len());
        }

        #[test]
        fn prop_merge_preserves_relative_order(
            history in arb_pages(),
            next in prop::collection::vec(0i64..40, 0..8),
            newer in any::<bool>(),
        ) {
            let direction = if newer { Direction::Newer } else { Direction::Older };
            let mut store = ArticleStore::new();
            let mut feed = FeedList::new("prop");
            for (ids, direction) in history {
                feed.merge(&mut store, page(&ids), direction);
            }
            let before = feed.items().to_vec();

            feed.merge(&mut store, page(&next), direction);

            let survivors: Vec<_> = feed
                .items()
                .iter()
                .filter(|id| before.contains(id))
                .cloned()
                .collect();
            prop_assert_eq!(survivors, before);
        }
    }
}
