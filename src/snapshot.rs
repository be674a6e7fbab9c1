//! Read-only views handed to the UI.
//!
//! Snapshots are owned copies, so rendering code can hold them across await
//! points without borrowing the session.
use serde::Serialize;

use crate::feed::FeedList;
use crate::storage::{Article, ArticleStore, InteractionState, Source};

/// One feed joined with its articles, sources and interaction state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedSnapshot {
    pub name: String,
    pub items: Vec<ArticleView>,
    pub current: usize,
    pub end_of_data: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleView {
    #[serde(flatten)]
    pub article: Article,
    pub source: Option<Source>,
    pub interaction: InteractionState,
}

impl FeedSnapshot {
    pub fn capture(list: &FeedList, store: &ArticleStore) -> Self {
        let items = list
            .items()
            .iter()
            .filter_map(|id| {
                let article = store.article(id)?;
                Some(ArticleView {
                    article: article.clone(),
                    source: store.source(&article.source_id).cloned(),
                    interaction: store.interaction(id).cloned().unwrap_or_default(),
                })
            })
            .collect();

        Self {
            name: list.name().to_string(),
            items,
            current: list.current(),
            end_of_data: list.end_of_data(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Direction;
    use crate::storage::ArticleId;

    #[test]
    fn test_capture_joins_sources_and_interactions() {
        let mut store = ArticleStore::new();
        store.upsert_sources([(
            "wire".to_string(),
            Source {
                name: "Wire".to_string(),
                icon_data: None,
            },
        )]);
        let mut list = FeedList::new("recommendations");
        list.merge(
            &mut store,
            vec![Article {
                id: ArticleId::from(1),
                title: "One".to_string(),
                url: "https://example.com/1".to_string(),
                image_url: None,
                source_id: "wire".to_string(),
                published_at: None,
            }],
            Direction::Newer,
        );

        let snapshot = FeedSnapshot::capture(&list, &store);

        assert_eq!(snapshot.name, "recommendations");
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].source.as_ref().unwrap().name, "Wire");
        assert_eq!(snapshot.items[0].interaction, InteractionState::default());

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["items"][0]["id"], "1");
        assert_eq!(json["items"][0]["interaction"]["rating"], 0);
    }
}
