use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque article identifier, stable across fetches.
///
/// The recommendations API sends ids as either JSON strings or integers.
/// Both are normalized to their string form so `101` and `"101"` name the
/// same article.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawArticleId", into = "String")]
pub struct ArticleId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawArticleId {
    Int(i64),
    Str(String),
}

impl From<RawArticleId> for ArticleId {
    fn from(raw: RawArticleId) -> Self {
        match raw {
            RawArticleId::Int(n) => Self(n.to_string()),
            RawArticleId::Str(s) => Self(s),
        }
    }
}

impl ArticleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ArticleId> for String {
    fn from(id: ArticleId) -> Self {
        id.0
    }
}

impl From<String> for ArticleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ArticleId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<i64> for ArticleId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

// ============================================================================
// Rating
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid rating {0} (expected -1, 0 or 1)")]
pub struct InvalidRating(pub i8);

/// User rating of an article. Serialized as `-1`, `0` or `1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Rating {
    Down,
    #[default]
    Neutral,
    Up,
}

impl TryFrom<i8> for Rating {
    type Error = InvalidRating;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Rating::Down),
            0 => Ok(Rating::Neutral),
            1 => Ok(Rating::Up),
            other => Err(InvalidRating(other)),
        }
    }
}

impl From<Rating> for i8 {
    fn from(rating: Rating) -> Self {
        match rating {
            Rating::Down => -1,
            Rating::Neutral => 0,
            Rating::Up => 1,
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", i8::from(*self))
    }
}

// ============================================================================
// Records
// ============================================================================

/// Article record as delivered by a feed page.
///
/// Accepts both `snake_case` and the camelCase field names the mobile API
/// historically used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub url: String,
    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(alias = "sourceId")]
    pub source_id: String,
    #[serde(default, alias = "publishedAt")]
    pub published_at: Option<DateTime<Utc>>,
}

/// Publisher metadata, keyed by `source_id` in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    #[serde(default, alias = "iconData")]
    pub icon_data: Option<String>,
}

/// Per-article interaction state.
///
/// `pending_rating` / `pending_bookmarked` hold the last settled value while a
/// write is in flight; `None` means no write is outstanding for that kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InteractionState {
    pub rating: Rating,
    pub bookmarked: bool,
    pub pending_rating: Option<Rating>,
    pub pending_bookmarked: Option<bool>,
}

impl InteractionState {
    pub fn is_rating_pending(&self) -> bool {
        self.pending_rating.is_some()
    }

    pub fn is_bookmark_pending(&self) -> bool {
        self.pending_bookmarked.is_some()
    }
}
