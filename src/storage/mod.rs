mod articles;
mod types;

pub use articles::ArticleStore;
pub use types::{Article, ArticleId, InteractionState, InvalidRating, Rating, Source};
