//! Client-side state for a paginated article feed with optimistic
//! interactions.
//!
//! A [`FeedSession`] keeps an identity-keyed [`ArticleStore`], one
//! [`FeedList`] per named feed, and an [`InteractionReconciler`] that applies
//! ratings and bookmarks locally before the remote write completes. Failed
//! writes roll back; completions that arrive after a newer write to the same
//! interaction are ignored.
//!
//! Network access goes through two traits, [`FeedFetcher`] and
//! [`InteractionWriter`], with HTTP implementations in [`api`] and in-memory
//! ones ([`FixtureFetcher`], [`MemoryWriter`]) for development and tests.

pub mod api;
pub mod config;
pub mod feed;
pub mod interaction;
pub mod session;
pub mod snapshot;
pub mod storage;
pub mod util;

pub use config::Config;
pub use feed::{Direction, FeedFetcher, FeedList, FixtureFetcher, MergeOutcome, PageRequest};
pub use interaction::{InteractionReconciler, InteractionWriter, MemoryWriter, Resolution};
pub use session::{FeedSession, SessionError, SessionOptions};
pub use snapshot::{ArticleView, FeedSnapshot};
pub use storage::{Article, ArticleId, ArticleStore, InteractionState, Rating, Source};
