//! Feed pagination: page requests, producers, and the merge into ordered lists.
//!
//! - [`list`] - [`FeedList`] and its de-duplicating merge
//! - [`fetcher`] - the [`FeedFetcher`] contract and its request/page types
//! - [`fixture`] - deterministic in-memory producer for development and tests
//!
//! The HTTP producer lives in [`crate::api`].

mod fetcher;
mod fixture;
mod list;

pub use fetcher::{Cursor, FeedFetcher, FetchError, Page, PageRequest};
pub use fixture::FixtureFetcher;
pub use list::{Direction, FeedList, MergeOutcome};
