//! HTTP transports for the recommendations and interaction API.
//!
//! - [`ApiClient`] - shared JSON client: base URL validation, bearer auth,
//!   timeouts, response size cap, and retry with exponential backoff
//! - [`HttpFeedFetcher`] - production [`FeedFetcher`](crate::feed::FeedFetcher)
//! - [`HttpInteractionWriter`] - production
//!   [`InteractionWriter`](crate::interaction::InteractionWriter)

mod client;
mod feeds;
mod interactions;

pub use client::{ApiClient, ApiError};
pub use feeds::HttpFeedFetcher;
pub use interactions::HttpInteractionWriter;
