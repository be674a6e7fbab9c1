//! Utility functions shared by the transports and configuration.
//!
//! - **URL validation**: API base URLs must be HTTPS (plain HTTP only for
//!   localhost) so the bearer token is never sent in the clear

mod url_validator;

pub use url_validator::{validate_base_url, UrlValidationError};
