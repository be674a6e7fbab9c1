use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors that can occur when validating an API base URL.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP to a non-local host would expose the bearer token.
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    Insecure,
    /// The URL cannot carry path segments (e.g. `mailto:`-style URLs).
    #[error("URL cannot be used as a base: {0}")]
    NotABase(String),
}

/// Validates the base URL of the recommendations/interaction API.
///
/// - Only `http` and `https` schemes are accepted
/// - `http` is only allowed for `localhost` and loopback addresses
/// - Query strings and fragments are dropped, and a trailing slash is ensured
///   so endpoint paths can be appended
///
/// # Examples
///
/// ```
/// use feedline::util::validate_base_url;
///
/// let url = validate_base_url("https://api.example.com/v1").unwrap();
/// assert_eq!(url.as_str(), "https://api.example.com/v1/");
///
/// assert!(validate_base_url("http://api.example.com").is_err());
/// assert!(validate_base_url("http://127.0.0.1:8080").is_ok());
/// ```
pub fn validate_base_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let mut url = Url::parse(url_str)?;

    match url.scheme() {
        "https" => {}
        "http" => {
            if !is_local_host(&url) {
                return Err(UrlValidationError::Insecure);
            }
            tracing::warn!(base_url = %url, "Using non-HTTPS API base URL (localhost only)");
        }
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.cannot_be_a_base() {
        return Err(UrlValidationError::NotABase(url_str.to_owned()));
    }

    url.set_query(None);
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

fn is_local_host(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    if host == "localhost" {
        return true;
    }

    // Strip brackets from IPv6 addresses for parsing
    let host_for_parse = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    host_for_parse
        .parse::<IpAddr>()
        .is_ok_and(|ip| ip.is_loopback())
}
