use thiserror::Error;
use url::Url;

/// Errors that can occur while validating the forum base URL.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
    /// Query strings and fragments would be silently dropped when endpoint
    /// paths are appended.
    #[error("Base URL must not contain a query or fragment")]
    UnexpectedQuery,
}

/// Validates the forum base URL that endpoint paths are appended to.
///
/// Unlike feed URLs, a forum base may legitimately be `localhost` (a local
/// forum during development), so only the shape of the URL is checked:
/// - scheme must be `http` or `https`
/// - a host must be present
/// - no query string or fragment
///
/// The returned URL has any trailing `/` removed from its path.
///
/// # Examples
///
/// ```
/// use mistree::util::validate_base_url;
///
/// let url = validate_base_url("https://forum.example.com/").unwrap();
/// assert_eq!(url.as_str(), "https://forum.example.com/");
///
/// assert!(validate_base_url("file:///etc/passwd").is_err());
/// assert!(validate_base_url("https://forum.example.com/?x=1").is_err());
/// ```
pub fn validate_base_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let mut url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(UrlValidationError::UnexpectedQuery);
    }

    let trimmed = url.path().trim_end_matches('/').to_string();
    url.set_path(&trimmed);

    Ok(url)
}
