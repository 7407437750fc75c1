use thiserror::Error;
use url::Url;

/// Errors that can occur when turning a notification's `actionUrl` into
/// something we are willing to hand to the system browser.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// A relative target with no site root configured to resolve it against.
    #[error("Relative link {0} needs site_url to be configured")]
    NoSiteRoot(String),
    /// Whitespace or control characters, which some openers pass to a shell.
    #[error("URL contains control characters or whitespace")]
    UnsafeCharacters,
    #[error("URL has no host")]
    MissingHost,
}

/// Resolves an `actionUrl` into an absolute URL safe to pass to `open::that`.
///
/// Relative paths (`/offers/42`, `offers/42`) are joined onto `site_root`.
/// Absolute targets must be `http` or `https` with a host; `javascript:`,
/// `file:` and friends are rejected, as is anything carrying control
/// characters.
///
/// # Examples
///
/// ```
/// use bellwire::util::resolve_action_url;
/// use url::Url;
///
/// let site = Url::parse("https://jobs.example.com/").unwrap();
/// let url = resolve_action_url("/offers/42", Some(&site)).unwrap();
/// assert_eq!(url.as_str(), "https://jobs.example.com/offers/42");
///
/// assert!(resolve_action_url("javascript:alert(1)", Some(&site)).is_err());
/// ```
pub fn resolve_action_url(target: &str, site_root: Option<&Url>) -> Result<Url, UrlValidationError> {
    if target
        .chars()
        .any(|c| c.is_control() || c.is_whitespace())
    {
        return Err(UrlValidationError::UnsafeCharacters);
    }

    let url = match Url::parse(target) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = site_root.ok_or_else(|| UrlValidationError::NoSiteRoot(target.to_string()))?;
            base.join(target)?
        }
        Err(e) => return Err(e.into()),
    };

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(url)
}
