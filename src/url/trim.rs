use crate::url::extract_domain;
use crate::{UrlError, UrlResult};
use url::Url;

/// Host whose status pages are never collected as links
const STATUS_HOST: &str = "twitter.com";

/// Path prefix of a status page linking back to itself
const STATUS_PATH_PREFIX: &str = "/i/web/status/";

/// A shared link reduced to the parts the polling mode stores
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimmedUrl {
    /// `scheme://domain/path?query`, without `www.` and fragment
    pub url: String,
    pub domain: String,
    pub scheme: String,
}

/// Trims a shared link and filters out links that carry no content
///
/// # Trimming Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Lowercase the host and remove a leading `www.`
/// 3. Drop the fragment
/// 4. Keep scheme, path and query untouched
///
/// Links back to a status page (`twitter.com/i/web/status/<id>`) are filtered.
///
/// # Returns
///
/// * `Ok(Some(TrimmedUrl))` - The trimmed link
/// * `Ok(None)` - The link was filtered
/// * `Err(UrlError)` - The link could not be parsed
///
/// # Examples
///
/// ```
/// use social_harvest::url::trim_and_filter_url;
///
/// let trimmed = trim_and_filter_url("https://www.example.com/a?b=1#c").unwrap().unwrap();
/// assert_eq!(trimmed.url, "https://example.com/a?b=1");
///
/// assert!(trim_and_filter_url("https://twitter.com/i/web/status/1").unwrap().is_none());
/// ```
pub fn trim_and_filter_url(url_str: &str) -> UrlResult<Option<TrimmedUrl>> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    let domain = extract_domain(&url).ok_or(UrlError::MissingDomain)?;

    if domain == STATUS_HOST && url.path().starts_with(STATUS_PATH_PREFIX) {
        return Ok(None);
    }

    let scheme = url.scheme().to_string();
    let mut trimmed = format!("{}://{}{}", scheme, domain, url.path());
    if let Some(query) = url.query() {
        if !query.is_empty() {
            trimmed.push('?');
            trimmed.push_str(query);
        }
    }

    Ok(Some(TrimmedUrl {
        url: trimmed,
        domain,
        scheme,
    }))
}

/// Derives a filesystem-friendly profile name from a profile link
///
/// `https://www.facebook.com/Some Page/` becomes `Some_Page`. Returns `None`
/// when the link has no usable path.
pub fn profile_name_from_link(link: &str) -> Option<String> {
    let url = Url::parse(link.trim()).ok()?;
    let name = url.path().replace('/', "").replace(' ', "_");
    let name = name.replace("%20", "_");

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
