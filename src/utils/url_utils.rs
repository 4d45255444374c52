//! URL validation and normalization utilities.

use url::Url;

/// Check if a URL is valid for fetching: parses as an absolute `http`/`https`
/// URL and is not a `data:`/`javascript:`/`mailto:` pseudo-scheme.
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Normalize a URL for deduplication (§4.4): lowercase scheme and host,
/// strip a trailing slash from an otherwise-root path, drop the fragment.
#[must_use]
pub fn normalize_url(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    parsed.set_fragment(None);

    if parsed.path() == "/" {
        parsed.set_path("");
    }

    Some(parsed.as_str().to_string())
}

/// Extract the host component of a URL, if any.
#[must_use]
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_urls() {
        assert!(is_valid_url("https://example.com/page"));
        assert!(is_valid_url("http://example.com"));
        assert!(!is_valid_url("data:text/plain,hello"));
        assert!(!is_valid_url("javascript:alert(1)"));
        assert!(!is_valid_url(""));
        assert!(!is_valid_url("not a url"));
    }

    #[test]
    fn normalizes_trailing_slash_and_fragment() {
        let a = normalize_url("https://Example.com/").unwrap();
        let b = normalize_url("https://Example.com#section").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn extracts_host() {
        assert_eq!(
            host_of("https://example.com/page").as_deref(),
            Some("example.com")
        );
        assert_eq!(host_of("not a url"), None);
    }
}
