//! Canonical string forms for frontier keys.
//!
//! Every URL entering the path map goes through [`normalize`] first, so two
//! spellings of the same resource always land on the same key.

use url::Url;

/// Strips trailing slashes and lowercases the whole string. The bare site
/// root `"/"` is returned unchanged. Idempotent.
pub fn normalize(url: &str) -> String {
    if url == "/" {
        return url.to_string();
    }
    url.trim_end_matches('/').to_lowercase()
}

/// Rebuilds `scheme://host[:port]path` from a parsed URL and normalizes it.
/// The port segment is omitted when it equals the scheme default (the `url`
/// crate already collapses default ports to `None`).
pub fn normalize_parsed(url: &Url) -> String {
    let mut formatted = format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default());
    if let Some(port) = url.port() {
        formatted.push_str(&format!(":{}", port));
    }
    formatted.push_str(url.path());
    normalize(&formatted)
}

/// Resolves a discovered href against the page it was found on. Absolute
/// inputs pass straight through; relative references (root-relative,
/// protocol-relative, `.`/`..` forms) resolve per RFC 3986. The result is
/// always normalized.
pub fn resolve_discovered(path: &str, page_url: &str) -> String {
    if let Ok(absolute) = Url::parse(path) {
        return normalize(absolute.as_str());
    }
    match Url::parse(page_url).ok().and_then(|base| base.join(path).ok()) {
        Some(resolved) => normalize(resolved.as_str()),
        // Page URL itself isn't an absolute base (e.g. "/"), leave the
        // discovered path as-is.
        None => normalize(path),
    }
}
