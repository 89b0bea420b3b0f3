//! Scope predicates over URLs.
//!
//! Pure functions deciding host/port/path relationships between a candidate
//! URL and the configured crawl scope. Candidates that fail to parse as
//! absolute URLs fail every predicate.

use url::Url;

/// Strips leading and trailing slashes and lowercases, so `/Foo/` and `foo`
/// compare equal.
fn strip_for_match(path: &str) -> String {
    path.trim_matches('/').to_lowercase()
}

/// A port of 80 (or no port at all) collapses to the "no port" sentinel.
fn normalize_port(port: Option<u16>) -> Option<u16> {
    match port {
        Some(80) | None => None,
        explicit => explicit,
    }
}

/// True on exact match, or when `candidate` is a subdomain of `expected`.
/// The containment is asymmetric: `candidate` may sit under `expected`,
/// never the reverse.
pub fn host_matches(expected: &str, candidate: &str) -> bool {
    let expected = expected.to_lowercase();
    let candidate = candidate.to_lowercase();
    candidate == expected || candidate.ends_with(&format!(".{}", expected))
}

/// Two absent-or-80 ports match; two explicit ports match only when equal.
pub fn port_matches(expected: Option<u16>, candidate: Option<u16>) -> bool {
    normalize_port(expected) == normalize_port(candidate)
}

/// Exact string equality, or equality after slash-stripping and lowercasing.
pub fn path_matches(expected: &str, candidate: &str) -> bool {
    expected == candidate || strip_for_match(expected) == strip_for_match(candidate)
}

/// Strict descendant containment: `/something` contains `/something/sub` but
/// not `/somethingelse`, and not `/something` itself.
pub fn is_path_descendant(ancestor: &str, candidate: &str) -> bool {
    let prefix = format!("{}/", strip_for_match(ancestor));
    strip_for_match(candidate).starts_with(&prefix)
}

/// True immediately for the bare `"/"`. Otherwise the URL must match host,
/// path (equality, not descent) and port.
pub fn is_root_path(url: &str, host: &str, path: &str, port: Option<u16>) -> bool {
    if url == "/" {
        return true;
    }
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(hostname) = parsed.host_str() else {
        return false;
    };
    host_matches(host, hostname)
        && path_matches(path, parsed.path())
        && port_matches(port, parsed.port())
}

pub fn is_on_host(url: &str, host: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    match parsed.host_str() {
        Some(hostname) => host_matches(host, hostname),
        None => false,
    }
}

/// Host and port must match and the URL's path must be a strict descendant
/// of `path`. Note the contrast with [`is_root_path`], which requires path
/// equality.
pub fn is_on_path(url: &str, host: &str, path: &str, port: Option<u16>) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(hostname) = parsed.host_str() else {
        return false;
    };
    host_matches(host, hostname)
        && port_matches(port, parsed.port())
        && is_path_descendant(path, parsed.path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_matches_exact_and_subdomain() {
        assert!(host_matches("example.com", "example.com"));
        assert!(host_matches("example.com", "test.example.com"));
        assert!(host_matches("Example.COM", "test.example.com"));
        assert!(!host_matches("example.com", "example.org"));
        // containment never runs the other way
        assert!(!host_matches("test.example.com", "example.com"));
        // and suffix matches need the dot boundary
        assert!(!host_matches("example.com", "notexample.com"));
    }

    #[test]
    fn port_matches_collapses_defaults() {
        assert!(port_matches(None, None));
        assert!(port_matches(Some(80), None));
        assert!(port_matches(None, Some(80)));
        assert!(port_matches(Some(8008), Some(8008)));
        assert!(!port_matches(Some(8008), None));
        assert!(!port_matches(Some(8008), Some(8080)));
    }

    #[test]
    fn path_matches_ignores_slashes_and_case() {
        assert!(path_matches("/something", "/something"));
        assert!(path_matches("/Something/", "something"));
        assert!(!path_matches("/something", "/something/else"));
    }

    #[test]
    fn path_descendant_is_strict() {
        assert!(is_path_descendant("/something", "/something/sub"));
        assert!(is_path_descendant("/something", "/Something/sub/deeper"));
        assert!(!is_path_descendant("/something", "/somethingelse"));
        assert!(!is_path_descendant("/something", "/something"));
    }

    #[test]
    fn root_path_matches_host_path_and_port() {
        assert!(is_root_path(
            "http://www.jonstout.net/something/something",
            "jonstout.net",
            "/something/something",
            None
        ));
        assert!(is_root_path(
            "http://www.jonstout.net:8008/something/something",
            "jonstout.net",
            "/something/something",
            Some(8008)
        ));
        assert!(!is_root_path(
            "http://www.jonstout.net/something/something",
            "jonstout.net",
            "/something/something",
            Some(8008)
        ));
        assert!(!is_root_path(
            "http://www.jonstout.net/something/index.html",
            "jonstout.net",
            "/something/something",
            None
        ));
    }

    #[test]
    fn bare_root_is_always_root_path() {
        assert!(is_root_path("/", "anything.example", "/whatever", Some(9999)));
    }

    #[test]
    fn on_host_accepts_subdomains() {
        assert!(is_on_host("http://www.jonstout.net/something", "jonstout.net"));
        assert!(is_on_host("http://test.example.com/x", "example.com"));
        assert!(!is_on_host("http://www.jonstout.com/something", "jonstout.net"));
        assert!(!is_on_host("http://example.org/x", "example.com"));
        assert!(!is_on_host("not a url", "example.com"));
    }

    #[test]
    fn on_path_requires_strict_descent() {
        assert!(is_on_path(
            "https://www.jonstout.net/something/index.html",
            "www.jonstout.net",
            "/something",
            None
        ));
        assert!(!is_on_path(
            "https://www.jonstout.net/somethingelse/something.html",
            "www.jonstout.net",
            "/something",
            None
        ));
        // equality is not descent for this predicate
        assert!(!is_on_path(
            "https://www.jonstout.net/something",
            "www.jonstout.net",
            "/something",
            None
        ));
    }
}
