//! Link scoping and normalization.
//!
//! Decides which raw hrefs a crawl follows and turns relative ones into
//! absolute URLs. Relative hrefs are joined onto the page's `scheme://host`
//! with a simple separator rule instead of full reference resolution, so
//! `a/b/../c` on `https://h/x/y` becomes `https://h/a/b/../c`.

use tracing::debug;
use url::{ParseError, Url};

/// The parts of an href the scoping rules look at.
#[derive(Debug, PartialEq, Eq)]
struct LinkRef {
    scheme: Option<String>,
    host: Option<String>,
    path: String,
}

/// Accept `raw_href` found on `page_url` and return its absolute form, or
/// `None` if the crawl should not follow it. An empty `host` disables the
/// host restriction.
pub fn accept_and_normalize(raw_href: &str, page_url: &str, host: &str) -> Option<String> {
    let href = raw_href.trim();

    if href.is_empty() {
        return None;
    }

    // Same-page fragment
    if href.starts_with('#') {
        return None;
    }

    // Parent-relative traversal
    if href.starts_with("..") {
        return None;
    }

    // The URL parser would silently drop tabs and newlines
    if href.chars().any(char::is_control) {
        debug!("Dropping href with control characters {:?} on {}", href, page_url);
        return None;
    }

    let link = match parse_reference(href) {
        Some(link) => link,
        None => {
            debug!("Dropping unparseable href {:?} on {}", href, page_url);
            return None;
        }
    };

    if !in_scope(&link, host) {
        return None;
    }

    Some(normalize(href, &link, page_url))
}

/// Whether a link may be followed from a crawl restricted to `host`.
fn in_scope(link: &LinkRef, host: &str) -> bool {
    // A schemeless link to an extensionless or .html path is a page on this site
    if link.scheme.is_none() {
        let extension = path_extension(&link.path);
        if extension.is_empty() || extension == ".html" {
            return true;
        }
    }

    host.is_empty() || link.host.as_deref() == Some(host)
}

fn normalize(href: &str, link: &LinkRef, page_url: &str) -> String {
    if link.host.as_deref().is_some_and(|h| !h.is_empty()) {
        return href.to_string();
    }

    match base_url(page_url) {
        Some(base) => {
            let separator = if href.starts_with('/') || base.ends_with('/') {
                ""
            } else {
                "/"
            };
            format!("{}{}{}", base, separator, href)
        }
        None => {
            debug!("Cannot resolve {:?} against page {:?}, keeping it as-is", href, page_url);
            href.to_string()
        }
    }
}

/// `scheme://host[:port]` of an absolute page URL.
fn base_url(page_url: &str) -> Option<String> {
    let parsed = Url::parse(page_url).ok()?;
    let authority = host_with_port(&parsed)?;
    Some(format!("{}://{}", parsed.scheme(), authority))
}

/// The host a crawl of `url` is restricted to: the host name plus any
/// explicit port, e.g. `127.0.0.1:8080`.
pub fn host_with_port(url: &Url) -> Option<String> {
    let host = url.host_str().filter(|h| !h.is_empty())?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Parse an href as either an absolute URL or a relative reference.
///
/// The host is kept as written: `EXAMPLE.com` and `example.com:443` do not
/// match a crawl of `example.com`.
fn parse_reference(href: &str) -> Option<LinkRef> {
    match Url::parse(href) {
        Ok(url) => {
            let after_scheme = &href[url.scheme().len() + 1..];
            Some(LinkRef {
                scheme: Some(url.scheme().to_string()),
                host: raw_host(after_scheme),
                path: url.path().to_string(),
            })
        }
        Err(ParseError::RelativeUrlWithoutBase) => parse_relative(href),
        Err(_) => None,
    }
}

/// `host[:port]` of a `//authority...` reference exactly as written, without
/// any userinfo.
fn raw_host(reference: &str) -> Option<String> {
    let rest = reference.strip_prefix("//")?;
    let authority_end = rest.find(['/', '\\', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..authority_end];
    let host = authority.rsplit('@').next().unwrap_or_default();
    (!host.is_empty()).then(|| host.to_string())
}

fn parse_relative(href: &str) -> Option<LinkRef> {
    let path_end = href.find(['?', '#']).unwrap_or(href.len());
    let path = &href[..path_end];

    // Protocol-relative: //host/path
    if let Some(rest) = path.strip_prefix("//") {
        let authority_end = rest.find('/').unwrap_or(rest.len());
        return Some(LinkRef {
            scheme: None,
            host: raw_host(href),
            path: rest[authority_end..].to_string(),
        });
    }

    // A colon before the first slash would have to be a scheme, and it wasn't a valid one
    let first_segment = path.split('/').next().unwrap_or_default();
    if first_segment.contains(':') {
        return None;
    }

    Some(LinkRef {
        scheme: None,
        host: None,
        path: path.to_string(),
    })
}

/// Extension of the last path segment, including the dot (`""` if none).
fn path_extension(path: &str) -> &str {
    let segment = path.rsplit('/').next().unwrap_or_default();
    segment.rfind('.').map(|i| &segment[i..]).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://example.com/docs/index.html";
    const HOST: &str = "example.com";

    #[test]
    fn test_rejects_empty_and_whitespace() {
        assert_eq!(accept_and_normalize("", PAGE, HOST), None);
        assert_eq!(accept_and_normalize("   \t\n", PAGE, HOST), None);
    }

    #[test]
    fn test_rejects_fragment() {
        assert_eq!(accept_and_normalize("#section", PAGE, HOST), None);
        assert_eq!(accept_and_normalize("  #top", PAGE, ""), None);
    }

    #[test]
    fn test_rejects_parent_relative() {
        assert_eq!(accept_and_normalize("../up", PAGE, HOST), None);
        assert_eq!(accept_and_normalize("..", PAGE, ""), None);
    }

    #[test]
    fn test_rejects_malformed_scheme() {
        assert_eq!(accept_and_normalize("http$://", PAGE, HOST), None);
        assert_eq!(accept_and_normalize("http$://", "", ""), None);
    }

    #[test]
    fn test_rejects_control_characters() {
        assert_eq!(accept_and_normalize("/a\u{7f}b", PAGE, ""), None);
        assert_eq!(accept_and_normalize("/a\nb", PAGE, HOST), None);
    }

    #[test]
    fn test_rejects_control_characters_in_absolute_href() {
        assert_eq!(accept_and_normalize("https://example.com/a\nb", PAGE, HOST), None);
        assert_eq!(accept_and_normalize("https://example.com/a\tb", PAGE, HOST), None);
        assert_eq!(accept_and_normalize("https://other.com/a\rb", PAGE, ""), None);
        assert_eq!(
            accept_and_normalize("https://example.com/ab", PAGE, HOST),
            Some("https://example.com/ab".to_string())
        );
    }

    #[test]
    fn test_host_is_compared_as_written() {
        assert_eq!(accept_and_normalize("https://example.com:443/a", PAGE, HOST), None);
        assert_eq!(accept_and_normalize("https://EXAMPLE.com/a", PAGE, HOST), None);
        assert_eq!(accept_and_normalize("//EXAMPLE.com/a", PAGE, HOST), None);
        assert_eq!(
            accept_and_normalize("https://example.com:443/a", PAGE, "example.com:443"),
            Some("https://example.com:443/a".to_string())
        );
    }

    #[test]
    fn test_userinfo_is_not_part_of_host() {
        assert_eq!(
            accept_and_normalize("https://user:pw@example.com/a", PAGE, HOST),
            Some("https://user:pw@example.com/a".to_string())
        );
    }

    #[test]
    fn test_raw_host() {
        assert_eq!(raw_host("//Example.com:8080/x"), Some("Example.com:8080".to_string()));
        assert_eq!(raw_host("//example.com?q=1"), Some("example.com".to_string()));
        assert_eq!(raw_host("//a@b.test"), Some("b.test".to_string()));
        assert_eq!(raw_host("///path"), None);
        assert_eq!(raw_host("press@google.com"), None);
    }

    #[test]
    fn test_rejects_other_host() {
        assert_eq!(accept_and_normalize("https://other.com/page", PAGE, HOST), None);
    }

    #[test]
    fn test_accepts_same_host_absolute_as_is() {
        assert_eq!(
            accept_and_normalize("https://example.com/about.php?x=1", PAGE, HOST),
            Some("https://example.com/about.php?x=1".to_string())
        );
    }

    #[test]
    fn test_root_relative_is_joined_to_page_origin() {
        assert_eq!(
            accept_and_normalize("/local", PAGE, HOST),
            Some("https://example.com/local".to_string())
        );
    }

    #[test]
    fn test_page_relative_gets_separator() {
        assert_eq!(
            accept_and_normalize("contact", PAGE, HOST),
            Some("https://example.com/contact".to_string())
        );
        assert_eq!(
            accept_and_normalize("guide.html", PAGE, HOST),
            Some("https://example.com/guide.html".to_string())
        );
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        assert_eq!(
            accept_and_normalize("  /padded \n", PAGE, HOST),
            Some("https://example.com/padded".to_string())
        );
    }

    #[test]
    fn test_port_is_kept_in_base_and_host_match() {
        let page = "http://127.0.0.1:8080/";
        let host = "127.0.0.1:8080";
        assert_eq!(
            accept_and_normalize("/next", page, host),
            Some("http://127.0.0.1:8080/next".to_string())
        );
        assert_eq!(
            accept_and_normalize("http://127.0.0.1:8080/abs", page, host),
            Some("http://127.0.0.1:8080/abs".to_string())
        );
        assert_eq!(accept_and_normalize("http://127.0.0.1:9090/abs", page, host), None);
    }

    #[test]
    fn test_schemeless_asset_needs_matching_host() {
        assert_eq!(accept_and_normalize("/css/default.asp", PAGE, HOST), None);
        assert_eq!(accept_and_normalize("logo.png", PAGE, HOST), None);
    }

    #[test]
    fn test_no_host_restriction_accepts_everything_parseable() {
        assert_eq!(
            accept_and_normalize("https://other.com/page", PAGE, ""),
            Some("https://other.com/page".to_string())
        );
        assert_eq!(
            accept_and_normalize("/css/default.asp", PAGE, ""),
            Some("https://example.com/css/default.asp".to_string())
        );
    }

    #[test]
    fn test_unparseable_page_url_keeps_raw_href() {
        assert_eq!(
            accept_and_normalize("html_images.asp", "", ""),
            Some("html_images.asp".to_string())
        );
        assert_eq!(
            accept_and_normalize("/css/default.asp", "not a url", ""),
            Some("/css/default.asp".to_string())
        );
    }

    #[test]
    fn test_extension_ignores_query_string() {
        assert_eq!(
            accept_and_normalize("/search?q=a.b", PAGE, HOST),
            Some("https://example.com/search?q=a.b".to_string())
        );
    }

    #[test]
    fn test_protocol_relative_keeps_href() {
        assert_eq!(
            accept_and_normalize("//example.com/page", PAGE, HOST),
            Some("//example.com/page".to_string())
        );
    }

    #[test]
    fn test_normalized_in_host_url_is_stable() {
        for href in ["/a", "b", "c.html", "https://example.com/d?x=1"] {
            let once = accept_and_normalize(href, PAGE, HOST).expect("accepted");
            let twice = accept_and_normalize(&once, PAGE, HOST);
            assert_eq!(twice.as_deref(), Some(once.as_str()));
        }
    }

    #[test]
    fn test_multi_segment_relative_is_not_resolved() {
        // Known limitation: relative paths are joined to the origin, not the page directory
        assert_eq!(
            accept_and_normalize("a/b/../c", "https://example.com/x/y", HOST),
            Some("https://example.com/a/b/../c".to_string())
        );
    }

    #[test]
    fn test_path_extension() {
        assert_eq!(path_extension("/css/default.asp"), ".asp");
        assert_eq!(path_extension("/a.b/c"), "");
        assert_eq!(path_extension("index.html"), ".html");
        assert_eq!(path_extension(""), "");
    }
}
