//! Allow-list for record image URLs.
//!
//! Patterns look like `https://*.vercel.app/**`: the host may start with `*.`
//! for any subdomain, a trailing `/**` matches any path below the prefix and a
//! trailing `/*` a single path segment. A pattern without a path matches any
//! path on that host.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/400x300?text=Image+unavailable";

lazy_static! {
    static ref ORIGIN_PATTERN: Regex =
        Regex::new(r"^(https?)://(\*\.)?([A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*)(/.*)?$")
            .expect("origin pattern regex is valid");
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("invalid image origin pattern {0:?}")]
pub struct PatternError(pub String);

/// The default list is empty and permits nothing.
#[derive(Debug, Clone, Default)]
pub struct ImageAllowList {
    patterns: Vec<Regex>,
}

impl ImageAllowList {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, PatternError> {
        let patterns = patterns
            .iter()
            .map(|p| compile(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ImageAllowList { patterns })
    }

    pub fn permits(&self, url: &str) -> bool {
        let url = url.split(|c| c == '?' || c == '#').next().unwrap_or_default();
        self.patterns.iter().any(|pattern| pattern.is_match(url))
    }

    /// The url itself when permitted, the placeholder otherwise.
    pub fn resolve<'a>(&self, url: &'a str) -> &'a str {
        if self.permits(url) {
            url
        } else {
            PLACEHOLDER_IMAGE
        }
    }
}

fn compile(pattern: &str) -> Result<Regex, PatternError> {
    let invalid = || PatternError(pattern.to_string());
    let captures = ORIGIN_PATTERN.captures(pattern).ok_or_else(invalid)?;

    let scheme = &captures[1];
    let host = regex::escape(&captures[3]);
    let subdomains = if captures.get(2).is_some() {
        r"[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\."
    } else {
        ""
    };

    let path = match captures.get(4).map(|m| m.as_str()) {
        None | Some("/") | Some("/**") => "(?:/.*)?".to_string(),
        Some(path) if path.ends_with("/**") => {
            format!("{}/.*", regex::escape(&path[..path.len() - 3]))
        }
        Some(path) if path.ends_with("/*") => {
            format!("{}/[^/]+", regex::escape(&path[..path.len() - 2]))
        }
        Some(path) if path.contains('*') => return Err(invalid()),
        Some(path) => regex::escape(path),
    };

    Regex::new(&format!("^{}://{}{}{}$", scheme, subdomains, host, path)).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_IMAGE_ORIGINS;

    fn defaults() -> ImageAllowList {
        ImageAllowList::new(&DEFAULT_IMAGE_ORIGINS[..]).unwrap()
    }

    #[test]
    fn storage_bucket_urls_are_permitted() {
        let list = defaults();
        assert!(list.permits(
            "https://faoqoakoiatxpymudknr.supabase.co/storage/v1/object/public/objects/lamp.png"
        ));
        assert!(list.permits(
            "https://faoqoakoiatxpymudknr.supabase.co/storage/v1/object/public/objects/a/b.jpg?t=1"
        ));
    }

    #[test]
    fn other_buckets_and_hosts_are_rejected() {
        let list = defaults();
        assert!(!list.permits(
            "https://faoqoakoiatxpymudknr.supabase.co/storage/v1/object/public/private/x.png"
        ));
        assert!(!list.permits("https://evil.example.com/objects/x.png"));
        assert!(!list.permits("http://app.vercel.app/x.png"));
        assert!(!list.permits("https://vercel.app.evil.com/x.png"));
    }

    #[test]
    fn wildcard_host_needs_a_subdomain() {
        let list = defaults();
        assert!(list.permits("https://my-app.vercel.app/images/x.png"));
        assert!(list.permits("https://a.b.vercel.app/"));
        assert!(!list.permits("https://vercel.app/x.png"));
    }

    #[test]
    fn single_segment_wildcard() {
        let list = ImageAllowList::new(&["https://cdn.example.com/img/*"][..]).unwrap();
        assert!(list.permits("https://cdn.example.com/img/a.png"));
        assert!(!list.permits("https://cdn.example.com/img/a/b.png"));
    }

    #[test]
    fn resolve_falls_back_to_placeholder() {
        let list = defaults();
        assert_eq!(list.resolve("ftp://example.com/x.png"), PLACEHOLDER_IMAGE);
        assert_eq!(
            list.resolve("https://my-app.vercel.app/x.png"),
            "https://my-app.vercel.app/x.png"
        );
    }

    #[test]
    fn empty_list_permits_nothing() {
        let list = ImageAllowList::default();
        assert!(!list.permits("https://my-app.vercel.app/x.png"));
    }

    #[test]
    fn malformed_patterns_are_rejected() {
        for pattern in &["cdn.example.com", "https://", "https://cdn.example.com/a*b"] {
            assert_eq!(
                ImageAllowList::new(&[*pattern][..]).unwrap_err(),
                PatternError(pattern.to_string())
            );
        }
    }
}
