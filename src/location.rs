//! Location snapshots and path resolution.
//!
//! A [`LocationSnapshot`] is the decomposed form of a URL without its origin:
//! `pathname`, `search` (including the leading `?`) and `hash` (including the
//! leading `#`). It is what the router records per application and what guards
//! receive as `to` / `from`.
//!
//! Requested paths are resolved against a base with the [`url`] crate, so
//! relative segments (`../list`), query-only paths (`?page=2`) and absolute
//! URLs all work. When a path carries its own origin, only its path, search and
//! hash survive resolution.
//!
//! # Examples
//!
//! ```
//! use micro_navigator::LocationSnapshot;
//!
//! let loc = LocationSnapshot::resolve("http://localhost:3000/child/", "users?id=7#top").unwrap();
//! assert_eq!(loc.pathname, "/child/users");
//! assert_eq!(loc.search, "?id=7");
//! assert_eq!(loc.hash, "#top");
//! assert_eq!(loc.full_path(), "/child/users?id=7#top");
//! ```

use std::fmt;
use url::Url;

/// Where an application currently thinks it is.
///
/// Snapshots are values: a navigation produces a new snapshot and never
/// mutates an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationSnapshot {
    /// Path component, always starting with `/`.
    pub pathname: String,
    /// Query string including the leading `?`, or empty.
    pub search: String,
    /// Fragment including the leading `#`, or empty.
    pub hash: String,
}

impl LocationSnapshot {
    /// Create a snapshot from already decomposed parts.
    pub fn new(
        pathname: impl Into<String>,
        search: impl Into<String>,
        hash: impl Into<String>,
    ) -> Self {
        Self {
            pathname: pathname.into(),
            search: search.into(),
            hash: hash.into(),
        }
    }

    /// Decompose a parsed URL, dropping its origin.
    pub fn from_url(url: &Url) -> Self {
        Self {
            pathname: url.path().to_string(),
            search: prefixed('?', url.query()),
            hash: prefixed('#', url.fragment()),
        }
    }

    /// Split a full path (`/path?query#hash`) into a snapshot.
    ///
    /// No validation happens here; the first `#` starts the hash and the
    /// first `?` before it starts the search.
    pub fn parse_full_path(full_path: &str) -> Self {
        let (rest, hash) = match full_path.find('#') {
            Some(idx) if idx + 1 < full_path.len() => full_path.split_at(idx),
            Some(idx) => (&full_path[..idx], ""),
            None => (full_path, ""),
        };
        let (pathname, search) = match rest.find('?') {
            Some(idx) if idx + 1 < rest.len() => rest.split_at(idx),
            Some(idx) => (&rest[..idx], ""),
            None => (rest, ""),
        };
        let pathname = if pathname.is_empty() { "/" } else { pathname };
        Self::new(pathname, search, hash)
    }

    /// Resolve `path` against `base` and decompose the result.
    pub fn resolve(base: &str, path: &str) -> Result<Self, url::ParseError> {
        let base = Url::parse(base)?;
        let target = base.join(path)?;
        Ok(Self::from_url(&target))
    }

    /// `pathname + search + hash`.
    pub fn full_path(&self) -> String {
        format!("{}{}{}", self.pathname, self.search, self.hash)
    }

    /// `search + hash`, the part co-resident applications contribute to the
    /// host history state.
    pub fn search_hash(&self) -> String {
        format!("{}{}", self.search, self.hash)
    }
}

impl Default for LocationSnapshot {
    fn default() -> Self {
        Self::new("/", "", "")
    }
}

impl fmt::Display for LocationSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.pathname, self.search, self.hash)
    }
}

// An empty query or fragment reads as "" in a browser location, not "?" / "#".
fn prefixed(prefix: char, part: Option<&str>) -> String {
    match part {
        Some(value) if !value.is_empty() => format!("{prefix}{value}"),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_to_base() {
        let loc = LocationSnapshot::resolve("http://localhost:3000/child/", "detail").unwrap();
        assert_eq!(loc.full_path(), "/child/detail");
    }

    #[test]
    fn test_resolve_absolute_path() {
        let loc = LocationSnapshot::resolve("http://localhost:3000/child/", "/home").unwrap();
        assert_eq!(loc, LocationSnapshot::new("/home", "", ""));
    }

    #[test]
    fn test_resolve_drops_foreign_origin() {
        let loc =
            LocationSnapshot::resolve("http://localhost:3000/", "https://evil.example/a?x=1#h")
                .unwrap();
        assert_eq!(loc.full_path(), "/a?x=1#h");
    }

    #[test]
    fn test_resolve_query_only() {
        let loc = LocationSnapshot::resolve("http://localhost:3000/list?page=1", "?page=2").unwrap();
        assert_eq!(loc.pathname, "/list");
        assert_eq!(loc.search, "?page=2");
    }

    #[test]
    fn test_resolve_invalid_base() {
        assert!(LocationSnapshot::resolve("not a url", "/a").is_err());
    }

    #[test]
    fn test_empty_query_and_fragment_are_dropped() {
        let loc = LocationSnapshot::resolve("http://localhost/", "/a?#").unwrap();
        assert_eq!(loc.search, "");
        assert_eq!(loc.hash, "");
    }

    #[test]
    fn test_parse_full_path() {
        let loc = LocationSnapshot::parse_full_path("/a/b?x=1&y=2#frag?not-query");
        assert_eq!(loc.pathname, "/a/b");
        assert_eq!(loc.search, "?x=1&y=2");
        assert_eq!(loc.hash, "#frag?not-query");
    }

    #[test]
    fn test_parse_full_path_bare() {
        assert_eq!(
            LocationSnapshot::parse_full_path(""),
            LocationSnapshot::default()
        );
        assert_eq!(
            LocationSnapshot::parse_full_path("/x?").full_path(),
            "/x"
        );
    }

    #[test]
    fn test_display_matches_full_path() {
        let loc = LocationSnapshot::new("/a", "?q", "#h");
        assert_eq!(loc.to_string(), loc.full_path());
        assert_eq!(loc.search_hash(), "?q#h");
    }
}
