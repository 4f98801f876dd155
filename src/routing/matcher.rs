//! Host and path matching.
//!
//! # Responsibilities
//! - Extract the virtual hostname a request is addressed to
//! - Match mount paths on path-segment boundaries
//!
//! # Design Decisions
//! - Host matching is case-insensitive (RFC 9110), port ignored
//! - Path matching is case-sensitive and works on the raw (encoded) path
//! - `/seen` matches `/seen` and `/seen/x`, never `/seenery`

use axum::body::Body;
use axum::http::{header, Request};

/// Hostname a request targets: the `Host` header, or the URI authority for
/// absolute-form / HTTP/2 requests. Lowercased, without port or trailing dot.
pub fn request_host(req: &Request<Body>) -> Option<String> {
    let raw = req
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| req.uri().authority().map(|a| a.as_str()))?;
    normalize_host(raw)
}

/// `Example.COM:8080` → `example.com`, `[::1]:80` → `[::1]`.
pub fn normalize_host(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let host = if raw.starts_with('[') {
        let end = raw.find(']')?;
        &raw[..=end]
    } else {
        raw.split(':').next().unwrap_or_default()
    };
    let host = host.trim_end_matches('.');
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}

/// Matches a request path against a mount path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    /// Normalized: leading slash, no trailing slash (except the root `/`).
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: normalize_path(prefix),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn is_root(&self) -> bool {
        self.prefix == "/"
    }

    /// The part of `path` below the prefix: empty or starting with `/`.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.is_root() {
            return path.starts_with('/').then_some(path);
        }
        let rest = path.strip_prefix(self.prefix.as_str())?;
        (rest.is_empty() || rest.starts_with('/')).then_some(rest)
    }
}

/// `seen/` → `/seen`, `` → `/`.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}")
    }
}
