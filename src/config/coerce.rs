//! Coercion of raw strings into typed URLs.
//!
//! Each function returns a short reason on failure; the caller attaches the
//! field path.

use url::Url;

use crate::config::schema::GitUrl;

/// Parse an absolute HTTP(S) URL with a non-empty host.
pub fn parse_http_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| format!("'{raw}' is not a valid URL: {e}"))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("'{raw}' has unsupported scheme '{other}' (expected http or https)")),
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(format!("'{raw}' has no host")),
    }
}

/// Parse a URL that names a host rather than a page: the path must be empty
/// or `/`.
pub fn parse_identity_url(raw: &str) -> Result<Url, String> {
    let url = parse_http_url(raw)?;
    if url.path() != "/" && !url.path().is_empty() {
        return Err(format!(
            "'{raw}' must name a host only, found path '{}'",
            url.path()
        ));
    }
    Ok(url)
}

/// Host of an already-parsed URL, lowercased.
pub fn host_of(url: &Url) -> String {
    url.host_str().unwrap_or_default().to_ascii_lowercase()
}

/// Parse a clone source: `http`, `https`, `ssh` or `git` URLs, or the SSH
/// shorthand `user@host:path`.
pub fn parse_git_url(raw: &str) -> Result<GitUrl, String> {
    if let Ok(url) = Url::parse(raw) {
        if matches!(url.scheme(), "http" | "https" | "ssh" | "git") {
            return match url.host_str() {
                Some(host) if !host.is_empty() => Ok(GitUrl::Url(url)),
                _ => Err(format!("'{raw}' has no host")),
            };
        }
        // "host:path" parses with "host" as the scheme; only the shorthand
        // check below can accept it.
    }

    parse_scp_like(raw).ok_or_else(|| {
        format!("'{raw}' is not a git URL (expected http, https, ssh, git or user@host:path)")
    })
}

fn parse_scp_like(raw: &str) -> Option<GitUrl> {
    let (authority, path) = raw.split_once(':')?;
    if authority.contains('/') || path.is_empty() || path.starts_with("//") {
        return None;
    }
    let (user, host) = authority.split_once('@')?;
    if user.is_empty() || host.is_empty() || host.contains('@') {
        return None;
    }
    Some(GitUrl::ScpLike {
        raw: raw.to_string(),
        host: host.to_ascii_lowercase(),
        path: path.to_string(),
    })
}
