//! Mount string resolution.
//!
//! A mount is declared as `"<absolute-local-path>:<destination-URL>"`, e.g.
//! `/data:https://filesystem.local/seen`. Resolution is pure: the local path
//! is not checked on disk here because clone targets may not exist yet.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::coerce::{host_of, parse_http_url};
use crate::config::schema::MountSpec;

/// Why a mount string was rejected. Every variant names the raw string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MountError {
    #[error("malformed mount '{raw}': {reason}")]
    Format { raw: String, reason: String },

    #[error("mount '{raw}' targets host '{found}' but its entry declares host '{expected}'")]
    HostMismatch {
        raw: String,
        expected: String,
        found: String,
    },

    #[error("mount '{raw}' must target a path other than '/'")]
    RootPath { raw: String },
}

/// Parse `raw` into a `MountSpec` whose destination lives on `declared_host`.
pub fn resolve_mount(raw: &str, declared_host: &str) -> Result<MountSpec, MountError> {
    let format_err = |reason: &str| MountError::Format {
        raw: raw.to_string(),
        reason: reason.to_string(),
    };

    if !raw.starts_with('/') {
        return Err(format_err("local path must be absolute"));
    }
    let (local, dest) = raw
        .split_once(':')
        .ok_or_else(|| format_err("expected '<local-path>:<destination-url>'"))?;
    if dest.is_empty() {
        return Err(format_err("destination URL is empty"));
    }

    let dest_url = parse_http_url(dest).map_err(|reason| format_err(&reason))?;

    let found = host_of(&dest_url);
    let expected = declared_host.to_ascii_lowercase();
    if found != expected {
        return Err(MountError::HostMismatch {
            raw: raw.to_string(),
            expected,
            found,
        });
    }

    if dest_url.path().is_empty() || dest_url.path() == "/" {
        return Err(MountError::RootPath { raw: raw.to_string() });
    }

    Ok(MountSpec {
        local_path: PathBuf::from(local),
        dest_url,
    })
}
