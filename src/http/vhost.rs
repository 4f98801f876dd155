//! Virtual host registry.
//!
//! Holds what each hostname serves before the server starts: an optional
//! root directory served at `/`, plus mounts layered on top of it.
//!
//! # Design Decisions
//! - First registration of a root wins; later ones are ignored with a warning
//! - Mounts accumulate in declaration order and are never deduplicated
//! - A mount whose source is not a directory is dropped with a warning

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::routing::matcher::normalize_path;

/// A URL path bound to a local directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub url_path: String,
    pub source_path: PathBuf,
}

/// Everything served for one hostname.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VhostConfig {
    pub hostname: String,
    pub repo_root: Option<PathBuf>,
    pub mounts: Vec<Mount>,
}

/// Hostname → `VhostConfig`, owned by exactly one server.
#[derive(Debug, Clone, Default)]
pub struct VhostMap {
    hosts: BTreeMap<String, VhostConfig>,
}

impl VhostMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `hostname`, optionally with a root directory.
    ///
    /// Returns `false` when a root was given but the host already has one;
    /// the existing root is kept.
    pub fn register(&mut self, hostname: &str, repo_root: Option<PathBuf>) -> bool {
        let hostname = hostname.to_ascii_lowercase();
        let vhost = self.entry(&hostname);

        match (repo_root, &vhost.repo_root) {
            (Some(new_root), Some(existing)) => {
                tracing::warn!(
                    hostname = %hostname,
                    existing = %existing.display(),
                    ignored = %new_root.display(),
                    "Virtual host already has a root; keeping the first"
                );
                false
            }
            (Some(new_root), None) => {
                tracing::info!(hostname = %hostname, root = %new_root.display(), "Registered virtual host root");
                vhost.repo_root = Some(new_root);
                true
            }
            (None, _) => true,
        }
    }

    /// Serve `source_path` under `url_path` on `hostname`.
    ///
    /// Returns `false` (and logs) when the source is not an existing directory.
    pub fn mount(&mut self, hostname: &str, url_path: &str, source_path: impl Into<PathBuf>) -> bool {
        let hostname = hostname.to_ascii_lowercase();
        let source_path = source_path.into();

        if !is_dir(&source_path) {
            tracing::warn!(
                hostname = %hostname,
                url_path = %url_path,
                source = %source_path.display(),
                "Mount source is not a directory; skipping"
            );
            return false;
        }

        let url_path = normalize_path(url_path);
        tracing::info!(
            hostname = %hostname,
            url_path = %url_path,
            source = %source_path.display(),
            "Added mount"
        );
        self.entry(&hostname).mounts.push(Mount {
            url_path,
            source_path,
        });
        true
    }

    pub fn get(&self, hostname: &str) -> Option<&VhostConfig> {
        self.hosts.get(&hostname.to_ascii_lowercase())
    }

    pub fn contains(&self, hostname: &str) -> bool {
        self.get(hostname).is_some()
    }

    pub fn hostnames(&self) -> Vec<String> {
        self.hosts.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VhostConfig> {
        self.hosts.values()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn clear(&mut self) {
        self.hosts.clear();
    }

    fn entry(&mut self, hostname: &str) -> &mut VhostConfig {
        self.hosts
            .entry(hostname.to_string())
            .or_insert_with(|| VhostConfig {
                hostname: hostname.to_string(),
                ..VhostConfig::default()
            })
    }
}

pub(crate) fn is_dir(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}
