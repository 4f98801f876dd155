//! Virtual host lookup.
//!
//! # Responsibilities
//! - Compile a `VhostMap` into an immutable lookup table at start
//! - Return, for a (host, path), the layers that may hold the target
//!
//! # Design Decisions
//! - Immutable after construction (shared via `Arc`, no locks)
//! - O(1) host lookup via HashMap, O(n) scan over a host's layers
//! - Longest mount prefix first; equal prefixes keep declaration order
//! - The root directory is always the last layer
//! - Sources are re-checked at compile time; vanished ones are dropped

use std::collections::HashMap;
use std::path::PathBuf;

use crate::http::vhost::{is_dir, VhostMap};
use crate::routing::matcher::PathPrefixMatcher;

/// One directory served under a path prefix.
#[derive(Debug, Clone)]
pub struct Layer {
    pub matcher: PathPrefixMatcher,
    pub source: PathBuf,
}

#[derive(Debug, Clone, Default)]
struct VirtualHost {
    layers: Vec<Layer>,
}

/// Compiled, read-only view of every virtual host.
#[derive(Debug, Clone, Default)]
pub struct VhostRouter {
    hosts: HashMap<String, VirtualHost>,
}

impl VhostRouter {
    pub fn from_vhosts(vhosts: &VhostMap) -> Self {
        let mut hosts = HashMap::with_capacity(vhosts.len());

        for vhost in vhosts.iter() {
            let mut layers: Vec<Layer> = Vec::with_capacity(vhost.mounts.len() + 1);

            for mount in &vhost.mounts {
                if !is_dir(&mount.source_path) {
                    tracing::warn!(
                        hostname = %vhost.hostname,
                        source = %mount.source_path.display(),
                        "Mount source disappeared before start; skipping"
                    );
                    continue;
                }
                layers.push(Layer {
                    matcher: PathPrefixMatcher::new(&mount.url_path),
                    source: mount.source_path.clone(),
                });
            }
            // Stable: equal prefixes stay in declaration order.
            layers.sort_by_key(|l| std::cmp::Reverse(l.matcher.prefix().len()));

            if let Some(root) = &vhost.repo_root {
                if is_dir(root) {
                    layers.push(Layer {
                        matcher: PathPrefixMatcher::new("/"),
                        source: root.clone(),
                    });
                } else {
                    tracing::warn!(
                        hostname = %vhost.hostname,
                        root = %root.display(),
                        "Virtual host root does not exist; serving mounts only"
                    );
                }
            }

            tracing::debug!(hostname = %vhost.hostname, layers = layers.len(), "Compiled virtual host");
            hosts.insert(vhost.hostname.clone(), VirtualHost { layers });
        }

        Self { hosts }
    }

    /// Layers of `host` matching `path`, each with the path remainder below
    /// its prefix. `None` when the host is unknown.
    pub fn candidates<'a, 'p>(&'a self, host: &str, path: &'p str) -> Option<Vec<(&'a Layer, &'p str)>> {
        let vhost = self.hosts.get(host)?;
        Some(
            vhost
                .layers
                .iter()
                .filter_map(|layer| layer.matcher.strip(path).map(|rest| (layer, rest)))
                .collect(),
        )
    }
}
