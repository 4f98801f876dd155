//! Configuration schema definitions.
//!
//! Two families of types live here:
//! - the validated content model (`ValidatedConfig` and its entries), produced
//!   only by `validation::validate` and immutable afterwards;
//! - runtime settings (`RuntimeSettings`), which carry serde defaults so a
//!   caller only has to override what it cares about.

use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// A configuration that passed validation.
///
/// Entries keep the order of their sections (domains, then repositories, then
/// directories) and the order they were declared in.
#[derive(Debug, Clone, Default)]
pub struct ValidatedConfig {
    pub entries: Vec<ConfigEntry>,

    /// Top-level keys other than the three sections, handed to the crawler as-is.
    pub passthrough: Map<String, Value>,
}

impl ValidatedConfig {
    pub fn domains(&self) -> impl Iterator<Item = &DomainEntry> {
        self.entries.iter().filter_map(|e| match e {
            ConfigEntry::Domain(d) => Some(d),
            _ => None,
        })
    }

    pub fn repositories(&self) -> impl Iterator<Item = &RepositoryEntry> {
        self.entries.iter().filter_map(|e| match e {
            ConfigEntry::Repository(r) => Some(r),
            _ => None,
        })
    }

    pub fn directories(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries.iter().filter_map(|e| match e {
            ConfigEntry::Directory(d) => Some(d),
            _ => None,
        })
    }

    /// Every declared hostname, in declaration order.
    pub fn hostnames(&self) -> Vec<&str> {
        self.entries.iter().map(ConfigEntry::host).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One logical source, served under its own virtual hostname.
#[derive(Debug, Clone)]
pub enum ConfigEntry {
    Domain(DomainEntry),
    Repository(RepositoryEntry),
    Directory(DirectoryEntry),
}

impl ConfigEntry {
    pub fn host(&self) -> &str {
        match self {
            ConfigEntry::Domain(d) => &d.host,
            ConfigEntry::Repository(r) => &r.host,
            ConfigEntry::Directory(d) => &d.host,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ConfigEntry::Domain(_) => "domain",
            ConfigEntry::Repository(_) => "repository",
            ConfigEntry::Directory(_) => "directory",
        }
    }
}

/// An already-remote site. Passed through to the crawler untouched.
#[derive(Debug, Clone)]
pub struct DomainEntry {
    pub host: String,
    pub url: Url,
    pub seed_urls: Vec<Url>,

    /// The entry exactly as it was declared.
    pub raw: Map<String, Value>,
}

/// A set of git repositories served under one hostname.
#[derive(Debug, Clone)]
pub struct RepositoryEntry {
    pub host: String,
    pub url: Url,

    /// Never empty.
    pub git_urls: Vec<GitUrl>,

    /// Keys other than `url` and `git_urls`.
    pub extra: Map<String, Value>,
}

/// Local directories mounted under one hostname.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub host: String,
    pub url: Url,

    /// Never empty; every destination host equals `host`.
    pub mounts: Vec<MountSpec>,

    /// Keys other than `url` and `mounts`.
    pub extra: Map<String, Value>,
}

/// A local directory bound to a destination URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub local_path: PathBuf,
    pub dest_url: Url,
}

impl MountSpec {
    /// The URL path the directory is served at (never `/`).
    pub fn url_path(&self) -> &str {
        self.dest_url.path()
    }
}

/// A clone source: either a real URL or the SSH shorthand `user@host:path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitUrl {
    Url(Url),
    ScpLike {
        raw: String,
        host: String,
        path: String,
    },
}

impl GitUrl {
    /// The string handed to `git clone`.
    pub fn as_str(&self) -> &str {
        match self {
            GitUrl::Url(url) => url.as_str(),
            GitUrl::ScpLike { raw, .. } => raw,
        }
    }

    pub fn host(&self) -> &str {
        match self {
            GitUrl::Url(url) => url.host_str().unwrap_or_default(),
            GitUrl::ScpLike { host, .. } => host,
        }
    }

    /// Path the clone is mounted at: the repository path with any `.git`
    /// suffix removed, e.g. `/org/repo`. Falls back to `/<host>` when the URL
    /// has no path of its own.
    pub fn mount_path(&self) -> String {
        let path = match self {
            GitUrl::Url(url) => url.path(),
            GitUrl::ScpLike { path, .. } => path.as_str(),
        };
        let trimmed = path.trim_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
        let trimmed = trimmed.trim_end_matches('/');
        if trimmed.is_empty() {
            format!("/{}", self.host())
        } else {
            format!("/{trimmed}")
        }
    }
}

impl fmt::Display for GitUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings that control a run, as opposed to what is served.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeSettings {
    pub server: ServerConfig,

    /// Address written into the resolution override for every virtual host.
    pub advertise_address: IpAddr,

    /// Root for clones and the generated crawler config. A fresh temporary
    /// directory is used when unset.
    pub work_dir: Option<PathBuf>,

    /// Hosts file rewritten by the resolution override.
    pub hosts_file: PathBuf,

    /// External crawler executable.
    pub crawler_program: Option<PathBuf>,

    pub git_program: PathBuf,

    /// Skip the resolution override and the crawler hand-off.
    pub dry_run: bool,

    /// Also expose every mount under `localhost`.
    pub mirror_on_localhost: bool,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            advertise_address: IpAddr::from([127, 0, 0, 1]),
            work_dir: None,
            hosts_file: PathBuf::from("/etc/hosts"),
            crawler_program: None,
            git_program: PathBuf::from("git"),
            dry_run: false,
            mirror_on_localhost: true,
        }
    }
}

/// Virtual host server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:80").
    pub bind_address: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// How long `stop` waits for the accept loop before aborting it.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:80".to_string(),
            request_timeout_secs: 30,
            shutdown_timeout_secs: 5,
        }
    }
}
