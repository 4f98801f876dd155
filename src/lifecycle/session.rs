//! One preparation-and-serve run.
//!
//! # Responsibilities
//! - Own the work directory (clones, generated crawler config)
//! - Clone repositories and turn clone outcomes into virtual hosts
//! - Mount directory entries, mirror everything on `localhost` when asked
//! - Start the server, then install the hostname resolution override
//! - Translate the config for the crawler and hand off to it
//! - Tear everything down on every exit path
//!
//! # Design Decisions
//! - Validation happens before a `Session` exists; nothing here aborts on a
//!   single bad repository or mount
//! - Only server start and override install are fatal, and both tear down
//!   whatever was already set up before returning
//! - `teardown` is idempotent and never fails

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use serde_json::Value;
use tempfile::TempDir;

use crate::config::{to_crawler_config, PublicEndpoint, RuntimeSettings, ValidatedConfig};
use crate::crawler::{self, CrawlerError};
use crate::http::VirtualHostServer;
use crate::lifecycle::RunError;
use crate::resolve::{HostsFileOverride, NoopOverride, ResolutionOverride};
use crate::sources::{CloneOutcome, GitCloner};

const CLONES_DIR: &str = "repositories";
const CRAWLER_CONFIG_FILE: &str = "crawler-config.json";
const LOCALHOST: &str = "localhost";

/// Clone outcomes for one repository entry, in `git_urls` order.
#[derive(Debug, Clone)]
pub struct RepositoryClones {
    pub host: String,
    pub outcomes: Vec<CloneOutcome>,
}

impl RepositoryClones {
    pub fn successes(&self) -> impl Iterator<Item = &Path> {
        self.outcomes.iter().filter_map(CloneOutcome::path)
    }
}

pub struct Session {
    settings: RuntimeSettings,
    config: ValidatedConfig,
    work_dir: PathBuf,
    temp_dir: Option<TempDir>,
    server: VirtualHostServer,
    resolution: Box<dyn ResolutionOverride>,
    clones: Vec<RepositoryClones>,
    local_addr: Option<SocketAddr>,
    crawler_config: Value,
    torn_down: bool,
}

impl Session {
    /// Materialize sources, start serving, and install the resolution
    /// override. On error everything already set up has been torn down.
    pub async fn prepare(config: ValidatedConfig, settings: RuntimeSettings) -> Result<Self, RunError> {
        let (work_dir, temp_dir) = match &settings.work_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|source| RunError::WorkDir {
                    path: dir.clone(),
                    source,
                })?;
                (dir.clone(), None)
            }
            None => {
                let temp = tempfile::Builder::new()
                    .prefix("sitemount-")
                    .tempdir()
                    .map_err(|source| RunError::WorkDir {
                        path: std::env::temp_dir(),
                        source,
                    })?;
                (temp.path().to_path_buf(), Some(temp))
            }
        };
        tracing::info!(work_dir = %work_dir.display(), "Prepared work directory");

        let resolution: Box<dyn ResolutionOverride> = if settings.dry_run {
            Box::new(NoopOverride::default())
        } else {
            Box::new(HostsFileOverride::new(
                settings.hosts_file.clone(),
                settings.advertise_address,
            ))
        };

        let mut session = Session {
            server: VirtualHostServer::new(settings.server.clone()),
            settings,
            config,
            work_dir,
            temp_dir,
            resolution,
            clones: Vec::new(),
            local_addr: None,
            crawler_config: Value::Null,
            torn_down: false,
        };

        session.materialize().await;

        if let Err(e) = session.activate().await {
            session.teardown().await;
            return Err(e);
        }
        Ok(session)
    }

    /// Clone repositories and build the virtual host table.
    async fn materialize(&mut self) {
        let cloner = GitCloner::new(self.work_dir.join(CLONES_DIR))
            .with_program(self.settings.git_program.clone());
        let mut mirrored: Vec<(String, PathBuf)> = Vec::new();

        for (i, entry) in self.config.repositories().enumerate() {
            let mut outcomes = Vec::with_capacity(entry.git_urls.len());
            for (j, git_url) in entry.git_urls.iter().enumerate() {
                outcomes.push(cloner.clone_repo(git_url.as_str(), &format!("repo-{i}-{j}")).await);
            }

            let clones = RepositoryClones {
                host: entry.host.clone(),
                outcomes,
            };
            let mut successes = entry.git_urls.iter().zip(&clones.outcomes).filter_map(|(git, outcome)| {
                outcome.path().map(|path| (git.mount_path(), path.to_path_buf()))
            });

            match successes.next() {
                None => tracing::warn!(
                    hostname = %entry.host,
                    failed = clones.outcomes.len(),
                    "Every clone failed; host will not be served"
                ),
                Some((mount_path, path)) => {
                    self.server.register(&entry.host, Some(path.clone()));
                    for (mount_path, path) in std::iter::once((mount_path, path)).chain(successes) {
                        if self.server.mount(&entry.host, &mount_path, &path) {
                            mirrored.push((mount_path, path));
                        }
                    }
                }
            }
            self.clones.push(clones);
        }

        for entry in self.config.directories() {
            for mount in &entry.mounts {
                if self.server.mount(&entry.host, mount.url_path(), &mount.local_path) {
                    mirrored.push((mount.url_path().to_string(), mount.local_path.clone()));
                }
            }
        }

        let localhost_declared = self.config.hostnames().iter().any(|h| h.eq_ignore_ascii_case(LOCALHOST));
        if self.settings.mirror_on_localhost && !localhost_declared {
            for (url_path, path) in &mirrored {
                self.server.mount(LOCALHOST, url_path, path);
            }
        }
    }

    /// Start the server, install the override, and translate the config.
    async fn activate(&mut self) -> Result<(), RunError> {
        self.local_addr = self.server.start().await?;

        let endpoint = match self.local_addr {
            Some(addr) => PublicEndpoint { port: addr.port() },
            None => {
                tracing::warn!("No virtual host could be served; the crawler will only see remote domains");
                PublicEndpoint::default()
            }
        };

        if self.local_addr.is_some() {
            let hostnames: Vec<String> = self
                .server
                .hostnames()
                .into_iter()
                .filter(|h| h != LOCALHOST)
                .collect();
            if !hostnames.is_empty() {
                self.resolution.install(&hostnames)?;
            }
        }

        self.crawler_config = to_crawler_config(&self.config, &endpoint);
        Ok(())
    }

    pub fn server(&self) -> &VirtualHostServer {
        &self.server
    }

    /// Address the server is bound to, `None` when nothing is served.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn clones(&self) -> &[RepositoryClones] {
        &self.clones
    }

    /// Hostnames currently covered by the resolution override.
    pub fn overridden_hostnames(&self) -> &[String] {
        self.resolution.hostnames()
    }

    pub fn crawler_config(&self) -> &Value {
        &self.crawler_config
    }

    /// Write the crawler config as JSON into the work directory.
    pub fn write_crawler_config(&self) -> Result<PathBuf, RunError> {
        let path = self.work_dir.join(CRAWLER_CONFIG_FILE);
        let write = serde_json::to_vec_pretty(&self.crawler_config)
            .map_err(std::io::Error::from)
            .and_then(|bytes| std::fs::write(&path, bytes));
        write.map_err(|source| RunError::WriteConfig {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), "Wrote crawler config");
        Ok(path)
    }

    /// Write the crawler config and run the crawler on it. Returns `None` in
    /// dry-run mode, where the crawler is not started.
    pub async fn run_crawler(&self, extra_args: &[String]) -> Result<Option<ExitStatus>, RunError> {
        let config_path = self.write_crawler_config()?;
        if self.settings.dry_run {
            tracing::info!(config = %config_path.display(), "Dry run: not starting the crawler");
            return Ok(None);
        }

        let program = self
            .settings
            .crawler_program
            .as_deref()
            .ok_or(CrawlerError::NotConfigured)?;
        let status = crawler::run_crawler(program, &config_path, extra_args).await?;
        Ok(Some(status))
    }

    /// Stop the server, remove the override, and delete the clones. Safe to
    /// call more than once.
    pub async fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        tracing::info!("Tearing down");

        self.server.stop().await;

        if let Err(e) = self.resolution.remove() {
            tracing::error!(error = %e, "Failed to remove hostname resolution override");
        }

        match self.temp_dir.take() {
            Some(temp) => {
                let path = temp.path().to_path_buf();
                if let Err(e) = temp.close() {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove work directory");
                }
            }
            None => {
                let clones = self.work_dir.join(CLONES_DIR);
                match std::fs::remove_dir_all(&clones) {
                    Ok(()) => tracing::debug!(path = %clones.display(), "Removed clones"),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => tracing::warn!(path = %clones.display(), error = %e, "Failed to remove clones"),
                }
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.torn_down {
            tracing::warn!("Session dropped without teardown; removing resolution override");
            if let Err(e) = self.resolution.remove() {
                tracing::error!(error = %e, "Failed to remove hostname resolution override");
            }
        }
    }
}
