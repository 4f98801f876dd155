//! Hostname resolution override.
//!
//! Makes every virtual hostname resolve to the server for the duration of a
//! run, so an unmodified crawler can fetch `http://<virtual-host>/...`.
//!
//! # Design Decisions
//! - Mechanism behind a trait; the hosts-file block is the default
//! - `install` and `remove` are idempotent
//! - Dry runs use `NoopOverride` and leave the system untouched

pub mod hosts;

use std::path::PathBuf;

use thiserror::Error;

pub use hosts::HostsFileOverride;

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("failed to update {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A mechanism that maps hostnames to the local server.
pub trait ResolutionOverride: Send + Sync + std::fmt::Debug {
    /// Map `hostnames` to the server, replacing any previous mapping.
    fn install(&mut self, hostnames: &[String]) -> Result<(), ResolutionError>;

    /// Undo `install`. Succeeds when nothing is installed.
    fn remove(&mut self) -> Result<(), ResolutionError>;

    /// Hostnames currently mapped.
    fn hostnames(&self) -> &[String];
}

/// Records hostnames without touching the system.
#[derive(Debug, Default)]
pub struct NoopOverride {
    installed: Vec<String>,
}

impl ResolutionOverride for NoopOverride {
    fn install(&mut self, hostnames: &[String]) -> Result<(), ResolutionError> {
        tracing::info!(hosts = ?hostnames, "Dry run: skipping hostname resolution override");
        self.installed = hostnames.to_vec();
        Ok(())
    }

    fn remove(&mut self) -> Result<(), ResolutionError> {
        self.installed.clear();
        Ok(())
    }

    fn hostnames(&self) -> &[String] {
        &self.installed
    }
}
