//! Hosts-file resolution override.
//!
//! Owns a marked block inside a hosts file:
//!
//! ```text
//! # BEGIN sitemount
//! 127.0.0.1 filesystem.local
//! 127.0.0.1 code.local
//! # END sitemount
//! ```
//!
//! Lines outside the block are never touched. A stale block left behind by
//! an earlier run is replaced on install.

use std::fs;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::resolve::{ResolutionError, ResolutionOverride};

const BEGIN_MARKER: &str = "# BEGIN sitemount";
const END_MARKER: &str = "# END sitemount";

#[derive(Debug, Clone)]
pub struct HostsFileOverride {
    path: PathBuf,
    address: IpAddr,
    installed: Vec<String>,
}

impl HostsFileOverride {
    pub fn new(path: impl Into<PathBuf>, address: IpAddr) -> Self {
        Self {
            path: path.into(),
            address,
            installed: Vec::new(),
        }
    }

    fn read(&self) -> Result<String, ResolutionError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(source) => Err(ResolutionError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write(&self, content: &str) -> Result<(), ResolutionError> {
        // Written in place: /etc/hosts is often a bind mount that cannot be
        // replaced by rename.
        fs::write(&self.path, content).map_err(|source| ResolutionError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl ResolutionOverride for HostsFileOverride {
    fn install(&mut self, hostnames: &[String]) -> Result<(), ResolutionError> {
        let current = self.read()?;
        let mut content = strip_block(&current);

        if !hostnames.is_empty() {
            if !content.is_empty() && !content.ends_with('\n') {
                content.push('\n');
            }
            content.push_str(BEGIN_MARKER);
            content.push('\n');
            for host in hostnames {
                content.push_str(&format!("{} {}\n", self.address, host));
            }
            content.push_str(END_MARKER);
            content.push('\n');
        }

        if content != current {
            self.write(&content)?;
        }
        self.installed = hostnames.to_vec();

        tracing::info!(
            path = %self.path.display(),
            address = %self.address,
            hosts = ?hostnames,
            "Hostname resolution override installed"
        );
        Ok(())
    }

    fn remove(&mut self) -> Result<(), ResolutionError> {
        let current = self.read()?;
        let content = strip_block(&current);
        if content != current {
            self.write(&content)?;
            tracing::info!(path = %self.path.display(), "Hostname resolution override removed");
        }
        self.installed.clear();
        Ok(())
    }

    fn hostnames(&self) -> &[String] {
        &self.installed
    }
}

/// `content` without the marked block (markers included).
fn strip_block(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut inside = false;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed == BEGIN_MARKER {
            inside = true;
            continue;
        }
        if inside {
            if trimmed == END_MARKER {
                inside = false;
            }
            continue;
        }
        out.push_str(line);
    }
    out
}
