//! Shallow git clones.
//!
//! # Responsibilities
//! - Run `git clone --depth 1 --quiet` into `<base_dir>/<dest_name>`
//! - Turn every failure into a `CloneError` value
//! - Leave no partial checkout behind after a failure
//!
//! # Design Decisions
//! - One attempt per URL, no retries, no timeout
//! - Failures are outcomes, not errors: the caller decides skip-vs-abort

use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;

/// Why a clone did not produce a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CloneError {
    #[error("failed to prepare {path}: {message}")]
    Prepare { path: PathBuf, message: String },

    #[error("failed to run {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("git clone failed: {0}")]
    Git(String),
}

/// The result of cloning one URL.
#[derive(Debug, Clone)]
pub struct CloneOutcome {
    pub source_url: String,
    pub result: Result<PathBuf, CloneError>,
}

impl CloneOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn path(&self) -> Option<&Path> {
        self.result.as_ref().ok().map(PathBuf::as_path)
    }
}

/// Clones repositories into subdirectories of a base directory.
#[derive(Debug, Clone)]
pub struct GitCloner {
    program: PathBuf,
    base_dir: PathBuf,
}

impl GitCloner {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: PathBuf::from("git"),
            base_dir: base_dir.into(),
        }
    }

    /// Use a different git executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Clone `git_url` into `<base_dir>/<dest_name>`. Never panics or
    /// propagates; every failure is reported in the outcome.
    pub async fn clone_repo(&self, git_url: &str, dest_name: &str) -> CloneOutcome {
        let result = self.try_clone(git_url, dest_name).await;
        match &result {
            Ok(path) => tracing::info!(url = %git_url, path = %path.display(), "Repository cloned"),
            Err(e) => tracing::warn!(url = %git_url, error = %e, "Repository clone failed"),
        }
        CloneOutcome {
            source_url: git_url.to_string(),
            result,
        }
    }

    async fn try_clone(&self, git_url: &str, dest_name: &str) -> Result<PathBuf, CloneError> {
        tokio::fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| CloneError::Prepare {
                path: self.base_dir.clone(),
                message: e.to_string(),
            })?;

        let dest = self.base_dir.join(dest_name);
        if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            remove_partial(&dest).await;
        }

        tracing::debug!(url = %git_url, dest = %dest.display(), "Cloning repository");

        let output = Command::new(&self.program)
            .arg("clone")
            .arg("--depth")
            .arg("1")
            .arg("--quiet")
            .arg("--")
            .arg(git_url)
            .arg(&dest)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                remove_partial(&dest).await;
                return Err(CloneError::Spawn {
                    program: self.program.display().to_string(),
                    message: e.to_string(),
                });
            }
        };

        if output.status.success() {
            return Ok(dest);
        }

        remove_partial(&dest).await;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let reason = if !stderr.is_empty() {
            stderr
        } else {
            match output.status.code() {
                Some(code) => format!("exit status {code}"),
                None => "terminated by signal".to_string(),
            }
        };
        Err(CloneError::Git(reason))
    }
}

async fn remove_partial(dest: &Path) {
    match tokio::fs::remove_dir_all(dest).await {
        Ok(()) => tracing::debug!(path = %dest.display(), "Removed partial clone"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %dest.display(), error = %e, "Failed to remove partial clone"),
    }
}
