//! External crawler hand-off.
//!
//! The crawler is an opaque executable. It is started as
//! `<program> --config <path> [extra args...]` with inherited stdio, and its
//! exit status is returned untouched.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("no crawler program configured")]
    NotConfigured,

    #[error("failed to start crawler {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for crawler {program}: {source}")]
    Wait {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Run the crawler against `config_path` and wait for it to exit.
pub async fn run_crawler(
    program: &Path,
    config_path: &Path,
    extra_args: &[String],
) -> Result<ExitStatus, CrawlerError> {
    tracing::info!(
        program = %program.display(),
        config = %config_path.display(),
        args = ?extra_args,
        "Starting crawler"
    );

    let mut child = Command::new(program)
        .arg("--config")
        .arg(config_path)
        .args(extra_args)
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| CrawlerError::Spawn {
            program: program.to_path_buf(),
            source,
        })?;

    let status = child.wait().await.map_err(|source| CrawlerError::Wait {
        program: program.to_path_buf(),
        source,
    })?;

    if status.success() {
        tracing::info!("Crawler finished");
    } else {
        tracing::warn!(status = %status, "Crawler exited with failure");
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let err = run_crawler(
            Path::new("/nonexistent/sitemount-crawler"),
            Path::new("/tmp/config.json"),
            &[],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CrawlerError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn passes_config_and_args() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("crawler.sh");
        let record = dir.path().join("args.txt");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho \"$@\" > {}\nexit 3\n", record.display()),
        )
        .unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let args = ["--fast".to_string()];
        let mut attempts = 0;
        let status = loop {
            // A freshly written script can briefly be ETXTBSY while other
            // test threads fork.
            match run_crawler(&script, Path::new("/work/crawler-config.json"), &args).await {
                Err(CrawlerError::Spawn { source, .. })
                    if source.raw_os_error() == Some(26) && attempts < 10 =>
                {
                    attempts += 1;
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                }
                other => break other.unwrap(),
            }
        };

        assert_eq!(status.code(), Some(3));
        let args = std::fs::read_to_string(&record).unwrap();
        assert_eq!(args.trim(), "--config /work/crawler-config.json --fast");
    }
}
