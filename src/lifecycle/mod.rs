//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Session::prepare (session.rs):
//!     work dir → clone repositories → build vhosts → start server
//!     → install resolution override → translate config
//!
//! Hand-off:
//!     serve until a signal (signals.rs), or run the crawler to completion
//!
//! Session::teardown (session.rs):
//!     stop server (shutdown.rs broadcast) → remove override → delete clones
//! ```
//!
//! # Design Decisions
//! - Fail fast only before side effects (validation) and at server start
//! - Teardown runs on every exit path and never fails

pub mod session;
pub mod shutdown;
pub mod signals;

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::crawler::CrawlerError;
use crate::http::ServerStartError;
use crate::resolve::ResolutionError;

pub use session::{RepositoryClones, Session};
pub use shutdown::Shutdown;

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to prepare work directory {path}: {source}")]
    WorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start virtual host server: {0}")]
    ServerStart(#[from] ServerStartError),

    #[error("failed to install hostname resolution override: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("failed to write crawler config {path}: {source}")]
    WriteConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Crawler(#[from] CrawlerError),
}
