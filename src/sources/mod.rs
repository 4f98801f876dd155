//! Source materialization.
//!
//! # Data Flow
//! ```text
//! RepositoryEntry.git_urls
//!     → git.rs (one shallow clone per URL, into the run's work dir)
//!     → CloneOutcome (path or captured error)
//!     → session decides what gets served
//! ```
//!
//! Directory entries need no materialization; their mounts are used in place.

pub mod git;

pub use git::{CloneError, CloneOutcome, GitCloner};
