//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! register/mount calls
//!     → vhost.rs (per-host root + ordered mounts, validated sources)
//!     → server.rs start: compile into routing::VhostRouter, bind, spawn accept loop
//!
//! Request
//!     → server.rs (Host header → candidate layers)
//!     → directory: listing.rs (HTML index)
//!     → file: tower_http ServeDir
//! ```

pub mod listing;
pub mod server;
pub mod vhost;

pub use server::{ServerStartError, VirtualHostServer};
pub use vhost::{Mount, VhostConfig, VhostMap};
