//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (Host header, path)
//!     → matcher.rs (normalize host, match mount prefixes)
//!     → router.rs (host lookup, ordered candidate layers)
//!     → Return: candidate layers or unknown host
//!
//! Compilation (at server start):
//!     VhostMap
//!     → drop vanished sources
//!     → order layers (longest mount first, root last)
//!     → Freeze as immutable VhostRouter
//! ```

pub mod matcher;
pub mod router;

pub use router::{Layer, VhostRouter};
