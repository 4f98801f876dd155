//! Structured logging.
//!
//! # Responsibilities
//! - Install the global `tracing` subscriber once, at process start
//! - Pick the level from `RUST_LOG`, falling back to the `-v` count
//!
//! # Design Decisions
//! - Human-readable `fmt` output on stderr; stdout is left for command output
//! - `RUST_LOG` always wins over `-v`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default directives for a given `-v` count.
pub fn default_directives(verbose: u8) -> &'static str {
    match verbose {
        0 => "sitemount=info,tower_http=info",
        1 => "sitemount=debug,tower_http=debug",
        _ => "debug",
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directives(verbose).into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
