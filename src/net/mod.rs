//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ServerConfig.bind_address
//!     → listener.rs (parse, bind, report local address)
//!     → Hand off to the HTTP layer's accept loop
//! ```
//!
//! # Design Decisions
//! - One listener for all virtual hosts; dispatch happens on the Host header
//! - No TLS: the crawler is pointed at plain-HTTP seed URLs

pub mod listener;
