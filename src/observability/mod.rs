//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems emit tracing events with key/value fields
//!     → logging.rs (EnvFilter + fmt layer on stderr)
//!
//! HTTP requests additionally carry:
//!     → x-request-id (tower_http request-id layers)
//!     → request/response spans (tower_http TraceLayer)
//! ```

pub mod logging;
