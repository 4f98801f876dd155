//! Serve local directories and cloned git repositories as virtual websites,
//! so an unmodified crawler can fetch them over plain HTTP.

pub mod config;
pub mod crawler;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resolve;
pub mod routing;
pub mod sources;

pub use config::{load_config, RuntimeSettings, ValidatedConfig};
pub use http::VirtualHostServer;
pub use lifecycle::{RunError, Session, Shutdown};
