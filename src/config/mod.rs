//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML/YAML/JSON)
//!     → loader.rs (read & decode into an untyped document)
//!     → validation.rs (shape, cross-field and cross-section checks)
//!         → coerce.rs (URL and git URL coercion)
//!         → mount.rs (compact mount strings)
//!     → ValidatedConfig (typed, immutable)
//!     → translate.rs (crawler-facing domains/seed URLs)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once validated
//! - Every violation is reported, with its field path
//! - Unknown keys are kept and handed to the crawler untouched

pub mod coerce;
pub mod loader;
pub mod mount;
pub mod schema;
pub mod translate;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use mount::{resolve_mount, MountError};
pub use schema::{
    ConfigEntry, DirectoryEntry, DomainEntry, GitUrl, MountSpec, RepositoryEntry, RuntimeSettings,
    ServerConfig, ValidatedConfig,
};
pub use translate::{to_crawler_config, PublicEndpoint};
pub use validation::{validate, ValidationError, ValidationErrors};
