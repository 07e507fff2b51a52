//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + DOCDB_MASTER_KEY
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → shared via Arc by the client and request handler
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the client is built
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::ClientConfig;
pub use schema::ConnectionPolicy;
pub use schema::CredentialsConfig;
pub use schema::ObservabilityConfig;
pub use schema::RetryOptions;
