//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → circuits registered with the manager at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a circuit's settings never change after creation
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{AdminConfig, CircuitConfig, CircuitDefaults, ObservabilityConfig, ServiceConfig};
