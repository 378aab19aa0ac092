//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → WardenConfig (validated, immutable)
//!     → startup builds registry, prototypes and providers from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; rule sets are the dynamic part and
//!   arrive through providers instead
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, FileProviderConfig, LogFormat, MechanismsConfig, ObservabilityConfig,
    PrototypeConfig, RulesConfig, ServeConfig, ServeMode, SignerConfig, WardenConfig,
};
