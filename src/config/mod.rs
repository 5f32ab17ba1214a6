//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GovernorConfig (validated, immutable)
//!     → PolicyTable / IdentityResolver built once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; limits never change while running
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    GovernorConfig, IdentityConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    PoliciesConfig, PolicyConfig, StaticTokenConfig, StoreConfig,
};
pub use validation::{validate_config, ValidationError};
