//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → EdgeConfig (validated, immutable)
//!     → read once by EdgeService while wiring routes
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    EdgeConfig, EsiConfig, ListenerConfig, LocationConfig, LogFormat, ObservabilityConfig,
    RewriteRuleConfig, SecretSource, SecretsConfig, ServiceConfig, SkywardsConfig, TimeoutConfig,
    WeatherConfig,
};
pub use validation::{validate_config, ValidationError};
