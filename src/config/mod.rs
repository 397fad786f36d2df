//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → [forms] table handed to forms::ConfigBuilder as overrides
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
    EmailConfig, EmailProviderKind, ListenerConfig, ObservabilityConfig, RateLimitConfig,
    SecurityConfig, ServerConfig, TimeoutConfig, TlsConfig, WindowConfig,
};
pub use validation::{validate_config, validate_routes, ValidationError};
