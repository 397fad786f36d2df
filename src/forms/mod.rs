//! Contact-form configuration and validation core.
//!
//! # Data Flow
//! ```text
//! defaults.rs (built-in tables)
//!     + user overrides (TOML / JSON / code)
//!     → merge.rs (deep merge, unsafe keys dropped)
//!     → builder.rs (typed FormsConfig, warnings)
//!     → schema.rs (per-field, per-category, complete schemas)
//!     → Configuration (immutable, shared via Arc)
//! ```
//!
//! # Design Decisions
//! - Field types are a closed enum; schema selection is an exhaustive match
//! - Configuration problems are warnings, never boot failures
//! - Nothing here blocks or allocates shared state

pub mod builder;
pub mod defaults;
pub mod field;
pub mod merge;
pub mod schema;

pub use builder::{BuildError, ConfigBuilder, ConfigWarning, Configuration, PublicConfig};
pub use defaults::{ErrorMessages, FileSettings, FormsConfig, RecaptchaSettings, ATTACHMENTS_FIELD};
pub use field::{normalize_slug, CategoryConfig, FieldConfig, FieldType, SelectOption};
pub use merge::merge;
pub use schema::{FieldErrors, FieldSchema, FormData, ObjectSchema, ValidationSchemaSet};
