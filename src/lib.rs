//! Contact form service library.
//!
//! Configuration-driven contact forms: categories of fields merged over
//! built-in defaults, validated per category, protected by one-time CSRF
//! tokens and sliding-window rate limits, and delivered by email.

// Form configuration and validation
pub mod forms;
pub mod routing;

// Delivery
pub mod email;

// Service plumbing
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;

// Cross-cutting concerns
pub mod observability;
pub mod security;

pub use config::schema::ServerConfig;
pub use error::{FormError, FormResult};
pub use forms::{ConfigBuilder, Configuration};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::CategoryRouter;
