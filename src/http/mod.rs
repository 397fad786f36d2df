//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware, handlers)
//!     → request.rs (request ID, client address)
//!     → extract.rs (JSON / multipart / urlencoded body → RawSubmission)
//!     → [rate limiter, category router]
//!     → response.rs (JSON bodies, redirects, Retry-After)
//!     → Send to client
//! ```

pub mod extract;
pub mod request;
pub mod response;
pub mod server;
pub mod tls;

pub use request::{ClientIp, TrustProxyHeaders, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
