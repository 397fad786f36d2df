//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming submission:
//!     → rate_limit.rs (generic per-IP windows, then IP + email form window)
//!     → csrf.rs (one-time token check)
//!     → recaptcha.rs (score check inside the submission handler)
//!     → Pass to category router
//!
//! store.rs backs both rate_limit.rs and csrf.rs
//! ```
//!
//! # Design Decisions
//! - Fail closed: a missing or invalid token rejects the request
//! - Best effort, in-memory, single process; not a distributed trust boundary
//! - Stores sit behind a trait so an external store can replace them

pub mod csrf;
pub mod rate_limit;
pub mod recaptcha;
pub mod store;

pub use csrf::{CsrfManager, CsrfToken};
pub use rate_limit::{RateLimitDecision, RateLimitRule, RateLimiter};
pub use recaptcha::{GoogleRecaptcha, RecaptchaVerifier};
pub use store::{Expiring, ExpiringStore, MemoryStore};
