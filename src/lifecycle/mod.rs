//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build forms → Initialize subsystems → Start listener
//!
//! Background (sweeper.rs):
//!     Interval tick → sweep CSRF tokens and rate-limit records
//!
//! Shutdown (signals.rs → shutdown.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!         → listener stops accepting, drains in-flight submissions
//!         → sweeper exits its interval loop
//! ```
//!
//! # Design Decisions
//! - Ordered startup: forms config first, then email and reCAPTCHA, then listener
//! - Fail fast: bad form overrides or colliding routes abort startup
//! - In-memory stores die with the process; nothing is flushed on exit

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod sweeper;

pub use shutdown::Shutdown;
pub use startup::{build_application, Application, StartupError};
