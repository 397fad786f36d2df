//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request for /contact/{category}
//!     → matcher.rs (slug → Found / Redirect / NotFound)
//!     → router.rs (token check, parse, validate, submit)
//!         → parser.rs (FormDataParser)
//!         → handler.rs (SubmissionHandler, ErrorHandler)
//!     → RouterOutcome (rendered by the http layer)
//! ```
//!
//! # Design Decisions
//! - Category table is built at startup and immutable at runtime
//! - Deterministic: same slug always resolves the same way
//! - Side effects live behind injected traits

pub mod handler;
pub mod matcher;
pub mod parser;
pub mod router;

pub use handler::{
    ErrorHandler, ErrorPayload, Submission, SubmissionHandler, SubmissionReceipt, UploadedFile,
};
pub use matcher::CategoryMatch;
pub use parser::{FormDataParser, RequiredFieldsParser, SchemaParser};
pub use router::{CategoryRouter, RouterOutcome, SubmissionStage};
