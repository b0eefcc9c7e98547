//! # retitle-core
//!
//! Core abstractions shared by every retitle component.
//!
//! The retitle service turns a submitted channel handle and email address into
//! an email of AI-improved video titles. This crate provides the foundations
//! the pipeline and API crates build on:
//!
//! - **Identifiers**: strongly-typed ULID ids for jobs and bus events
//! - **Error Types**: shared error definitions and result alias
//! - **Observability**: logging initialization and span constructors
//!
//! ## Example
//!
//! ```rust
//! use retitle_core::prelude::*;
//!
//! let job_id = JobId::generate();
//! assert_eq!(job_id, job_id.to_string().parse().unwrap());
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod id;
pub mod observability;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use retitle_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::id::{EventId, JobId};
    pub use crate::observability::{init_logging, LogFormat};
}

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use id::{EventId, JobId};
pub use observability::{init_logging, LogFormat};
