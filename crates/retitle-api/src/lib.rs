//! # retitle-api
//!
//! HTTP composition layer for the retitle pipeline.
//!
//! This crate provides the API surface for the title-improvement service,
//! handling:
//!
//! - **Routing**: Job submission and status endpoints
//! - **Service Wiring**: Store, collaborator, and pipeline assembly from
//!   configuration
//! - **Observability**: Metrics, tracing, and health checks
//!
//! ## Design Principles
//!
//! This crate is a **thin composition layer** with no domain policy.
//! All pipeline logic lives in `retitle-flow`.
//!
//! ## Endpoints
//!
//! ```text
//! POST /api/v1/jobs           - Submit a title-improvement job
//! GET  /api/v1/jobs/{job_id}  - Get a job record by id
//! GET  /health                - Health check
//! GET  /ready                 - Readiness check
//! GET  /metrics               - Prometheus metrics
//! GET  /openapi.json          - OpenAPI spec
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use retitle_api::config::Config;
//! use retitle_api::server::Server;
//!
//! let config = Config::from_env()?;
//! config.validate()?;
//! Server::new(config).serve().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod openapi;
pub mod routes;
pub mod server;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::context::RequestContext;
    pub use crate::error::{ApiError, ApiResult};
    pub use crate::server::Server;
}
