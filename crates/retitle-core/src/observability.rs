//! Observability infrastructure for retitle.
//!
//! Structured logging with consistent spans. This module provides
//! initialization helpers and span constructors so every component logs the
//! same shape: a stage span always carries the job id, an API span always
//! carries the request id.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `retitle_flow=debug`)
///
/// # Example
///
/// ```rust
/// use retitle_core::observability::{init_logging, LogFormat};
///
/// init_logging(LogFormat::Pretty);
/// ```
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for pipeline stage operations with standard fields.
///
/// # Example
///
/// ```rust
/// use retitle_core::observability::stage_span;
///
/// let span = stage_span("resolve_channel", "01J9ZX2F4E8Q4W9T1V0C6A7B5D");
/// let _guard = span.enter();
/// // ... run the stage
/// ```
#[must_use]
pub fn stage_span(stage: &str, job_id: &str) -> Span {
    tracing::info_span!("stage", stage = stage, job_id = job_id)
}

/// Creates a span for API request handling.
///
/// # Example
///
/// ```rust
/// use retitle_core::observability::api_span;
///
/// let span = api_span("submit_job", "req-123");
/// let _guard = span.enter();
/// // ... handle the request
/// ```
#[must_use]
pub fn api_span(operation: &str, request_id: &str) -> Span {
    tracing::info_span!("api", op = operation, request_id = request_id)
}
