//! # retitle-flow
//!
//! Event-driven pipeline turning a YouTube channel submission into an
//! improved-titles email.
//!
//! This crate implements the orchestration domain, providing:
//!
//! - **Job Store**: One durable record per job, updated only through
//!   idempotent merges
//! - **Event Bus**: Topic-addressed, at-least-once, in-process delivery
//! - **Stages**: Channel resolution, video fetching, title generation, and
//!   email delivery, each triggered by the previous stage's emission
//! - **Failure Notifier**: A single subscriber on every error topic that
//!   emails the submitter
//!
//! ## Topology
//!
//! ```text
//! submitted -> channel.resolved -> videos.fetched -> titles.ready -> email.sent
//!   (resolve)      (fetch)           (generate)         (send)
//!
//! channel.error / videos.error / titles.error -> error.notified
//! ```
//!
//! ## Guarantees
//!
//! - **Record first**: a job record exists before any event referencing it,
//!   and every stage merges its result before publishing its follow-on event
//! - **Redelivery-safe**: duplicate deliveries are absorbed by idempotent
//!   merges and the terminal-status guard
//! - **No stuck jobs**: every failure converts into a terminal record plus a
//!   notification (or, for the final stage, a log line)
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use retitle_flow::bus::InMemoryEventBus;
//! use retitle_flow::collaborators::gemini::{GeminiClient, DEFAULT_GEMINI_BASE_URL};
//! use retitle_flow::collaborators::resend::{ResendClient, DEFAULT_RESEND_BASE_URL};
//! use retitle_flow::collaborators::youtube::{YouTubeClient, DEFAULT_YOUTUBE_BASE_URL};
//! use retitle_flow::pipeline::{Collaborators, Pipeline};
//! use retitle_flow::retry::RetryPolicy;
//! use retitle_flow::store::InMemoryJobStore;
//!
//! # #[tokio::main]
//! # async fn main() -> retitle_flow::error::Result<()> {
//! let store = Arc::new(InMemoryJobStore::new());
//! let bus = Arc::new(InMemoryEventBus::new());
//! let collaborators = Collaborators {
//!     platform: Arc::new(YouTubeClient::new(DEFAULT_YOUTUBE_BASE_URL, "yt-key")?),
//!     generator: Arc::new(GeminiClient::new(DEFAULT_GEMINI_BASE_URL, "gemini-key")?),
//!     mailer: Arc::new(ResendClient::new(
//!         DEFAULT_RESEND_BASE_URL,
//!         "resend-key",
//!         "titles@example.com",
//!     )?),
//! };
//! let pipeline = Pipeline::new(store, bus.clone(), collaborators, RetryPolicy::default())?;
//!
//! let job_id = pipeline.submit("@veritasium", "viewer@example.com").await?;
//! bus.wait_idle().await;
//! let _record = pipeline.job(&job_id).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod bus;
pub mod collaborators;
pub mod error;
pub mod events;
pub mod metrics;
pub mod notifier;
pub mod pipeline;
pub mod record;
pub mod render;
pub mod retry;
pub mod stage;
pub mod stages;
pub mod status;
pub mod store;
pub mod topic;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bus::{EventBus, EventHandler, InMemoryEventBus};
    pub use crate::collaborators::{
        ChannelRef, GeminiClient, GeneratedTitle, Mailer, ResendClient, TitleGenerator,
        VideoPlatform, YouTubeClient,
    };
    pub use crate::error::{Error, Result};
    pub use crate::events::{Event, PipelineEvent};
    pub use crate::notifier::FailureNotifier;
    pub use crate::pipeline::{Collaborators, Pipeline};
    pub use crate::record::{ImprovedTitle, JobPatch, JobRecord, Video};
    pub use crate::retry::RetryPolicy;
    pub use crate::stage::{Stage, StageOutput, StageRunner};
    pub use crate::stages::{FetchVideos, GenerateTitles, ResolveChannel, SendEmail};
    pub use crate::status::JobStatus;
    pub use crate::store::{FsJobStore, InMemoryJobStore, JobStore};
    pub use crate::topic::Topic;
}
