//! The event-driven pipeline steps.
//!
//! Submission is the HTTP boundary and lives on [`crate::pipeline::Pipeline`];
//! everything after it is one of these four stages, each triggered by the
//! previous stage's emission.

pub mod fetch_videos;
pub mod generate_titles;
pub mod resolve_channel;
pub mod send_email;

pub use fetch_videos::FetchVideos;
pub use generate_titles::GenerateTitles;
pub use resolve_channel::ResolveChannel;
pub use send_email::SendEmail;
