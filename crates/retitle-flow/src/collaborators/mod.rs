//! External collaborator interfaces and their HTTP clients.
//!
//! Every stage talks to its collaborator through a trait object, so the
//! pipeline can be wired with the real HTTP clients in the binary and with
//! scripted fakes in tests. The traits are the external boundary: nothing
//! else in the crate knows what is behind them.

pub mod gemini;
pub mod resend;
pub mod youtube;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::Video;

pub use gemini::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, GeminiClient};
pub use resend::{DEFAULT_RESEND_BASE_URL, ResendClient};
pub use youtube::{DEFAULT_YOUTUBE_BASE_URL, YouTubeClient};

/// Upper bound on videos fetched per job; also a record invariant.
pub const MAX_RECENT_VIDEOS: usize = 5;

/// A resolved channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    /// Platform channel id.
    pub channel_id: String,
    /// Channel display name.
    pub channel_name: String,
}

/// One improved title as returned by the AI collaborator, before the stage
/// pairs it with its video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedTitle {
    /// The input title, echoed back.
    pub original: String,
    /// The improved replacement.
    pub improved: String,
    /// Why the replacement is better.
    pub rationale: String,
}

/// Video-platform metadata lookup.
#[async_trait]
pub trait VideoPlatform: Send + Sync {
    /// Returns the best-match channel for a handle or name, or `None` when
    /// nothing matches. A no-match is an outcome, not an error.
    async fn find_channel(&self, query: &str) -> Result<Option<ChannelRef>>;

    /// Returns up to [`MAX_RECENT_VIDEOS`] most-recent videos for a channel,
    /// publish-date descending.
    async fn recent_videos(&self, channel_id: &str) -> Result<Vec<Video>>;
}

/// AI text generation for titles.
#[async_trait]
pub trait TitleGenerator: Send + Sync {
    /// Returns one improved title per input, preserving input order and
    /// count. Violations of that contract are caught by the calling stage,
    /// which fails closed rather than mis-pairing titles and videos.
    async fn improve_titles(
        &self,
        channel_name: &str,
        titles: &[String],
    ) -> Result<Vec<GeneratedTitle>>;
}

/// Email delivery. The sender address is configured once, on the
/// implementation.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends an HTML email and returns the delivery id.
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<String>;
}

/// Extracts a human-readable message from an error response body, trying the
/// flat `{"message": ...}` and nested `{"error": {"message": ...}}` shapes
/// before falling back to the raw body.
pub(crate) fn error_body_message(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .or_else(|| value.get("error").and_then(|e| e.get("message")))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| String::from_utf8_lossy(body).to_string())
}

/// Maps a non-success status to a collaborator error. Server-side failures
/// and throttling are retryable; everything else is not worth repeating.
pub(crate) fn status_error(
    service: &'static str,
    operation: &str,
    status: StatusCode,
    body: &[u8],
) -> Error {
    let message = format!("{operation} failed ({status}): {}", error_body_message(body));
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Error::collaborator_retryable(service, message)
    } else {
        Error::collaborator_fatal(service, message)
    }
}

/// Builds the reqwest client shared by a collaborator, with one overall
/// timeout per request.
pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| {
            retitle_core::Error::internal(format!("failed to build HTTP client: {e}")).into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_message_prefers_flat_message() {
        let body = br#"{"message": "bad key"}"#;
        assert_eq!(error_body_message(body), "bad key");
    }

    #[test]
    fn error_body_message_reads_nested_error_shape() {
        let body = br#"{"error": {"message": "quota exceeded", "code": 403}}"#;
        assert_eq!(error_body_message(body), "quota exceeded");
    }

    #[test]
    fn error_body_message_falls_back_to_raw_body() {
        assert_eq!(error_body_message(b"plain text"), "plain text");
    }

    #[test]
    fn throttling_is_retryable_and_client_errors_are_not() {
        let err = status_error("youtube", "search", StatusCode::TOO_MANY_REQUESTS, b"{}");
        assert!(err.is_retryable());

        let err = status_error("youtube", "search", StatusCode::UNAUTHORIZED, b"{}");
        assert!(!err.is_retryable());
    }
}
