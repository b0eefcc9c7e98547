//! Event envelope and per-topic payloads.
//!
//! Every message on the bus is an [`Event`]: a small envelope (id, timestamp,
//! idempotency key) around one [`PipelineEvent`] payload. There is exactly
//! one payload variant per topic, with a fixed field set; handlers match on
//! the variant, never on ad-hoc field presence. Each payload is a deliberate
//! projection carrying what the next stage needs (job id, email, newly
//! produced data), not the whole record, so stages stay decoupled from each
//! other's internal shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use retitle_core::{EventId, JobId};

use crate::record::{ImprovedTitle, Video};
use crate::topic::Topic;

/// One payload per topic. The serde tag is the topic's wire name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", rename_all_fields = "camelCase")]
pub enum PipelineEvent {
    /// A job was accepted at the submission boundary.
    #[serde(rename = "submitted")]
    Submitted {
        /// Job id.
        job_id: JobId,
        /// The channel handle or name as submitted.
        channel_query: String,
        /// Submitter address.
        email: String,
    },

    /// Channel resolution succeeded.
    #[serde(rename = "channel.resolved")]
    ChannelResolved {
        /// Job id.
        job_id: JobId,
        /// Submitter address.
        email: String,
        /// Resolved platform channel id.
        channel_id: String,
        /// Resolved channel display name.
        channel_name: String,
    },

    /// Channel resolution failed or matched nothing.
    #[serde(rename = "channel.error")]
    ChannelError {
        /// Job id.
        job_id: JobId,
        /// Submitter address.
        email: String,
        /// Failure description.
        error: String,
    },

    /// Recent videos were fetched.
    #[serde(rename = "videos.fetched")]
    VideosFetched {
        /// Job id.
        job_id: JobId,
        /// Submitter address.
        email: String,
        /// Resolved channel display name, passed through for later stages.
        channel_name: String,
        /// The fetched videos, publish-date descending.
        videos: Vec<Video>,
    },

    /// Video fetching failed.
    #[serde(rename = "videos.error")]
    VideosError {
        /// Job id.
        job_id: JobId,
        /// Submitter address.
        email: String,
        /// Failure description.
        error: String,
    },

    /// Improved titles are ready.
    #[serde(rename = "titles.ready")]
    TitlesReady {
        /// Job id.
        job_id: JobId,
        /// Submitter address.
        email: String,
        /// Resolved channel display name.
        channel_name: String,
        /// The improved titles, parallel to the fetched videos.
        improved_titles: Vec<ImprovedTitle>,
    },

    /// Title generation failed.
    #[serde(rename = "titles.error")]
    TitlesError {
        /// Job id.
        job_id: JobId,
        /// Submitter address.
        email: String,
        /// Failure description.
        error: String,
    },

    /// The result email was delivered.
    #[serde(rename = "email.sent")]
    EmailSent {
        /// Job id.
        job_id: JobId,
        /// Submitter address.
        email: String,
        /// Mailer delivery id.
        email_id: String,
    },

    /// The failure notification was delivered.
    #[serde(rename = "error.notified")]
    ErrorNotified {
        /// Job id.
        job_id: JobId,
        /// Submitter address.
        email: String,
        /// Mailer delivery id of the notification.
        email_id: String,
    },
}

impl PipelineEvent {
    /// Returns the topic this payload belongs to.
    #[must_use]
    pub const fn topic(&self) -> Topic {
        match self {
            Self::Submitted { .. } => Topic::Submitted,
            Self::ChannelResolved { .. } => Topic::ChannelResolved,
            Self::ChannelError { .. } => Topic::ChannelError,
            Self::VideosFetched { .. } => Topic::VideosFetched,
            Self::VideosError { .. } => Topic::VideosError,
            Self::TitlesReady { .. } => Topic::TitlesReady,
            Self::TitlesError { .. } => Topic::TitlesError,
            Self::EmailSent { .. } => Topic::EmailSent,
            Self::ErrorNotified { .. } => Topic::ErrorNotified,
        }
    }

    /// Returns the job id carried by every payload.
    #[must_use]
    pub const fn job_id(&self) -> JobId {
        match self {
            Self::Submitted { job_id, .. }
            | Self::ChannelResolved { job_id, .. }
            | Self::ChannelError { job_id, .. }
            | Self::VideosFetched { job_id, .. }
            | Self::VideosError { job_id, .. }
            | Self::TitlesReady { job_id, .. }
            | Self::TitlesError { job_id, .. }
            | Self::EmailSent { job_id, .. }
            | Self::ErrorNotified { job_id, .. } => *job_id,
        }
    }

    /// Returns the submitter address carried by every payload.
    #[must_use]
    pub fn email(&self) -> &str {
        match self {
            Self::Submitted { email, .. }
            | Self::ChannelResolved { email, .. }
            | Self::ChannelError { email, .. }
            | Self::VideosFetched { email, .. }
            | Self::VideosError { email, .. }
            | Self::TitlesReady { email, .. }
            | Self::TitlesError { email, .. }
            | Self::EmailSent { email, .. }
            | Self::ErrorNotified { email, .. } => email,
        }
    }

    /// Builds the `{jobId, email, error}` payload for an error topic.
    ///
    /// Returns `None` for topics that are not error topics; the caller
    /// (stage runner) treats that as "this stage swallows its failures".
    #[must_use]
    pub fn failure(topic: Topic, job_id: JobId, email: &str, error: &str) -> Option<Self> {
        let email = email.to_string();
        let error = error.to_string();
        match topic {
            Topic::ChannelError => Some(Self::ChannelError {
                job_id,
                email,
                error,
            }),
            Topic::VideosError => Some(Self::VideosError {
                job_id,
                email,
                error,
            }),
            Topic::TitlesError => Some(Self::TitlesError {
                job_id,
                email,
                error,
            }),
            _ => None,
        }
    }
}

/// The envelope published on the bus.
///
/// Redelivering the same envelope (at-least-once) carries the same `id` and
/// `idempotency_key`; a fresh publication of the same logical step carries a
/// fresh `id` but the same deterministic key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Unique id of this publication.
    pub id: EventId,
    /// Publication timestamp.
    pub occurred_at: DateTime<Utc>,
    /// Deterministic `{jobId}:{topic}` key identifying the logical step.
    pub idempotency_key: String,
    /// The per-topic payload.
    #[serde(flatten)]
    pub payload: PipelineEvent,
}

impl Event {
    /// Wraps a payload in a fresh envelope.
    #[must_use]
    pub fn new(payload: PipelineEvent) -> Self {
        let idempotency_key = format!("{}:{}", payload.job_id(), payload.topic());
        Self {
            id: EventId::generate(),
            occurred_at: Utc::now(),
            idempotency_key,
            payload,
        }
    }

    /// Returns the topic of the wrapped payload.
    #[must_use]
    pub const fn topic(&self) -> Topic {
        self.payload.topic()
    }
}
