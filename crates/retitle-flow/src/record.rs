//! The durable job record and the patches stages merge into it.
//!
//! A `JobRecord` is the sole durable entity of the pipeline: one record per
//! submission, keyed by `JobId`. Stages never replace a record; they merge a
//! `JobPatch` onto it, so fields written by earlier stages survive later
//! ones. Merging is idempotent: re-applying the same patch (an at-least-once
//! redelivery) yields the same record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use retitle_core::JobId;

use crate::status::JobStatus;

/// One video fetched from the platform, publish-date descending order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    /// Platform video id.
    pub video_id: String,
    /// Current title.
    pub title: String,
    /// Watch URL.
    pub url: String,
    /// Publish timestamp.
    pub published_at: DateTime<Utc>,
    /// Default thumbnail URL; empty when the platform offers none.
    #[serde(default)]
    pub thumbnail_url: String,
}

/// An AI-improved title, parallel to the video at the same index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImprovedTitle {
    /// The title as fetched from the platform.
    pub original: String,
    /// The improved replacement.
    pub improved: String,
    /// One or two sentences on why the replacement is better.
    pub rationale: String,
    /// Watch URL, copied from the paired video, never from the AI reply.
    pub url: String,
}

/// The durable record of one title-improvement job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    /// Unique id, assigned at submission. Immutable.
    pub job_id: JobId,
    /// The channel handle or name as submitted. Immutable.
    pub channel_query: String,
    /// Submitter address for the result email. Immutable.
    pub email: String,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Resolved platform channel id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// Resolved channel display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    /// Recent videos, at most five, publish-date descending.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub videos: Vec<Video>,
    /// Improved titles, parallel to `videos`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub improved_titles: Vec<ImprovedTitle>,
    /// Failure description when the job did not complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Delivery id returned by the mailer for the result email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_id: Option<String>,
    /// Submission timestamp.
    pub created_at: DateTime<Utc>,
    /// Set when the result email was delivered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// Creates a fresh record in `queued` status.
    #[must_use]
    pub fn new(job_id: JobId, channel_query: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            job_id,
            channel_query: channel_query.into(),
            email: email.into(),
            status: JobStatus::Queued,
            channel_id: None,
            channel_name: None,
            videos: Vec::new(),
            improved_titles: Vec::new(),
            error: None,
            email_id: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Merges a patch onto this record.
    ///
    /// Fields the patch does not carry are left untouched. A status the
    /// current status cannot transition to is ignored (keeping the stored
    /// one): under at-least-once delivery a late or duplicate patch must not
    /// move the record backwards, and re-applying an already-applied patch
    /// must change nothing.
    pub fn apply(&mut self, patch: &JobPatch) {
        if let Some(status) = patch.status {
            if status == self.status || self.status.can_transition_to(status) {
                self.status = status;
            } else {
                tracing::debug!(
                    job_id = %self.job_id,
                    current = %self.status,
                    requested = %status,
                    "ignoring status change that is not a forward transition"
                );
            }
        }
        if let Some(channel_id) = &patch.channel_id {
            self.channel_id = Some(channel_id.clone());
        }
        if let Some(channel_name) = &patch.channel_name {
            self.channel_name = Some(channel_name.clone());
        }
        if let Some(videos) = &patch.videos {
            self.videos = videos.clone();
        }
        if let Some(improved_titles) = &patch.improved_titles {
            self.improved_titles = improved_titles.clone();
        }
        if let Some(error) = &patch.error {
            self.error = Some(error.clone());
        }
        if let Some(email_id) = &patch.email_id {
            self.email_id = Some(email_id.clone());
        }
        if let Some(completed_at) = patch.completed_at {
            self.completed_at = Some(completed_at);
        }
    }
}

/// A partial record: the fields one stage wants to merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    /// Requested status transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    /// Resolved channel id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// Resolved channel name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    /// Fetched videos.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub videos: Option<Vec<Video>>,
    /// Generated titles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub improved_titles: Option<Vec<ImprovedTitle>>,
    /// Failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Mailer delivery id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_id: Option<String>,
    /// Completion timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobPatch {
    /// Creates a patch that only moves the status.
    #[must_use]
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Sets the resolved channel id and name.
    #[must_use]
    pub fn with_channel(mut self, channel_id: impl Into<String>, name: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self.channel_name = Some(name.into());
        self
    }

    /// Sets the fetched videos.
    #[must_use]
    pub fn with_videos(mut self, videos: Vec<Video>) -> Self {
        self.videos = Some(videos);
        self
    }

    /// Sets the generated titles.
    #[must_use]
    pub fn with_improved_titles(mut self, improved_titles: Vec<ImprovedTitle>) -> Self {
        self.improved_titles = Some(improved_titles);
        self
    }

    /// Sets the failure description.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Sets the mailer delivery id.
    #[must_use]
    pub fn with_email_id(mut self, email_id: impl Into<String>) -> Self {
        self.email_id = Some(email_id.into());
        self
    }

    /// Sets the completion timestamp.
    #[must_use]
    pub const fn with_completed_at(mut self, completed_at: DateTime<Utc>) -> Self {
        self.completed_at = Some(completed_at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_video(n: u32) -> Video {
        Video {
            video_id: format!("vid{n}"),
            title: format!("Title {n}"),
            url: format!("https://www.youtube.com/watch/?v=vid{n}"),
            published_at: Utc::now(),
            thumbnail_url: String::new(),
        }
    }

    #[test]
    fn merge_keeps_untouched_fields() {
        let mut record = JobRecord::new(JobId::generate(), "@somechannel", "a@b.com");
        record.apply(
            &JobPatch::status(JobStatus::ResolvingChannel)
                .with_channel("UC123", "Some Channel"),
        );
        record.apply(&JobPatch::status(JobStatus::ChannelResolved));

        assert_eq!(record.status, JobStatus::ChannelResolved);
        assert_eq!(record.channel_id.as_deref(), Some("UC123"));
        assert_eq!(record.channel_name.as_deref(), Some("Some Channel"));
        assert_eq!(record.channel_query, "@somechannel");
        assert_eq!(record.email, "a@b.com");
    }

    #[test]
    fn merge_is_idempotent() {
        let mut record = JobRecord::new(JobId::generate(), "@somechannel", "a@b.com");
        record.apply(&JobPatch::status(JobStatus::ResolvingChannel));
        let patch = JobPatch::status(JobStatus::ChannelResolved).with_channel("UC123", "Some");

        record.apply(&patch);
        let after_first = record.clone();
        record.apply(&patch);

        assert_eq!(record, after_first);
    }

    #[test]
    fn backward_status_is_ignored() {
        let mut record = JobRecord::new(JobId::generate(), "@c", "a@b.com");
        record.apply(&JobPatch::status(JobStatus::ResolvingChannel));
        record.apply(&JobPatch::status(JobStatus::ChannelResolved));

        // A duplicate delivery of the earlier stage's working-status merge.
        record.apply(&JobPatch::status(JobStatus::ResolvingChannel));
        assert_eq!(record.status, JobStatus::ChannelResolved);
    }

    #[test]
    fn terminal_status_cannot_be_left() {
        let mut record = JobRecord::new(JobId::generate(), "@c", "a@b.com");
        record.apply(&JobPatch::status(JobStatus::Failed).with_error("boom"));

        record.apply(&JobPatch::status(JobStatus::ResolvingChannel));
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("boom"));
    }

    #[test]
    fn videos_patch_replaces_whole_sequence() {
        let mut record = JobRecord::new(JobId::generate(), "@c", "a@b.com");
        record.apply(&JobPatch::default().with_videos(vec![sample_video(1), sample_video(2)]));
        record.apply(&JobPatch::default().with_videos(vec![sample_video(3)]));

        assert_eq!(record.videos.len(), 1);
        assert_eq!(record.videos[0].video_id, "vid3");
    }

    #[test]
    fn record_serializes_camel_case() {
        let record = JobRecord::new(JobId::generate(), "@somechannel", "a@b.com");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["channelQuery"], "@somechannel");
        assert_eq!(json["status"], "queued");
        assert!(json.get("createdAt").is_some());
        // Empty and unset fields stay off the wire.
        assert!(json.get("videos").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn record_roundtrips_through_json() {
        let mut record = JobRecord::new(JobId::generate(), "@c", "a@b.com");
        record.apply(
            &JobPatch::status(JobStatus::ResolvingChannel)
                .with_channel("UC123", "Some Channel"),
        );
        record.apply(
            &JobPatch::status(JobStatus::ChannelResolved)
                .with_videos(vec![sample_video(1)]),
        );

        let json = serde_json::to_string(&record).unwrap();
        let parsed: JobRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}
