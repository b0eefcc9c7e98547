//! Video fetching: `channel.resolved` to `videos.fetched` or `videos.error`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::collaborators::{VideoPlatform, MAX_RECENT_VIDEOS};
use crate::error::{Error, Result};
use crate::events::PipelineEvent;
use crate::record::JobPatch;
use crate::stage::{Stage, StageOutput};
use crate::status::JobStatus;
use crate::topic::Topic;

/// Fetches the channel's most recent uploads.
pub struct FetchVideos {
    platform: Arc<dyn VideoPlatform>,
}

impl FetchVideos {
    /// Creates the stage around a video-platform collaborator.
    #[must_use]
    pub fn new(platform: Arc<dyn VideoPlatform>) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl Stage for FetchVideos {
    fn name(&self) -> &'static str {
        "fetch_videos"
    }

    fn working_status(&self) -> JobStatus {
        JobStatus::FetchingVideos
    }

    fn error_topic(&self) -> Option<Topic> {
        Some(Topic::VideosError)
    }

    async fn execute(&self, payload: &PipelineEvent) -> Result<StageOutput> {
        let PipelineEvent::ChannelResolved {
            job_id,
            email,
            channel_id,
            channel_name,
        } = payload
        else {
            return Err(Error::UnexpectedPayload {
                topic: payload.topic(),
            });
        };

        let mut videos = self.platform.recent_videos(channel_id).await?;
        if videos.is_empty() {
            // An empty channel cannot go further; not worth retrying either.
            return Err(Error::collaborator_fatal(
                "youtube",
                format!("no videos found for channel {channel_id}"),
            ));
        }
        videos.truncate(MAX_RECENT_VIDEOS);
        tracing::info!(count = videos.len(), "videos fetched");

        Ok(StageOutput::new(
            JobPatch::status(JobStatus::VideosFetched).with_videos(videos.clone()),
        )
        .with_event(PipelineEvent::VideosFetched {
            job_id: *job_id,
            email: email.clone(),
            channel_name: channel_name.clone(),
            videos,
        }))
    }
}
