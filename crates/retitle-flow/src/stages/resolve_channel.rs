//! Channel resolution: `submitted` to `channel.resolved` or `channel.error`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::collaborators::VideoPlatform;
use crate::error::{Error, Result};
use crate::events::PipelineEvent;
use crate::record::JobPatch;
use crate::stage::{Stage, StageOutput};
use crate::status::JobStatus;
use crate::topic::Topic;

/// Resolves the submitted handle or name to a platform channel.
pub struct ResolveChannel {
    platform: Arc<dyn VideoPlatform>,
}

impl ResolveChannel {
    /// Creates the stage around a video-platform collaborator.
    #[must_use]
    pub fn new(platform: Arc<dyn VideoPlatform>) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl Stage for ResolveChannel {
    fn name(&self) -> &'static str {
        "resolve_channel"
    }

    fn working_status(&self) -> JobStatus {
        JobStatus::ResolvingChannel
    }

    fn error_topic(&self) -> Option<Topic> {
        Some(Topic::ChannelError)
    }

    async fn execute(&self, payload: &PipelineEvent) -> Result<StageOutput> {
        let PipelineEvent::Submitted {
            job_id,
            channel_query,
            email,
        } = payload
        else {
            return Err(Error::UnexpectedPayload {
                topic: payload.topic(),
            });
        };

        match self.platform.find_channel(channel_query).await? {
            Some(channel) => {
                tracing::info!(channel_id = %channel.channel_id, "channel resolved");
                Ok(StageOutput::new(
                    JobPatch::status(JobStatus::ChannelResolved)
                        .with_channel(channel.channel_id.clone(), channel.channel_name.clone()),
                )
                .with_event(PipelineEvent::ChannelResolved {
                    job_id: *job_id,
                    email: email.clone(),
                    channel_id: channel.channel_id,
                    channel_name: channel.channel_name,
                }))
            }
            None => {
                // A no-match is a modeled terminal outcome, not a stage
                // failure, but the submitter still gets told.
                let error = format!("channel \"{channel_query}\" not found");
                tracing::warn!(channel_query = %channel_query, "channel not found");
                Ok(StageOutput::new(
                    JobPatch::status(JobStatus::ChannelNotFound).with_error(error.clone()),
                )
                .with_event(PipelineEvent::ChannelError {
                    job_id: *job_id,
                    email: email.clone(),
                    error,
                }))
            }
        }
    }
}
