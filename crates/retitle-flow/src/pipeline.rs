//! Pipeline assembly and the submission boundary.
//!
//! [`Pipeline::new`] wires the four stages and the failure notifier onto the
//! bus. [`Pipeline::submit`] is the synchronous entry point: validate, create
//! the record, then publish `submitted`, in that order, so the record always
//! exists before the first event referencing it.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use retitle_core::JobId;

use crate::bus::EventBus;
use crate::collaborators::{Mailer, TitleGenerator, VideoPlatform};
use crate::error::Result;
use crate::events::{Event, PipelineEvent};
use crate::metrics::record_job_submitted;
use crate::notifier::FailureNotifier;
use crate::record::JobRecord;
use crate::retry::RetryPolicy;
use crate::stage::{Stage, StageRunner};
use crate::stages::{FetchVideos, GenerateTitles, ResolveChannel, SendEmail};
use crate::store::JobStore;
use crate::topic::Topic;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// The external collaborators the stages run against.
#[derive(Clone)]
pub struct Collaborators {
    /// Video-platform metadata lookup.
    pub platform: Arc<dyn VideoPlatform>,
    /// AI title generation.
    pub generator: Arc<dyn TitleGenerator>,
    /// Email delivery, shared by the final stage and the failure notifier.
    pub mailer: Arc<dyn Mailer>,
}

/// The assembled pipeline. Clones share the same store and bus.
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn JobStore>,
    bus: Arc<dyn EventBus>,
}

impl Pipeline {
    /// Wires every stage and the failure notifier onto the bus.
    ///
    /// One retry policy governs all collaborator calls; pass
    /// [`RetryPolicy::no_retries`] to disable backoff entirely.
    pub fn new(
        store: Arc<dyn JobStore>,
        bus: Arc<dyn EventBus>,
        collaborators: Collaborators,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let subscriptions: [(Topic, Arc<dyn Stage>); 4] = [
            (
                Topic::Submitted,
                Arc::new(ResolveChannel::new(collaborators.platform.clone())),
            ),
            (
                Topic::ChannelResolved,
                Arc::new(FetchVideos::new(collaborators.platform.clone())),
            ),
            (
                Topic::VideosFetched,
                Arc::new(GenerateTitles::new(collaborators.generator.clone())),
            ),
            (
                Topic::TitlesReady,
                Arc::new(SendEmail::new(collaborators.mailer.clone())),
            ),
        ];
        for (topic, stage) in subscriptions {
            let runner = Arc::new(StageRunner::new(stage, store.clone(), bus.clone(), retry));
            bus.subscribe(topic, runner)?;
        }

        let notifier = Arc::new(FailureNotifier::new(
            collaborators.mailer,
            bus.clone(),
            retry,
        ));
        for topic in Topic::error_topics() {
            bus.subscribe(topic, notifier.clone())?;
        }

        Ok(Self { store, bus })
    }

    /// Accepts a submission: validates inputs, creates the `queued` record,
    /// and publishes `submitted`.
    ///
    /// # Errors
    ///
    /// Returns [`retitle_core::Error::InvalidInput`] (wrapped) when the
    /// channel or email is missing or the email is not a plausible address;
    /// nothing is created in that case.
    pub async fn submit(&self, channel: &str, email: &str) -> Result<JobId> {
        let channel = channel.trim();
        let email = email.trim();
        if channel.is_empty() || email.is_empty() {
            return Err(retitle_core::Error::InvalidInput(
                "channel and email are required".to_string(),
            )
            .into());
        }
        if !EMAIL_RE.is_match(email) {
            return Err(
                retitle_core::Error::InvalidInput("invalid email format".to_string()).into(),
            );
        }

        let record = JobRecord::new(JobId::generate(), channel, email);
        let job_id = record.job_id;
        self.store.create(record).await?;
        record_job_submitted();
        tracing::info!(%job_id, channel = %channel, "job accepted");

        let event = Event::new(PipelineEvent::Submitted {
            job_id,
            channel_query: channel.to_string(),
            email: email.to_string(),
        });
        self.bus.publish(event).await?;
        Ok(job_id)
    }

    /// Reads a job record.
    pub async fn job(&self, job_id: &JobId) -> Result<Option<JobRecord>> {
        self.store.get(job_id).await
    }
}
