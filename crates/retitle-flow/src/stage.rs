//! Stage execution scaffolding.
//!
//! A [`Stage`] translates one trigger payload into a [`StageOutput`]; the
//! [`StageRunner`] wraps it with everything the handler contract demands:
//! record lookup, the working-status merge, bounded retries around the
//! collaborator call, conversion of failures into a `failed` record plus an
//! error-topic event, and the commit order. Commit always merges the record
//! before publishing follow-on events, so a consumer of an event can rely on
//! the record already reflecting the step that produced it.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::Instrument;

use retitle_core::observability::stage_span;
use retitle_core::JobId;

use crate::bus::{EventBus, EventHandler};
use crate::error::{Error, Result};
use crate::events::{Event, PipelineEvent};
use crate::metrics::{record_job_terminal, record_stage};
use crate::record::JobPatch;
use crate::retry::{run_with_retry, RetryPolicy};
use crate::status::JobStatus;
use crate::store::JobStore;
use crate::topic::Topic;

/// What a stage wants committed: a record patch plus follow-on events,
/// applied in that order.
#[derive(Debug)]
pub struct StageOutput {
    /// Fields to merge into the job record.
    pub patch: JobPatch,
    /// Events to publish once the merge has landed.
    pub events: Vec<PipelineEvent>,
}

impl StageOutput {
    /// Output that only patches the record.
    #[must_use]
    pub fn new(patch: JobPatch) -> Self {
        Self {
            patch,
            events: Vec::new(),
        }
    }

    /// Adds a follow-on event.
    #[must_use]
    pub fn with_event(mut self, payload: PipelineEvent) -> Self {
        self.events.push(payload);
        self
    }
}

/// One pipeline step.
///
/// Implementations hold their collaborator and express only the happy-path
/// translation plus stage-specific outcomes (a no-match channel, an empty
/// video list). Failure conversion and bookkeeping live in [`StageRunner`].
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stable name used in logs and metric labels.
    fn name(&self) -> &'static str;

    /// Status merged into the record before the collaborator call.
    fn working_status(&self) -> JobStatus;

    /// Topic for converted failures, or `None` when this stage swallows them
    /// (the final email stage has nobody downstream to tell).
    fn error_topic(&self) -> Option<Topic>;

    /// Runs the stage against its trigger payload.
    async fn execute(&self, payload: &PipelineEvent) -> Result<StageOutput>;
}

/// Bridges one [`Stage`] onto the bus.
pub struct StageRunner {
    stage: Arc<dyn Stage>,
    store: Arc<dyn JobStore>,
    bus: Arc<dyn EventBus>,
    retry: RetryPolicy,
}

impl StageRunner {
    /// Creates a runner for the given stage.
    #[must_use]
    pub fn new(
        stage: Arc<dyn Stage>,
        store: Arc<dyn JobStore>,
        bus: Arc<dyn EventBus>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            stage,
            store,
            bus,
            retry,
        }
    }

    async fn process(&self, event: Event) {
        let payload = &event.payload;
        let job_id = payload.job_id();
        tracing::debug!(topic = %payload.topic(), "stage triggered");

        let record = match self.store.get(&job_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                // Nothing to update and nobody to notify.
                tracing::warn!("no record for delivered event; dropping");
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "record lookup failed; dropping delivery");
                return;
            }
        };

        if record.status.is_terminal() {
            tracing::debug!(status = %record.status, "job already terminal; ignoring redelivery");
            return;
        }

        if let Err(e) = self
            .store
            .merge(&job_id, JobPatch::status(self.stage.working_status()))
            .await
        {
            tracing::error!(error = %e, "working-status merge failed; dropping delivery");
            return;
        }

        let started = Instant::now();
        let result = run_with_retry(&self.retry, self.stage.name(), || {
            self.stage.execute(payload)
        })
        .await;

        let output = match result {
            Ok(output) => {
                record_stage(self.stage.name(), "success", started.elapsed());
                output
            }
            Err(Error::UnexpectedPayload { topic }) => {
                // Wiring mistake, not a job failure; leave the record alone.
                tracing::warn!(%topic, "payload does not match this stage's trigger; dropping");
                return;
            }
            Err(e) => {
                record_stage(self.stage.name(), "failure", started.elapsed());
                let message = e.to_string();
                tracing::error!(error = %message, "stage failed");
                let mut output = StageOutput::new(
                    JobPatch::status(JobStatus::Failed).with_error(message.clone()),
                );
                if let Some(topic) = self.stage.error_topic() {
                    if let Some(failure) =
                        PipelineEvent::failure(topic, job_id, payload.email(), &message)
                    {
                        output = output.with_event(failure);
                    }
                }
                output
            }
        };

        self.commit(job_id, output).await;
    }

    /// Merges the patch, then publishes the events. A failed merge withholds
    /// the events entirely: the record never trails what the bus announces.
    async fn commit(&self, job_id: JobId, output: StageOutput) {
        let terminal = output.patch.status.filter(|s| s.is_terminal());
        if let Err(e) = self.store.merge(&job_id, output.patch).await {
            tracing::error!(error = %e, "result merge failed; withholding follow-on events");
            return;
        }
        if let Some(status) = terminal {
            record_job_terminal(status.as_label());
        }
        for payload in output.events {
            let event = Event::new(payload);
            let topic = event.topic();
            if let Err(e) = self.bus.publish(event).await {
                tracing::error!(%topic, error = %e, "event publish failed");
            }
        }
    }
}

#[async_trait]
impl EventHandler for StageRunner {
    async fn handle(&self, event: Event) {
        let job_id = event.payload.job_id().to_string();
        let span = stage_span(self.stage.name(), &job_id);
        self.process(event).instrument(span).await;
    }
}
