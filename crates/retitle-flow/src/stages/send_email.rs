//! Result delivery: `titles.ready` to `email.sent`.
//!
//! The last stage has no error topic. If delivery fails the record is marked
//! `failed` and the failure is logged, and that is the end of the job; there
//! is no point emailing someone that their email could not be sent.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::collaborators::Mailer;
use crate::error::{Error, Result};
use crate::events::PipelineEvent;
use crate::record::JobPatch;
use crate::render;
use crate::stage::{Stage, StageOutput};
use crate::status::JobStatus;
use crate::topic::Topic;

/// Renders the results email and hands it to the mailer.
pub struct SendEmail {
    mailer: Arc<dyn Mailer>,
}

impl SendEmail {
    /// Creates the stage around an email-delivery collaborator.
    #[must_use]
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }
}

#[async_trait]
impl Stage for SendEmail {
    fn name(&self) -> &'static str {
        "send_email"
    }

    fn working_status(&self) -> JobStatus {
        JobStatus::SendingEmail
    }

    fn error_topic(&self) -> Option<Topic> {
        None
    }

    async fn execute(&self, payload: &PipelineEvent) -> Result<StageOutput> {
        let PipelineEvent::TitlesReady {
            job_id,
            email,
            channel_name,
            improved_titles,
        } = payload
        else {
            return Err(Error::UnexpectedPayload {
                topic: payload.topic(),
            });
        };

        let subject = render::success_subject(channel_name);
        let body = render::success_body(channel_name, improved_titles);
        let email_id = self.mailer.send(email, &subject, &body).await?;
        tracing::info!(%email_id, "result email delivered");

        Ok(StageOutput::new(
            JobPatch::status(JobStatus::Completed)
                .with_email_id(email_id.clone())
                .with_completed_at(Utc::now()),
        )
        .with_event(PipelineEvent::EmailSent {
            job_id: *job_id,
            email: email.clone(),
            email_id,
        }))
    }
}
