//! The error aggregator: one subscriber on every stage error topic.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::Instrument;

use retitle_core::observability::stage_span;

use crate::bus::{EventBus, EventHandler};
use crate::collaborators::Mailer;
use crate::events::{Event, PipelineEvent};
use crate::metrics::record_stage;
use crate::render;
use crate::retry::{run_with_retry, RetryPolicy};

const NAME: &str = "notify_failure";

/// Emails the submitter when any stage publishes to its error topic, then
/// announces the delivery on `error.notified`.
///
/// Store-free: the failing stage merged the `failed` record before its error
/// event existed, so the notifier works from the event's own fields. If the
/// notification itself cannot be delivered it is logged and dropped; this
/// path never throws back into the bus.
pub struct FailureNotifier {
    mailer: Arc<dyn Mailer>,
    bus: Arc<dyn EventBus>,
    retry: RetryPolicy,
}

impl FailureNotifier {
    /// Creates the notifier around an email-delivery collaborator.
    #[must_use]
    pub fn new(mailer: Arc<dyn Mailer>, bus: Arc<dyn EventBus>, retry: RetryPolicy) -> Self {
        Self { mailer, bus, retry }
    }

    async fn notify(&self, event: Event) {
        let payload = &event.payload;
        let (job_id, email, error) = match payload {
            PipelineEvent::ChannelError {
                job_id,
                email,
                error,
            }
            | PipelineEvent::VideosError {
                job_id,
                email,
                error,
            }
            | PipelineEvent::TitlesError {
                job_id,
                email,
                error,
            } => (*job_id, email, error),
            other => {
                tracing::warn!(topic = %other.topic(), "notifier received a non-error payload; dropping");
                return;
            }
        };

        let body = render::failure_body(&job_id, error);
        let started = Instant::now();
        let result = run_with_retry(&self.retry, NAME, || {
            self.mailer.send(email, render::FAILURE_SUBJECT, &body)
        })
        .await;

        match result {
            Ok(email_id) => {
                record_stage(NAME, "success", started.elapsed());
                tracing::info!(%email_id, "failure notification delivered");
                let notified = Event::new(PipelineEvent::ErrorNotified {
                    job_id,
                    email: email.clone(),
                    email_id,
                });
                if let Err(e) = self.bus.publish(notified).await {
                    tracing::error!(error = %e, "error.notified publish failed");
                }
            }
            Err(e) => {
                record_stage(NAME, "failure", started.elapsed());
                tracing::error!(error = %e, "failure notification could not be delivered");
            }
        }
    }
}

#[async_trait]
impl EventHandler for FailureNotifier {
    async fn handle(&self, event: Event) {
        let job_id = event.payload.job_id().to_string();
        let span = stage_span(NAME, &job_id);
        self.notify(event).instrument(span).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use retitle_core::JobId;

    use crate::bus::InMemoryEventBus;
    use crate::error::{Error, Result};
    use crate::topic::Topic;

    struct ScriptedMailer {
        outcomes: Mutex<VecDeque<Result<String>>>,
        sent: Mutex<Vec<(String, String, String)>>,
    }

    impl ScriptedMailer {
        fn new(outcomes: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Mailer for ScriptedMailer {
        async fn send(&self, to: &str, subject: &str, html: &str) -> Result<String> {
            self.sent.lock().expect("sent lock").push((
                to.to_string(),
                subject.to_string(),
                html.to_string(),
            ));
            self.outcomes
                .lock()
                .expect("outcomes lock")
                .pop_front()
                .expect("scripted outcome available")
        }
    }

    struct Recorder {
        events: Mutex<Vec<Event>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle(&self, event: Event) {
            self.events.lock().expect("events lock").push(event);
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2))
    }

    fn channel_error(job_id: JobId) -> Event {
        Event::new(PipelineEvent::ChannelError {
            job_id,
            email: "a@b.com".to_string(),
            error: "channel \"@ghost\" not found".to_string(),
        })
    }

    #[tokio::test]
    async fn emails_submitter_and_publishes_error_notified() {
        let mailer = ScriptedMailer::new(vec![Ok("email_7".to_string())]);
        let bus = Arc::new(InMemoryEventBus::new());
        let recorder = Arc::new(Recorder {
            events: Mutex::new(Vec::new()),
        });
        bus.subscribe(Topic::ErrorNotified, recorder.clone())
            .expect("subscribe");

        let notifier = FailureNotifier::new(mailer.clone(), bus.clone(), fast_retry());
        let job_id = JobId::generate();
        notifier.handle(channel_error(job_id)).await;
        bus.wait_idle().await;

        let sent = mailer.sent.lock().expect("sent lock");
        let (to, subject, html) = &sent[0];
        assert_eq!(to, "a@b.com");
        assert_eq!(subject, render::FAILURE_SUBJECT);
        assert!(html.contains("channel &quot;@ghost&quot; not found"));
        assert!(html.contains(&job_id.to_string()));

        let events = recorder.events.lock().expect("events lock");
        let PipelineEvent::ErrorNotified { email_id, .. } = &events[0].payload else {
            panic!("expected error.notified");
        };
        assert_eq!(email_id, "email_7");
    }

    #[tokio::test]
    async fn notification_failure_is_logged_and_dropped() {
        let mailer = ScriptedMailer::new(vec![
            Err(Error::collaborator_fatal("resend", "rejected")),
        ]);
        let bus = Arc::new(InMemoryEventBus::new());
        let recorder = Arc::new(Recorder {
            events: Mutex::new(Vec::new()),
        });
        bus.subscribe(Topic::ErrorNotified, recorder.clone())
            .expect("subscribe");

        let notifier = FailureNotifier::new(mailer, bus.clone(), fast_retry());
        notifier.handle(channel_error(JobId::generate())).await;
        bus.wait_idle().await;

        assert!(recorder.events.lock().expect("events lock").is_empty());
    }

    #[tokio::test]
    async fn retries_transient_delivery_failures() {
        let mailer = ScriptedMailer::new(vec![
            Err(Error::collaborator_retryable("resend", "timeout")),
            Ok("email_8".to_string()),
        ]);
        let bus = Arc::new(InMemoryEventBus::new());

        let notifier = FailureNotifier::new(mailer.clone(), bus, fast_retry());
        notifier.handle(channel_error(JobId::generate())).await;

        assert_eq!(mailer.sent.lock().expect("sent lock").len(), 2);
    }

    #[tokio::test]
    async fn non_error_payloads_are_dropped() {
        let mailer = ScriptedMailer::new(vec![]);
        let bus = Arc::new(InMemoryEventBus::new());

        let notifier = FailureNotifier::new(mailer.clone(), bus, fast_retry());
        notifier
            .handle(Event::new(PipelineEvent::Submitted {
                job_id: JobId::generate(),
                channel_query: "@chan".to_string(),
                email: "a@b.com".to_string(),
            }))
            .await;

        assert!(mailer.sent.lock().expect("sent lock").is_empty());
    }
}
