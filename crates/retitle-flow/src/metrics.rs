//! Metrics for pipeline orchestration.
//!
//! Emitted through the `metrics` facade; the API binary installs the
//! Prometheus recorder. Per-stage outcome counters plus durations are enough
//! to graph throughput, failure rates, and collaborator flakiness.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Metric names as constants for consistency.
pub mod names {
    /// Histogram of stage handler durations in seconds.
    pub const STAGE_DURATION_SECONDS: &str = "retitle_flow_stage_duration_seconds";
    /// Counter of stage handler outcomes.
    pub const STAGE_TOTAL: &str = "retitle_flow_stage_total";
    /// Counter of accepted submissions.
    pub const JOBS_SUBMITTED_TOTAL: &str = "retitle_flow_jobs_submitted_total";
    /// Counter of jobs reaching a terminal status.
    pub const JOBS_TERMINAL_TOTAL: &str = "retitle_flow_jobs_terminal_total";
    /// Counter of events published on the bus.
    pub const EVENTS_PUBLISHED_TOTAL: &str = "retitle_flow_events_published_total";
    /// Counter of collaborator retry attempts.
    pub const COLLABORATOR_RETRIES_TOTAL: &str = "retitle_flow_collaborator_retries_total";
}

/// Metric label keys.
pub mod labels {
    /// Stage name.
    pub const STAGE: &str = "stage";
    /// Stage outcome (`success` or `failure`).
    pub const OUTCOME: &str = "outcome";
    /// Bus topic.
    pub const TOPIC: &str = "topic";
    /// Terminal job status.
    pub const STATUS: &str = "status";
    /// Collaborator service name.
    pub const SERVICE: &str = "service";
}

/// Registers descriptions for every pipeline metric.
///
/// Call after installing a recorder; without one this is a no-op.
pub fn register_metrics() {
    describe_histogram!(
        names::STAGE_DURATION_SECONDS,
        "Duration of stage handler invocations in seconds"
    );
    describe_counter!(names::STAGE_TOTAL, "Total stage handler invocations by outcome");
    describe_counter!(names::JOBS_SUBMITTED_TOTAL, "Total accepted job submissions");
    describe_counter!(
        names::JOBS_TERMINAL_TOTAL,
        "Total jobs that reached a terminal status"
    );
    describe_counter!(
        names::EVENTS_PUBLISHED_TOTAL,
        "Total events published on the bus"
    );
    describe_counter!(
        names::COLLABORATOR_RETRIES_TOTAL,
        "Total collaborator retry attempts"
    );
}

/// Records one stage handler invocation.
pub fn record_stage(stage: &'static str, outcome: &'static str, duration: Duration) {
    let labels = [(labels::STAGE, stage), (labels::OUTCOME, outcome)];
    counter!(names::STAGE_TOTAL, &labels).increment(1);
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration.as_secs_f64());
}

/// Records an accepted submission.
pub fn record_job_submitted() {
    counter!(names::JOBS_SUBMITTED_TOTAL).increment(1);
}

/// Records a job reaching a terminal status.
pub fn record_job_terminal(status: &'static str) {
    counter!(names::JOBS_TERMINAL_TOTAL, labels::STATUS => status).increment(1);
}

/// Records a published event.
pub fn record_event_published(topic: &'static str) {
    counter!(names::EVENTS_PUBLISHED_TOTAL, labels::TOPIC => topic).increment(1);
}

/// Records a collaborator retry attempt.
pub fn record_collaborator_retry(service: &str) {
    counter!(names::COLLABORATOR_RETRIES_TOTAL, labels::SERVICE => service.to_string())
        .increment(1);
}
