//! Error types for pipeline orchestration.

use retitle_core::JobId;

use crate::topic::Topic;

/// The result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during pipeline orchestration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No job record exists for the given id.
    ///
    /// A delivered event referencing an unknown job is a boundary condition:
    /// there is no record to update and no submitter to notify, so the
    /// delivery is logged and dropped.
    #[error("job not found: {job_id}")]
    JobNotFound {
        /// The id that was looked up.
        job_id: JobId,
    },

    /// A stage received an event payload that does not match its trigger
    /// topic. Indicates a wiring mistake, never a per-job failure.
    #[error("unexpected payload for topic {topic}")]
    UnexpectedPayload {
        /// The topic of the offending payload.
        topic: Topic,
    },

    /// An external collaborator call failed.
    #[error("{service} error: {message}")]
    Collaborator {
        /// Which collaborator failed (`youtube`, `gemini`, `resend`).
        service: &'static str,
        /// Description of the failure.
        message: String,
        /// Whether retrying the call may succeed.
        retryable: bool,
    },

    /// A storage operation failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A core error occurred.
    #[error(transparent)]
    Core(#[from] retitle_core::Error),
}

impl Error {
    /// Creates a new storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new storage error with a source cause.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a collaborator error that is worth retrying (transport
    /// failures, server-side errors).
    #[must_use]
    pub fn collaborator_retryable(service: &'static str, message: impl Into<String>) -> Self {
        Self::Collaborator {
            service,
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a collaborator error that retrying cannot fix (rejected
    /// requests, malformed replies).
    #[must_use]
    pub fn collaborator_fatal(service: &'static str, message: impl Into<String>) -> Self {
        Self::Collaborator {
            service,
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if retrying the failed operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Collaborator { retryable: true, .. })
    }
}
