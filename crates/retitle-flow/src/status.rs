//! Job lifecycle state machine.
//!
//! This module provides `JobStatus`, the per-job state machine advanced by
//! the pipeline stages. Transitions only move forward; once a terminal
//! status is reached the record is never mutated again.

use serde::{Deserialize, Serialize};

/// Job execution state machine.
///
/// States follow a directed chain, one working/success pair per stage:
/// ```text
/// ┌────────┐   ┌───────────────────┐   ┌──────────────────┐   ┌─────────────────┐
/// │ QUEUED │──►│ RESOLVING_CHANNEL │──►│ CHANNEL_RESOLVED │──►│ FETCHING_VIDEOS │
/// └────────┘   └───────────────────┘   └──────────────────┘   └─────────────────┘
///                        │                                             │
///                   no match                                           ▼
///                        │                                    ┌────────────────┐
///                        ▼                                    │ VIDEOS_FETCHED │
///              ┌───────────────────┐                          └────────────────┘
///              │ CHANNEL_NOT_FOUND │                                   │
///              └───────────────────┘                                   ▼
///                                                            ┌───────────────────┐
///                                                            │ GENERATING_TITLES │
///                                                            └───────────────────┘
///                                                                      │
///                                                                      ▼
/// ┌───────────┐   ┌───────────────┐   ┌──────────────┐        ┌──────────────┐
/// │ COMPLETED │◄──│ SENDING_EMAIL │◄──│ TITLES_READY │◄───────┘
/// └───────────┘   └───────────────┘   └──────────────┘
///
/// FAILED is reachable from every non-terminal state.
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Record created, no stage has run yet.
    Queued,
    /// Looking up the channel for the submitted query.
    ResolvingChannel,
    /// Channel id and name are known.
    ChannelResolved,
    /// Listing the channel's recent videos.
    FetchingVideos,
    /// Recent videos are on the record.
    VideosFetched,
    /// Asking the AI collaborator for improved titles.
    GeneratingTitles,
    /// Improved titles are on the record.
    TitlesReady,
    /// Composing and sending the result email.
    SendingEmail,
    /// Result email delivered. Terminal.
    Completed,
    /// A stage failed past recovery. Terminal.
    Failed,
    /// The channel query matched nothing. Terminal.
    ChannelNotFound,
}

impl JobStatus {
    /// Returns true if this is a terminal status.
    ///
    /// No stage handler acts on a record in a terminal status, though the
    /// record remains readable.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::ChannelNotFound)
    }

    /// Returns true if the job is still moving through the pipeline.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if the transition from self to target is valid.
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        match self {
            Self::Queued => matches!(target, Self::ResolvingChannel | Self::Failed),
            Self::ResolvingChannel => matches!(
                target,
                Self::ChannelResolved | Self::ChannelNotFound | Self::Failed
            ),
            Self::ChannelResolved => matches!(target, Self::FetchingVideos | Self::Failed),
            Self::FetchingVideos => matches!(target, Self::VideosFetched | Self::Failed),
            Self::VideosFetched => matches!(target, Self::GeneratingTitles | Self::Failed),
            Self::GeneratingTitles => matches!(target, Self::TitlesReady | Self::Failed),
            Self::TitlesReady => matches!(target, Self::SendingEmail | Self::Failed),
            Self::SendingEmail => matches!(target, Self::Completed | Self::Failed),
            Self::Completed | Self::Failed | Self::ChannelNotFound => false,
        }
    }

    /// Returns a lowercase label suitable for metrics and logs.
    #[must_use]
    pub const fn as_label(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::ResolvingChannel => "resolving_channel",
            Self::ChannelResolved => "channel_resolved",
            Self::FetchingVideos => "fetching_videos",
            Self::VideosFetched => "videos_fetched",
            Self::GeneratingTitles => "generating_titles",
            Self::TitlesReady => "titles_ready",
            Self::SendingEmail => "sending_email",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::ChannelNotFound => "channel_not_found",
        }
    }

    /// Returns all valid target states from the current state.
    #[must_use]
    pub fn valid_transitions(&self) -> Vec<Self> {
        match self {
            Self::Queued => vec![Self::ResolvingChannel, Self::Failed],
            Self::ResolvingChannel => {
                vec![Self::ChannelResolved, Self::ChannelNotFound, Self::Failed]
            }
            Self::ChannelResolved => vec![Self::FetchingVideos, Self::Failed],
            Self::FetchingVideos => vec![Self::VideosFetched, Self::Failed],
            Self::VideosFetched => vec![Self::GeneratingTitles, Self::Failed],
            Self::GeneratingTitles => vec![Self::TitlesReady, Self::Failed],
            Self::TitlesReady => vec![Self::SendingEmail, Self::Failed],
            Self::SendingEmail => vec![Self::Completed, Self::Failed],
            Self::Completed | Self::Failed | Self::ChannelNotFound => vec![],
        }
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Queued
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_is_a_valid_chain() {
        let chain = [
            JobStatus::Queued,
            JobStatus::ResolvingChannel,
            JobStatus::ChannelResolved,
            JobStatus::FetchingVideos,
            JobStatus::VideosFetched,
            JobStatus::GeneratingTitles,
            JobStatus::TitlesReady,
            JobStatus::SendingEmail,
            JobStatus::Completed,
        ];
        for pair in chain.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be valid",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn failed_reachable_from_every_non_terminal_state() {
        let non_terminal = [
            JobStatus::Queued,
            JobStatus::ResolvingChannel,
            JobStatus::ChannelResolved,
            JobStatus::FetchingVideos,
            JobStatus::VideosFetched,
            JobStatus::GeneratingTitles,
            JobStatus::TitlesReady,
            JobStatus::SendingEmail,
        ];
        for state in non_terminal {
            assert!(state.can_transition_to(JobStatus::Failed));
        }
    }

    #[test]
    fn channel_not_found_only_from_resolving_channel() {
        assert!(JobStatus::ResolvingChannel.can_transition_to(JobStatus::ChannelNotFound));
        assert!(!JobStatus::Queued.can_transition_to(JobStatus::ChannelNotFound));
        assert!(!JobStatus::FetchingVideos.can_transition_to(JobStatus::ChannelNotFound));
        assert!(!JobStatus::SendingEmail.can_transition_to(JobStatus::ChannelNotFound));
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        for state in [
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::ChannelNotFound,
        ] {
            assert!(state.is_terminal());
            assert!(state.valid_transitions().is_empty());
        }
    }

    #[test]
    fn no_backward_transitions() {
        assert!(!JobStatus::ChannelResolved.can_transition_to(JobStatus::Queued));
        assert!(!JobStatus::VideosFetched.can_transition_to(JobStatus::ResolvingChannel));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::SendingEmail));
    }

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_string(&JobStatus::ChannelNotFound).unwrap();
        assert_eq!(json, "\"channel_not_found\"");
        let parsed: JobStatus = serde_json::from_str("\"resolving_channel\"").unwrap();
        assert_eq!(parsed, JobStatus::ResolvingChannel);
    }

    #[test]
    fn label_matches_display() {
        assert_eq!(JobStatus::TitlesReady.to_string(), "titles_ready");
        assert_eq!(JobStatus::TitlesReady.as_label(), "titles_ready");
    }
}
