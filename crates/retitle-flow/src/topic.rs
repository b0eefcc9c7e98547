//! Topic names for the event bus.
//!
//! The wiring between topics defines the pipeline: each stage subscribes to
//! exactly one trigger topic, the error aggregator subscribes to the three
//! error topics.

/// A named channel on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// A job was submitted; triggers channel resolution.
    Submitted,
    /// Channel id/name resolved; triggers video fetching.
    ChannelResolved,
    /// Channel resolution failed or matched nothing.
    ChannelError,
    /// Recent videos fetched; triggers title generation.
    VideosFetched,
    /// Video fetching failed.
    VideosError,
    /// Improved titles ready; triggers the result email.
    TitlesReady,
    /// Title generation failed.
    TitlesError,
    /// Result email delivered. Terminal success marker.
    EmailSent,
    /// Failure notification delivered. Terminal failure marker.
    ErrorNotified,
}

impl Topic {
    /// Returns the wire name of the topic.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::ChannelResolved => "channel.resolved",
            Self::ChannelError => "channel.error",
            Self::VideosFetched => "videos.fetched",
            Self::VideosError => "videos.error",
            Self::TitlesReady => "titles.ready",
            Self::TitlesError => "titles.error",
            Self::EmailSent => "email.sent",
            Self::ErrorNotified => "error.notified",
        }
    }

    /// The topics the error aggregator subscribes to.
    #[must_use]
    pub const fn error_topics() -> [Self; 3] {
        [Self::ChannelError, Self::VideosError, Self::TitlesError]
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
