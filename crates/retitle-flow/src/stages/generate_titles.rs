//! Title generation: `videos.fetched` to `titles.ready` or `titles.error`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::collaborators::TitleGenerator;
use crate::error::{Error, Result};
use crate::events::PipelineEvent;
use crate::record::{ImprovedTitle, JobPatch};
use crate::stage::{Stage, StageOutput};
use crate::status::JobStatus;
use crate::topic::Topic;

/// Asks the AI collaborator for an improved title per video and pairs each
/// reply with its video's URL.
///
/// The generator's contract is order- and count-preserving. Both are checked
/// here, and a violation fails the job rather than risk mailing titles paired
/// with the wrong videos.
pub struct GenerateTitles {
    generator: Arc<dyn TitleGenerator>,
}

impl GenerateTitles {
    /// Creates the stage around a title-generation collaborator.
    #[must_use]
    pub fn new(generator: Arc<dyn TitleGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Stage for GenerateTitles {
    fn name(&self) -> &'static str {
        "generate_titles"
    }

    fn working_status(&self) -> JobStatus {
        JobStatus::GeneratingTitles
    }

    fn error_topic(&self) -> Option<Topic> {
        Some(Topic::TitlesError)
    }

    async fn execute(&self, payload: &PipelineEvent) -> Result<StageOutput> {
        let PipelineEvent::VideosFetched {
            job_id,
            email,
            channel_name,
            videos,
        } = payload
        else {
            return Err(Error::UnexpectedPayload {
                topic: payload.topic(),
            });
        };

        let titles: Vec<String> = videos.iter().map(|v| v.title.clone()).collect();
        let generated = self.generator.improve_titles(channel_name, &titles).await?;

        if generated.len() != videos.len() {
            return Err(Error::collaborator_fatal(
                "title_generator",
                format!(
                    "expected {} titles, model returned {}",
                    videos.len(),
                    generated.len()
                ),
            ));
        }

        let mut improved = Vec::with_capacity(videos.len());
        for (video, title) in videos.iter().zip(generated) {
            if title.original.trim() != video.title.trim() {
                return Err(Error::collaborator_fatal(
                    "title_generator",
                    format!(
                        "model reordered titles: expected {:?}, got {:?}",
                        video.title, title.original
                    ),
                ));
            }
            improved.push(ImprovedTitle {
                original: title.original,
                improved: title.improved,
                rationale: title.rationale,
                url: video.url.clone(),
            });
        }
        tracing::info!(count = improved.len(), "titles generated");

        Ok(StageOutput::new(
            JobPatch::status(JobStatus::TitlesReady).with_improved_titles(improved.clone()),
        )
        .with_event(PipelineEvent::TitlesReady {
            job_id: *job_id,
            email: email.clone(),
            channel_name: channel_name.clone(),
            improved_titles: improved,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use retitle_core::JobId;

    use crate::collaborators::GeneratedTitle;
    use crate::record::Video;

    struct FixedGenerator {
        reply: Vec<GeneratedTitle>,
    }

    #[async_trait]
    impl TitleGenerator for FixedGenerator {
        async fn improve_titles(
            &self,
            _channel_name: &str,
            _titles: &[String],
        ) -> Result<Vec<GeneratedTitle>> {
            Ok(self.reply.clone())
        }
    }

    fn video(n: u32) -> Video {
        Video {
            video_id: format!("vid{n}"),
            title: format!("Title {n}"),
            url: format!("https://www.youtube.com/watch/?v=vid{n}"),
            published_at: Utc::now(),
            thumbnail_url: String::new(),
        }
    }

    fn generated(original: &str) -> GeneratedTitle {
        GeneratedTitle {
            original: original.to_string(),
            improved: format!("Better {original}"),
            rationale: "punchier".to_string(),
        }
    }

    fn fetched(videos: Vec<Video>) -> PipelineEvent {
        PipelineEvent::VideosFetched {
            job_id: JobId::generate(),
            email: "a@b.com".to_string(),
            channel_name: "The Channel".to_string(),
            videos,
        }
    }

    #[tokio::test]
    async fn pairs_each_title_with_its_video_url() {
        let stage = GenerateTitles::new(Arc::new(FixedGenerator {
            reply: vec![generated("Title 1"), generated("Title 2")],
        }));

        let output = stage
            .execute(&fetched(vec![video(1), video(2)]))
            .await
            .expect("execute");

        assert_eq!(output.patch.status, Some(JobStatus::TitlesReady));
        let titles = output.patch.improved_titles.expect("titles in patch");
        assert_eq!(titles.len(), 2);
        assert_eq!(titles[0].improved, "Better Title 1");
        assert_eq!(titles[0].url, "https://www.youtube.com/watch/?v=vid1");
        assert_eq!(titles[1].url, "https://www.youtube.com/watch/?v=vid2");
    }

    #[tokio::test]
    async fn count_mismatch_fails_the_job() {
        let stage = GenerateTitles::new(Arc::new(FixedGenerator {
            reply: vec![generated("Title 1")],
        }));

        let result = stage.execute(&fetched(vec![video(1), video(2)])).await;

        let Err(err) = result else {
            panic!("expected count mismatch to fail");
        };
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("expected 2 titles"));
    }

    #[tokio::test]
    async fn reordered_reply_fails_the_job() {
        let stage = GenerateTitles::new(Arc::new(FixedGenerator {
            reply: vec![generated("Title 2"), generated("Title 1")],
        }));

        let result = stage.execute(&fetched(vec![video(1), video(2)])).await;

        let Err(err) = result else {
            panic!("expected reorder to fail");
        };
        assert!(err.to_string().contains("reordered"));
    }
}
