//! Scripted collaborator fakes and bus helpers shared by the pipeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use retitle_flow::bus::EventHandler;
use retitle_flow::collaborators::{
    ChannelRef, GeneratedTitle, Mailer, TitleGenerator, VideoPlatform,
};
use retitle_flow::error::{Error, Result};
use retitle_flow::events::Event;
use retitle_flow::record::Video;
use retitle_flow::topic::Topic;

pub fn video(n: usize) -> Video {
    Video {
        video_id: format!("vid{n}"),
        title: format!("Video title {n}"),
        url: format!("https://www.youtube.com/watch/?v=vid{n}"),
        published_at: Utc::now(),
        thumbnail_url: format!("https://img.example/vid{n}.jpg"),
    }
}

/// A platform with a fixed resolution result and upload list.
pub struct FakePlatform {
    channel: Option<ChannelRef>,
    videos: Vec<Video>,
}

impl FakePlatform {
    pub fn with_channel(videos: Vec<Video>) -> Arc<Self> {
        Arc::new(Self {
            channel: Some(ChannelRef {
                channel_id: "UC123".to_string(),
                channel_name: "Test Channel".to_string(),
            }),
            videos,
        })
    }

    pub fn without_channel() -> Arc<Self> {
        Arc::new(Self {
            channel: None,
            videos: Vec::new(),
        })
    }
}

#[async_trait]
impl VideoPlatform for FakePlatform {
    async fn find_channel(&self, _query: &str) -> Result<Option<ChannelRef>> {
        Ok(self.channel.clone())
    }

    async fn recent_videos(&self, _channel_id: &str) -> Result<Vec<Video>> {
        Ok(self.videos.clone())
    }
}

/// Echoes every original title back with a mechanical improvement, honoring
/// the order- and count-preserving contract.
pub struct EchoGenerator;

#[async_trait]
impl TitleGenerator for EchoGenerator {
    async fn improve_titles(
        &self,
        _channel_name: &str,
        titles: &[String],
    ) -> Result<Vec<GeneratedTitle>> {
        Ok(titles
            .iter()
            .map(|t| GeneratedTitle {
                original: t.clone(),
                improved: format!("Improved: {t}"),
                rationale: "clearer hook".to_string(),
            })
            .collect())
    }
}

/// Violates the generator contract by replying in reverse order.
pub struct ReversingGenerator;

#[async_trait]
impl TitleGenerator for ReversingGenerator {
    async fn improve_titles(
        &self,
        _channel_name: &str,
        titles: &[String],
    ) -> Result<Vec<GeneratedTitle>> {
        Ok(titles
            .iter()
            .rev()
            .map(|t| GeneratedTitle {
                original: t.clone(),
                improved: format!("Improved: {t}"),
                rationale: "clearer hook".to_string(),
            })
            .collect())
    }
}

/// Violates the generator contract by dropping the last title.
pub struct TruncatingGenerator;

#[async_trait]
impl TitleGenerator for TruncatingGenerator {
    async fn improve_titles(
        &self,
        _channel_name: &str,
        titles: &[String],
    ) -> Result<Vec<GeneratedTitle>> {
        let keep = titles.len().saturating_sub(1);
        Ok(titles[..keep]
            .iter()
            .map(|t| GeneratedTitle {
                original: t.clone(),
                improved: format!("Improved: {t}"),
                rationale: "clearer hook".to_string(),
            })
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Captures outgoing mail; optionally rejects every send.
pub struct Mailbox {
    sent: Mutex<Vec<SentEmail>>,
    counter: AtomicUsize,
    fail: bool,
}

impl Mailbox {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
            fail: true,
        })
    }

    pub fn emails(&self) -> Vec<SentEmail> {
        self.sent.lock().expect("mailbox lock").clone()
    }
}

#[async_trait]
impl Mailer for Mailbox {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<String> {
        if self.fail {
            return Err(Error::collaborator_fatal("resend", "delivery rejected"));
        }
        self.sent.lock().expect("mailbox lock").push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("email_{n}"))
    }
}

/// Collects every delivered event for later assertions.
pub struct TopicRecorder {
    events: Mutex<Vec<Event>>,
}

impl TopicRecorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("recorder lock").clone()
    }

    pub fn topics(&self) -> Vec<Topic> {
        self.events().iter().map(Event::topic).collect()
    }
}

#[async_trait]
impl EventHandler for TopicRecorder {
    async fn handle(&self, event: Event) {
        self.events.lock().expect("recorder lock").push(event);
    }
}
