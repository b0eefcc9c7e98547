//! YouTube Data API v3 client for channel lookup and recent uploads.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::collaborators::{status_error, ChannelRef, VideoPlatform, MAX_RECENT_VIDEOS};
use crate::error::{Error, Result};
use crate::record::Video;

/// Production base URL for the YouTube Data API.
pub const DEFAULT_YOUTUBE_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SERVICE: &str = "youtube";

/// HTTP client for the YouTube Data API `search` endpoint.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl YouTubeClient {
    /// Creates a new client targeting the given base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client: super::build_http_client(DEFAULT_REQUEST_TIMEOUT)?,
        })
    }

    /// Replaces the request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be rebuilt.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = super::build_http_client(timeout)?;
        Ok(self)
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.base_url.trim_end_matches('/'))
    }

    async fn search(&self, params: &[(&str, &str)]) -> Result<SearchResponse> {
        let response = self
            .client
            .get(self.search_url())
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                Error::collaborator_retryable(SERVICE, format!("search request failed: {e}"))
            })?;

        if response.status().is_success() {
            return response.json::<SearchResponse>().await.map_err(|e| {
                Error::collaborator_fatal(SERVICE, format!("invalid search response: {e}"))
            });
        }

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            Error::collaborator_retryable(SERVICE, format!("failed reading search error body: {e}"))
        })?;
        Err(status_error(SERVICE, "search", status, &body))
    }
}

#[async_trait]
impl VideoPlatform for YouTubeClient {
    async fn find_channel(&self, query: &str) -> Result<Option<ChannelRef>> {
        // Handles are submitted as "@name"; the search API wants the bare name.
        let term = query.strip_prefix('@').unwrap_or(query);
        let response = self
            .search(&[("part", "snippet"), ("type", "channel"), ("q", term)])
            .await?;

        let Some(item) = response.items.into_iter().next() else {
            return Ok(None);
        };
        let Some(channel_id) = item.snippet.channel_id.or(item.id.channel_id) else {
            return Ok(None);
        };
        Ok(Some(ChannelRef {
            channel_id,
            channel_name: item.snippet.title,
        }))
    }

    async fn recent_videos(&self, channel_id: &str) -> Result<Vec<Video>> {
        let max_results = MAX_RECENT_VIDEOS.to_string();
        let response = self
            .search(&[
                ("part", "snippet"),
                ("channelId", channel_id),
                ("order", "date"),
                ("type", "video"),
                ("maxResults", max_results.as_str()),
            ])
            .await?;

        let videos = response
            .items
            .into_iter()
            .filter_map(|item| {
                // Items without an id or timestamp are unusable; skip rather
                // than fail the whole fetch.
                let video_id = item.id.video_id?;
                let published_at = item.snippet.published_at?;
                Some(Video {
                    url: format!("https://www.youtube.com/watch/?v={video_id}"),
                    video_id,
                    title: item.snippet.title,
                    published_at,
                    thumbnail_url: item
                        .snippet
                        .thumbnails
                        .default
                        .map(|t| t.url)
                        .unwrap_or_default(),
                })
            })
            .take(MAX_RECENT_VIDEOS)
            .collect();
        Ok(videos)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
    channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    channel_id: Option<String>,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use axum::extract::Query;
    use axum::routing::get;
    use axum::Router;
    use reqwest::StatusCode;
    use serde_json::{json, Value};

    async fn spawn_search_server(status: StatusCode, body: Value) -> String {
        let app = Router::new().route(
            "/search",
            get(move || {
                let status = status;
                let body = body.clone();
                async move { (status, axum::Json(body)) }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        format!("http://{addr}")
    }

    fn video_item(video_id: &str, title: &str) -> Value {
        json!({
            "id": { "kind": "youtube#video", "videoId": video_id },
            "snippet": {
                "title": title,
                "publishedAt": "2024-03-01T12:00:00Z",
                "thumbnails": { "default": { "url": format!("https://img.example/{video_id}.jpg") } }
            }
        })
    }

    #[tokio::test]
    async fn find_channel_strips_leading_at_from_handles() {
        // Echo the q parameter back as the channel title so the test can see
        // exactly what the client sent.
        let app = Router::new().route(
            "/search",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let q = params.get("q").cloned().unwrap_or_default();
                axum::Json(json!({
                    "items": [{
                        "id": { "kind": "youtube#channel", "channelId": "UC123" },
                        "snippet": { "title": q, "channelId": "UC123" }
                    }]
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let client = YouTubeClient::new(format!("http://{addr}"), "test-key").expect("client");
        let channel = client
            .find_channel("@veritasium")
            .await
            .expect("find channel")
            .expect("channel present");

        assert_eq!(channel.channel_id, "UC123");
        assert_eq!(channel.channel_name, "veritasium");
    }

    #[tokio::test]
    async fn find_channel_returns_none_when_nothing_matches() {
        let base_url = spawn_search_server(StatusCode::OK, json!({ "items": [] })).await;
        let client = YouTubeClient::new(base_url, "test-key").expect("client");

        let channel = client.find_channel("no-such-channel").await.expect("search");
        assert!(channel.is_none());
    }

    #[tokio::test]
    async fn recent_videos_maps_items_and_builds_watch_urls() {
        let base_url = spawn_search_server(
            StatusCode::OK,
            json!({
                "items": [
                    video_item("abc123", "First upload"),
                    video_item("def456", "Second upload"),
                    // No videoId, e.g. a playlist result; must be skipped.
                    { "id": { "kind": "youtube#playlist" }, "snippet": { "title": "ignored" } },
                ]
            }),
        )
        .await;
        let client = YouTubeClient::new(base_url, "test-key").expect("client");

        let videos = client.recent_videos("UC123").await.expect("fetch videos");

        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].video_id, "abc123");
        assert_eq!(videos[0].title, "First upload");
        assert_eq!(videos[0].url, "https://www.youtube.com/watch/?v=abc123");
        assert_eq!(videos[0].thumbnail_url, "https://img.example/abc123.jpg");
        assert_eq!(videos[1].url, "https://www.youtube.com/watch/?v=def456");
    }

    #[tokio::test]
    async fn recent_videos_caps_at_five_items() {
        let items: Vec<Value> = (0..7)
            .map(|i| video_item(&format!("vid{i}"), &format!("Video {i}")))
            .collect();
        let base_url = spawn_search_server(StatusCode::OK, json!({ "items": items })).await;
        let client = YouTubeClient::new(base_url, "test-key").expect("client");

        let videos = client.recent_videos("UC123").await.expect("fetch videos");
        assert_eq!(videos.len(), MAX_RECENT_VIDEOS);
    }

    #[tokio::test]
    async fn server_errors_are_retryable() {
        let base_url = spawn_status_server_error(StatusCode::INTERNAL_SERVER_ERROR).await;
        let client = YouTubeClient::new(base_url, "test-key").expect("client");

        let result = client.find_channel("anything").await;
        assert!(matches!(
            result,
            Err(Error::Collaborator {
                retryable: true,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn quota_rejections_are_fatal() {
        let base_url = spawn_status_server_error(StatusCode::FORBIDDEN).await;
        let client = YouTubeClient::new(base_url, "test-key").expect("client");

        let result = client.recent_videos("UC123").await;
        assert!(matches!(
            result,
            Err(Error::Collaborator {
                retryable: false,
                ..
            })
        ));
    }

    async fn spawn_status_server_error(status: StatusCode) -> String {
        spawn_search_server(status, json!({ "error": { "message": "denied" } })).await
    }
}
