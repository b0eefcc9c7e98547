//! Gemini title-generation client, spoken over the OpenAI-compatible
//! chat-completions surface.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::collaborators::{status_error, GeneratedTitle, TitleGenerator};
use crate::error::{Error, Result};

/// Production base URL for Gemini's OpenAI-compatible endpoint.
pub const DEFAULT_GEMINI_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/openai";

/// Model used when none is configured.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const SERVICE: &str = "gemini";

const SYSTEM_PROMPT: &str =
    "You are a YouTube SEO and engagement expert who helps creators write better video titles.";

/// HTTP client for the Gemini chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Creates a new client targeting the given base URL, using
    /// [`DEFAULT_GEMINI_MODEL`].
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            client: super::build_http_client(DEFAULT_REQUEST_TIMEOUT)?,
        })
    }

    /// Overrides the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
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

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl TitleGenerator for GeminiClient {
    async fn improve_titles(
        &self,
        channel_name: &str,
        titles: &[String],
    ) -> Result<Vec<GeneratedTitle>> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_prompt(channel_name, titles),
                },
            ],
            temperature: 0.7,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                Error::collaborator_retryable(SERVICE, format!("completion request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.bytes().await.map_err(|e| {
                Error::collaborator_retryable(
                    SERVICE,
                    format!("failed reading completion error body: {e}"),
                )
            })?;
            return Err(status_error(SERVICE, "completion", status, &body));
        }

        let completion = response.json::<ChatResponse>().await.map_err(|e| {
            Error::collaborator_fatal(SERVICE, format!("invalid completion response: {e}"))
        })?;

        let Some(choice) = completion.choices.into_iter().next() else {
            return Err(Error::collaborator_fatal(
                SERVICE,
                "model returned no choices",
            ));
        };
        let Some(content) = choice.message.content else {
            return Err(Error::collaborator_fatal(
                SERVICE,
                "model reply had no content",
            ));
        };

        let document: TitleDocument = serde_json::from_str(&content).map_err(|e| {
            Error::collaborator_fatal(
                SERVICE,
                format!("model reply was not the expected JSON shape: {e}"),
            )
        })?;
        Ok(document.titles)
    }
}

fn build_prompt(channel_name: &str, titles: &[String]) -> String {
    let mut numbered = String::new();
    for (idx, title) in titles.iter().enumerate() {
        let _ = writeln!(numbered, "{}. \"{title}\"", idx + 1);
    }
    format!(
        "You are a YouTube title optimization expert. Below are {count} video titles from a \
         YouTube channel named \"{channel_name}\".\n\n\
         For each title, provide:\n\
         1. An improved version that is more engaging, SEO-friendly, and likely to get more \
         clicks.\n\
         2. A brief rationale (1-2 sentences) explaining why the improved title is better.\n\n\
         Guidelines:\n\
         - Keep the core topic and authenticity\n\
         - Use action verbs, numbers, and specific value propositions\n\
         - Make it curiosity-inducing without being clickbait\n\
         - Optimize for searchability and clarity\n\n\
         Video titles:\n\
         {numbered}\n\
         Respond in JSON format:\n\
         {{\"titles\": [{{\"original\": \"...\", \"improved\": \"...\", \"rationale\": \"...\"}}]}}",
        count = titles.len(),
    )
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat<'a>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TitleDocument {
    titles: Vec<GeneratedTitle>,
}
