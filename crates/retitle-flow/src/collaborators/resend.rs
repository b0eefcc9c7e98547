//! Resend email delivery client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::collaborators::{status_error, Mailer};
use crate::error::{Error, Result};

/// Production base URL for the Resend API.
pub const DEFAULT_RESEND_BASE_URL: &str = "https://api.resend.com";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SERVICE: &str = "resend";

/// HTTP client for the Resend `/emails` endpoint.
#[derive(Debug, Clone)]
pub struct ResendClient {
    base_url: String,
    api_key: String,
    from: String,
    client: reqwest::Client,
}

impl ResendClient {
    /// Creates a new client targeting the given base URL. All mail goes out
    /// from the one configured sender address.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            from: from.into(),
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

    fn emails_url(&self) -> String {
        format!("{}/emails", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Mailer for ResendClient {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<String> {
        let request = SendEmailRequest {
            from: &self.from,
            to: vec![to],
            subject,
            html,
        };

        let response = self
            .client
            .post(self.emails_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                Error::collaborator_retryable(SERVICE, format!("send request failed: {e}"))
            })?;

        if response.status().is_success() {
            return response
                .json::<SendEmailResponse>()
                .await
                .map(|r| r.id)
                .map_err(|e| {
                    Error::collaborator_fatal(SERVICE, format!("invalid send response: {e}"))
                });
        }

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            Error::collaborator_retryable(SERVICE, format!("failed reading send error body: {e}"))
        })?;
        Err(status_error(SERVICE, "send", status, &body))
    }
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: String,
}
