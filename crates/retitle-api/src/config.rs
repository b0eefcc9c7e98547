//! Server configuration.
//!
//! All runtime configuration comes from `RETITLE_*` environment variables.
//! [`Config::from_env`] only parses; [`Config::validate`] enforces the
//! required set so a misconfigured deployment fails at startup instead of
//! at the first job.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use retitle_core::observability::LogFormat;
use retitle_core::{Error, Result};
use retitle_flow::collaborators::{
    DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, DEFAULT_RESEND_BASE_URL,
    DEFAULT_YOUTUBE_BASE_URL,
};
use retitle_flow::retry::RetryPolicy;

const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 8080);

/// Job store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process map. Records are lost on restart; dev and tests only.
    Memory,
    /// One JSON file per job under `RETITLE_STORE_PATH`.
    Fs,
}

/// Job store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Selected backend.
    pub backend: StoreBackend,
    /// Root directory for the `fs` backend.
    pub path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: None,
        }
    }
}

/// YouTube Data API access.
#[derive(Clone)]
pub struct YouTubeConfig {
    /// API key. Required.
    pub api_key: Option<String>,
    /// Base URL, overridable for tests.
    pub base_url: String,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_YOUTUBE_BASE_URL.to_string(),
        }
    }
}

impl std::fmt::Debug for YouTubeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YouTubeConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Gemini title-generation access.
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key. Required.
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible endpoint, overridable for tests.
    pub base_url: String,
    /// Model name.
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
        }
    }
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Resend mail delivery access.
#[derive(Clone)]
pub struct ResendConfig {
    /// API key. Required.
    pub api_key: Option<String>,
    /// Base URL, overridable for tests.
    pub base_url: String,
    /// Sender address for all outgoing mail. Required.
    pub from_email: Option<String>,
}

impl Default for ResendConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_RESEND_BASE_URL.to_string(),
            from_email: None,
        }
    }
}

impl std::fmt::Debug for ResendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("from_email", &self.from_email)
            .finish()
    }
}

/// Retry policy for collaborator calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts per call, including the first.
    pub max_attempts: u32,
    /// First backoff delay in milliseconds.
    pub base_delay_ms: u64,
    /// Backoff ceiling in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: u64::try_from(policy.base_delay.as_millis()).unwrap_or(u64::MAX),
            max_delay_ms: u64::try_from(policy.max_delay.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl RetryConfig {
    /// Builds the pipeline retry policy.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

/// Configuration for the retitle API server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Log output format.
    pub log_format: LogFormat,
    /// Job store selection.
    pub store: StoreConfig,
    /// YouTube access.
    pub youtube: YouTubeConfig,
    /// Gemini access.
    pub gemini: GeminiConfig,
    /// Resend access.
    pub resend: ResendConfig,
    /// Optional override of the per-request timeout for collaborator calls.
    pub http_timeout_secs: Option<u64>,
    /// Collaborator retry policy.
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(DEFAULT_BIND_ADDR),
            log_format: LogFormat::Json,
            store: StoreConfig::default(),
            youtube: YouTubeConfig::default(),
            gemini: GeminiConfig::default(),
            resend: ResendConfig::default(),
            http_timeout_secs: None,
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Supported env vars:
    /// - `RETITLE_BIND_ADDR` (default `0.0.0.0:8080`)
    /// - `RETITLE_LOG_FORMAT` (`json` | `pretty`)
    /// - `RETITLE_STORE_BACKEND` (`memory` | `fs`)
    /// - `RETITLE_STORE_PATH` (required for `fs`)
    /// - `RETITLE_YOUTUBE_API_KEY`
    /// - `RETITLE_YOUTUBE_BASE_URL`
    /// - `RETITLE_GEMINI_API_KEY`
    /// - `RETITLE_GEMINI_BASE_URL`
    /// - `RETITLE_GEMINI_MODEL`
    /// - `RETITLE_RESEND_API_KEY`
    /// - `RETITLE_RESEND_BASE_URL`
    /// - `RETITLE_FROM_EMAIL`
    /// - `RETITLE_HTTP_TIMEOUT_SECS`
    /// - `RETITLE_RETRY_MAX_ATTEMPTS`
    /// - `RETITLE_RETRY_BASE_DELAY_MS`
    /// - `RETITLE_RETRY_MAX_DELAY_MS`
    ///
    /// Empty or whitespace-only values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is present but cannot be parsed.
    /// Missing required variables are reported by [`Config::validate`], not
    /// here.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = env_string("RETITLE_BIND_ADDR") {
            config.bind_addr = parse_bind_addr("RETITLE_BIND_ADDR", &addr)?;
        }
        if let Some(format) = env_string("RETITLE_LOG_FORMAT") {
            config.log_format = parse_log_format("RETITLE_LOG_FORMAT", &format)?;
        }
        if let Some(backend) = env_string("RETITLE_STORE_BACKEND") {
            config.store.backend = parse_store_backend("RETITLE_STORE_BACKEND", &backend)?;
        }
        if let Some(path) = env_string("RETITLE_STORE_PATH") {
            config.store.path = Some(PathBuf::from(path));
        }

        if let Some(key) = env_string("RETITLE_YOUTUBE_API_KEY") {
            config.youtube.api_key = Some(key);
        }
        if let Some(url) = env_string("RETITLE_YOUTUBE_BASE_URL") {
            config.youtube.base_url = url;
        }
        if let Some(key) = env_string("RETITLE_GEMINI_API_KEY") {
            config.gemini.api_key = Some(key);
        }
        if let Some(url) = env_string("RETITLE_GEMINI_BASE_URL") {
            config.gemini.base_url = url;
        }
        if let Some(model) = env_string("RETITLE_GEMINI_MODEL") {
            config.gemini.model = model;
        }
        if let Some(key) = env_string("RETITLE_RESEND_API_KEY") {
            config.resend.api_key = Some(key);
        }
        if let Some(url) = env_string("RETITLE_RESEND_BASE_URL") {
            config.resend.base_url = url;
        }
        if let Some(from) = env_string("RETITLE_FROM_EMAIL") {
            config.resend.from_email = Some(from);
        }

        if let Some(secs) = env_u64("RETITLE_HTTP_TIMEOUT_SECS")? {
            config.http_timeout_secs = Some(secs);
        }
        if let Some(attempts) = env_u32("RETITLE_RETRY_MAX_ATTEMPTS")? {
            config.retry.max_attempts = attempts;
        }
        if let Some(delay) = env_u64("RETITLE_RETRY_BASE_DELAY_MS")? {
            config.retry.base_delay_ms = delay;
        }
        if let Some(delay) = env_u64("RETITLE_RETRY_MAX_DELAY_MS")? {
            config.retry.max_delay_ms = delay;
        }

        Ok(config)
    }

    /// Enforces the required variable set.
    ///
    /// # Errors
    ///
    /// Returns an error naming the missing or inconsistent variable.
    pub fn validate(&self) -> Result<()> {
        if self.youtube.api_key.is_none() {
            return Err(Error::InvalidInput(
                "RETITLE_YOUTUBE_API_KEY is required".to_string(),
            ));
        }
        if self.gemini.api_key.is_none() {
            return Err(Error::InvalidInput(
                "RETITLE_GEMINI_API_KEY is required".to_string(),
            ));
        }
        if self.resend.api_key.is_none() {
            return Err(Error::InvalidInput(
                "RETITLE_RESEND_API_KEY is required".to_string(),
            ));
        }
        if self.resend.from_email.is_none() {
            return Err(Error::InvalidInput(
                "RETITLE_FROM_EMAIL is required".to_string(),
            ));
        }
        if self.store.backend == StoreBackend::Fs && self.store.path.is_none() {
            return Err(Error::InvalidInput(
                "RETITLE_STORE_PATH is required when RETITLE_STORE_BACKEND=fs".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::InvalidInput(
                "RETITLE_RETRY_MAX_ATTEMPTS must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the collaborator request timeout override, if configured.
    #[must_use]
    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_u32(name: &str) -> Result<Option<u32>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u32>()
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("{name} must be a u32: {e}")))
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u64>()
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("{name} must be a u64: {e}")))
}

fn parse_bind_addr(name: &str, value: &str) -> Result<SocketAddr> {
    value.parse::<SocketAddr>().map_err(|e| {
        Error::InvalidInput(format!(
            "{name} must be a socket address like 0.0.0.0:8080: {e}"
        ))
    })
}

fn parse_log_format(name: &str, value: &str) -> Result<LogFormat> {
    match value.trim().to_ascii_lowercase().as_str() {
        "json" => Ok(LogFormat::Json),
        "pretty" => Ok(LogFormat::Pretty),
        _ => Err(Error::InvalidInput(format!(
            "{name} must be one of: json, pretty (got {value})"
        ))),
    }
}

fn parse_store_backend(name: &str, value: &str) -> Result<StoreBackend> {
    match value.trim().to_ascii_lowercase().as_str() {
        "memory" => Ok(StoreBackend::Memory),
        "fs" => Ok(StoreBackend::Fs),
        _ => Err(Error::InvalidInput(format!(
            "{name} must be one of: memory, fs (got {value})"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Config {
        let mut config = Config::default();
        config.youtube.api_key = Some("yt".to_string());
        config.gemini.api_key = Some("gm".to_string());
        config.resend.api_key = Some("rs".to_string());
        config.resend.from_email = Some("titles@retitle.dev".to_string());
        config
    }

    #[test]
    fn parse_log_format_accepts_both_formats() -> Result<()> {
        assert_eq!(parse_log_format("TEST", "json")?, LogFormat::Json);
        assert_eq!(parse_log_format("TEST", "Pretty")?, LogFormat::Pretty);
        Ok(())
    }

    #[test]
    fn parse_log_format_rejects_unknown_value() {
        let err = parse_log_format("TEST", "yaml").unwrap_err();
        let Error::InvalidInput(message) = err else {
            panic!("unexpected error: {err:?}");
        };
        assert!(message.contains("TEST"));
        assert!(message.contains("yaml"));
    }

    #[test]
    fn parse_store_backend_accepts_both_backends() -> Result<()> {
        assert_eq!(parse_store_backend("TEST", "memory")?, StoreBackend::Memory);
        assert_eq!(parse_store_backend("TEST", "FS")?, StoreBackend::Fs);
        Ok(())
    }

    #[test]
    fn parse_bind_addr_rejects_garbage() {
        let err = parse_bind_addr("RETITLE_BIND_ADDR", "eight-thousand").unwrap_err();
        let Error::InvalidInput(message) = err else {
            panic!("unexpected error: {err:?}");
        };
        assert!(message.contains("RETITLE_BIND_ADDR"));
    }

    #[test]
    fn validate_passes_on_complete_config() -> Result<()> {
        configured().validate()
    }

    #[test]
    fn validate_names_each_missing_variable() {
        let cases: [(fn(&mut Config), &str); 4] = [
            (|c| c.youtube.api_key = None, "RETITLE_YOUTUBE_API_KEY"),
            (|c| c.gemini.api_key = None, "RETITLE_GEMINI_API_KEY"),
            (|c| c.resend.api_key = None, "RETITLE_RESEND_API_KEY"),
            (|c| c.resend.from_email = None, "RETITLE_FROM_EMAIL"),
        ];
        for (strip, expected) in cases {
            let mut config = configured();
            strip(&mut config);
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains(expected), "missing {expected}");
        }
    }

    #[test]
    fn validate_requires_path_for_fs_backend() {
        let mut config = configured();
        config.store.backend = StoreBackend::Fs;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("RETITLE_STORE_PATH"));

        config.store.path = Some(PathBuf::from("/var/lib/retitle"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_retry_attempts() {
        let mut config = configured();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_output_redacts_api_keys() {
        let config = configured();
        let dbg = format!("{config:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains("\"yt\""));
        assert!(!dbg.contains("\"gm\""));
        assert!(!dbg.contains("\"rs\""));
    }

    #[test]
    fn retry_config_round_trips_to_policy() {
        let retry = RetryConfig {
            max_attempts: 5,
            base_delay_ms: 50,
            max_delay_ms: 500,
        };
        let policy = retry.policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(50));
        assert_eq!(policy.max_delay, Duration::from_millis(500));
    }
}
