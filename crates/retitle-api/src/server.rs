//! API server implementation.
//!
//! Provides health, ready, and API endpoints for the retitle pipeline.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use retitle_core::JobId;
use retitle_flow::bus::InMemoryEventBus;
use retitle_flow::collaborators::{GeminiClient, ResendClient, YouTubeClient};
use retitle_flow::error::Result;
use retitle_flow::pipeline::{Collaborators, Pipeline};
use retitle_flow::store::{FsJobStore, InMemoryJobStore, JobStore};

use crate::config::{Config, StoreBackend, StoreConfig};
use crate::error::ApiError;

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ReadyResponse {
    /// Service readiness status.
    pub ready: bool,
    /// Optional message about readiness state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Shared application state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// The wired pipeline; submissions and record reads go through it.
    pub pipeline: Pipeline,
    /// Job store, probed directly by the readiness check.
    store: Arc<dyn JobStore>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("pipeline", &"<Pipeline>")
            .field("store", &"<JobStore>")
            .finish()
    }
}

impl AppState {
    /// Builds the store and collaborators the configuration selects and
    /// wires the pipeline onto a fresh in-process bus.
    ///
    /// # Errors
    ///
    /// Returns an error if the store configuration is incomplete or stage
    /// subscription fails.
    pub fn from_config(config: Config) -> Result<Self> {
        let store = build_store(&config.store)?;
        let bus = Arc::new(InMemoryEventBus::new());
        let collaborators = build_collaborators(&config)?;
        let pipeline = Pipeline::new(
            Arc::clone(&store),
            bus,
            collaborators,
            config.retry.policy(),
        )?;
        Ok(Self {
            config,
            pipeline,
            store,
        })
    }
}

fn build_store(config: &StoreConfig) -> Result<Arc<dyn JobStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemoryJobStore::new())),
        StoreBackend::Fs => {
            let path = config.path.as_ref().ok_or_else(|| {
                retitle_core::Error::InvalidInput(
                    "RETITLE_STORE_PATH is required when RETITLE_STORE_BACKEND=fs".to_string(),
                )
            })?;
            Ok(Arc::new(FsJobStore::new(path.clone())))
        }
    }
}

// Missing keys become empty strings here; Config::validate rejects them
// before serve, so they only occur in test routers that never reach a
// collaborator.
fn build_collaborators(config: &Config) -> Result<Collaborators> {
    let mut youtube = YouTubeClient::new(
        config.youtube.base_url.clone(),
        config.youtube.api_key.clone().unwrap_or_default(),
    )?;
    let mut gemini = GeminiClient::new(
        config.gemini.base_url.clone(),
        config.gemini.api_key.clone().unwrap_or_default(),
    )?
    .with_model(config.gemini.model.clone());
    let mut resend = ResendClient::new(
        config.resend.base_url.clone(),
        config.resend.api_key.clone().unwrap_or_default(),
        config.resend.from_email.clone().unwrap_or_default(),
    )?;

    if let Some(timeout) = config.http_timeout() {
        youtube = youtube.with_timeout(timeout)?;
        gemini = gemini.with_timeout(timeout)?;
        resend = resend.with_timeout(timeout)?;
    }

    Ok(Collaborators {
        platform: Arc::new(youtube),
        generator: Arc::new(gemini),
        mailer: Arc::new(resend),
    })
}

/// Health check endpoint handler.
///
/// Returns 200 OK if the service is alive. This is a shallow check
/// that doesn't verify dependencies.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness check endpoint handler.
///
/// Returns 200 OK if the service is ready to accept requests.
/// Checks that the job store answers reads.
async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    // Probe with a fresh id: a healthy backend answers `None` without error.
    match state.store.get(&JobId::generate()).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                message: None,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                ready: false,
                message: Some(format!("store check failed: {e}")),
            }),
        ),
    }
}

/// Serves the generated `OpenAPI` spec as JSON.
async fn serve_openapi() -> std::result::Result<impl IntoResponse, ApiError> {
    let json = crate::openapi::openapi_json()
        .map_err(|e| ApiError::internal(format!("failed to serialize OpenAPI spec: {e}")))?;
    Ok(([(header::CONTENT_TYPE, "application/json")], json))
}

/// The retitle API server.
#[derive(Debug)]
pub struct Server {
    config: Config,
}

impl Server {
    /// Creates a new server with the given configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates the router with all routes and middleware.
    fn create_router(&self) -> Result<Router> {
        let state = Arc::new(AppState::from_config(self.config.clone())?);

        let request_id_layer = middleware::from_fn(crate::context::request_id_middleware);
        let metrics_layer = middleware::from_fn(crate::metrics::metrics_middleware);

        Ok(Router::new()
            .route("/health", get(health))
            .route("/ready", get(ready))
            .route("/metrics", get(crate::metrics::serve_metrics))
            .route("/openapi.json", get(serve_openapi))
            .nest("/api/v1", crate::routes::api_v1_routes())
            // Middleware (order matters): metrics outermost for timing, then
            // trace, then the request-id span.
            .layer(request_id_layer)
            .layer(TraceLayer::new_for_http())
            .layer(metrics_layer)
            .with_state(state))
    }

    /// Starts the server and blocks until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the server cannot
    /// bind to the configured address.
    pub async fn serve(&self) -> Result<()> {
        self.config.validate()?;

        // Initialize metrics before starting the server
        crate::metrics::init_metrics();
        retitle_flow::metrics::register_metrics();

        let addr = self.config.bind_addr;
        let router = self.create_router()?;

        tracing::info!(addr = %addr, "Starting retitle API server");

        let listener =
            tokio::net::TcpListener::bind(addr)
                .await
                .map_err(|e| retitle_core::Error::Internal {
                    message: format!("failed to bind to {addr}: {e}"),
                })?;

        axum::serve(listener, router)
            .await
            .map_err(|e| retitle_core::Error::Internal {
                message: format!("server error: {e}"),
            })?;

        Ok(())
    }

    /// Creates a test router for the server.
    ///
    /// This is useful for integration tests where you want to test
    /// the routes without actually binding to a port.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be wired into a pipeline.
    #[doc(hidden)]
    pub fn test_router(&self) -> Result<Router> {
        self.create_router()
    }
}
