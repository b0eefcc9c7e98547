//! Job submission and status API routes.
//!
//! ## Routes
//!
//! - `POST /jobs` - Submit a title-improvement job
//! - `GET  /jobs/{job_id}` - Get a job record by id

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use retitle_core::JobId;
use retitle_flow::record::{ImprovedTitle, JobRecord, Video};

use crate::context::RequestContext;
use crate::error::{ApiError, ApiErrorBody};
use crate::server::AppState;

/// Request to submit a title-improvement job.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitJobRequest {
    /// Channel handle (`@name`) or channel name to look up.
    pub channel: String,
    /// Address that receives the improved titles.
    pub email: String,
}

/// Accepted-submission response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobResponse {
    /// Id of the accepted job.
    pub job_id: String,
}

/// One video in a job response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoDto {
    /// Platform video id.
    pub video_id: String,
    /// Current title.
    pub title: String,
    /// Watch URL.
    pub url: String,
    /// Publish timestamp.
    pub published_at: DateTime<Utc>,
    /// Default thumbnail URL; empty when the platform offers none.
    pub thumbnail_url: String,
}

/// One improved title, parallel to the video at the same index.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImprovedTitleDto {
    /// The title as fetched from the platform.
    pub original: String,
    /// The improved replacement.
    pub improved: String,
    /// One or two sentences on why the replacement is better.
    pub rationale: String,
    /// Watch URL for the paired video.
    pub url: String,
}

/// Job record response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    /// Job id.
    pub job_id: String,
    /// The channel handle or name as submitted.
    pub channel_query: String,
    /// Submitter address for the result email.
    pub email: String,
    /// Current lifecycle status.
    pub status: String,
    /// Resolved platform channel id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// Resolved channel display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    /// Recent videos, publish-date descending.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub videos: Vec<VideoDto>,
    /// Improved titles, parallel to `videos`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub improved_titles: Vec<ImprovedTitleDto>,
    /// Failure description when the job did not complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Delivery id returned by the mailer for the result email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_id: Option<String>,
    /// Submission timestamp.
    pub created_at: DateTime<Utc>,
    /// Set when the result email was delivered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Video> for VideoDto {
    fn from(video: Video) -> Self {
        Self {
            video_id: video.video_id,
            title: video.title,
            url: video.url,
            published_at: video.published_at,
            thumbnail_url: video.thumbnail_url,
        }
    }
}

impl From<ImprovedTitle> for ImprovedTitleDto {
    fn from(title: ImprovedTitle) -> Self {
        Self {
            original: title.original,
            improved: title.improved,
            rationale: title.rationale,
            url: title.url,
        }
    }
}

impl From<JobRecord> for JobResponse {
    fn from(record: JobRecord) -> Self {
        Self {
            job_id: record.job_id.to_string(),
            channel_query: record.channel_query,
            email: record.email,
            status: record.status.as_label().to_string(),
            channel_id: record.channel_id,
            channel_name: record.channel_name,
            videos: record.videos.into_iter().map(VideoDto::from).collect(),
            improved_titles: record
                .improved_titles
                .into_iter()
                .map(ImprovedTitleDto::from)
                .collect(),
            error: record.error,
            email_id: record.email_id,
            created_at: record.created_at,
            completed_at: record.completed_at,
        }
    }
}

/// Creates job routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs", post(submit_job))
        .route("/jobs/:job_id", get(get_job))
}

/// Submit a title-improvement job.
///
/// POST /api/v1/jobs
#[utoipa::path(
    post,
    path = "/api/v1/jobs",
    tag = "jobs",
    request_body = SubmitJobRequest,
    responses(
        (status = 202, description = "Job accepted", body = SubmitJobResponse),
        (status = 400, description = "Bad request", body = ApiErrorBody),
        (status = 500, description = "Internal error", body = ApiErrorBody),
    )
)]
pub(crate) async fn submit_job(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitJobRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(channel = %req.channel, "Submitting job");

    let job_id = state
        .pipeline
        .submit(&req.channel, &req.email)
        .await
        .map_err(|e| ApiError::from(e).with_request_id(&ctx.request_id))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitJobResponse {
            job_id: job_id.to_string(),
        }),
    ))
}

/// Get a job record by id.
///
/// GET /api/v1/jobs/{job_id}
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{job_id}",
    tag = "jobs",
    params(
        ("job_id" = String, Path, description = "Job id (ULID)")
    ),
    responses(
        (status = 200, description = "Job found", body = JobResponse),
        (status = 400, description = "Malformed job id", body = ApiErrorBody),
        (status = 404, description = "Not found", body = ApiErrorBody),
        (status = 500, description = "Internal error", body = ApiErrorBody),
    )
)]
pub(crate) async fn get_job(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(job_id = %job_id, "Getting job");

    let job_id =
        JobId::from_str(&job_id).map_err(|e| ApiError::from(e).with_request_id(&ctx.request_id))?;

    let record = state
        .pipeline
        .job(&job_id)
        .await
        .map_err(|e| ApiError::from(e).with_request_id(&ctx.request_id))?
        .ok_or_else(|| {
            ApiError::not_found(format!("Job not found: {job_id}"))
                .with_request_id(&ctx.request_id)
        })?;

    Ok(Json(JobResponse::from(record)))
}
