//! `OpenAPI` (3.1) specification generation for `retitle-api`.
//!
//! The generated spec backs `/openapi.json` and the `gen-openapi` binary used
//! to produce external clients.

use utoipa::OpenApi;

/// `OpenAPI` documentation for the retitle REST API (`/api/v1/*`).
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Retitle API",
        description = "YouTube title-improvement pipeline REST API"
    ),
    paths(
        crate::routes::jobs::submit_job,
        crate::routes::jobs::get_job,
    ),
    components(
        schemas(
            crate::error::ApiErrorBody,
            crate::routes::jobs::SubmitJobRequest,
            crate::routes::jobs::SubmitJobResponse,
            crate::routes::jobs::JobResponse,
            crate::routes::jobs::VideoDto,
            crate::routes::jobs::ImprovedTitleDto,
        )
    ),
    tags(
        (name = "jobs", description = "Job submission and status"),
    ),
)]
pub struct ApiDoc;

/// Returns the generated `OpenAPI` spec.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Returns the generated `OpenAPI` spec serialized as pretty JSON.
///
/// # Errors
///
/// Returns an error if JSON serialization fails (should not happen).
pub fn openapi_json() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_lists_the_job_routes() {
        let json = openapi_json().expect("serialize spec");
        assert!(json.contains("/api/v1/jobs"));
        assert!(json.contains("/api/v1/jobs/{job_id}"));
        assert!(json.contains("SubmitJobRequest"));
        assert!(json.contains("JobResponse"));
    }
}
