//! Match analysis and submission handlers.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use scorecard_core::processing::is_accepted_image_type;
use scorecard_core::{
    AnalysisReport, Credentials, FailureKind, ImageUpload, MatchResult, OutcomeStatus,
    ProcessingError, SubmissionOutcome, VisionError,
};

use crate::metrics::IMAGE_UPLOAD_BYTES;
use crate::state::AppState;

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

// =============================================================================
// Analyze
// =============================================================================

/// POST /api/v1/matches/analyze
///
/// Accepts a multipart form with an `image` field holding the scorecard.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisReport>, ApiError> {
    let mut upload: Option<ImageUpload> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return Err(api_error(
                    StatusCode::BAD_REQUEST,
                    format!("Invalid multipart body: {}", e),
                ))
            }
        };

        if field.name() != Some("image") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("scorecard").to_string();
        let content_type = field.content_type().unwrap_or("").to_string();

        if !is_accepted_image_type(&content_type) {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                format!(
                    "Unsupported image type '{}', expected JPEG, PNG or GIF",
                    content_type
                ),
            ));
        }

        let bytes = field.bytes().await.map_err(|e| {
            api_error(
                StatusCode::BAD_REQUEST,
                format!("Failed to read image: {}", e),
            )
        })?;

        upload = Some(ImageUpload::new(bytes.to_vec(), file_name, content_type));
        break;
    }

    let upload = upload.ok_or_else(|| {
        api_error(StatusCode::BAD_REQUEST, "Missing 'image' field in upload")
    })?;

    if upload.bytes.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Uploaded image is empty"));
    }

    IMAGE_UPLOAD_BYTES
        .with_label_values(&[&upload.content_type])
        .observe(upload.bytes.len() as f64);

    info!(
        file_name = %upload.file_name,
        size = upload.bytes.len(),
        "Received scorecard for analysis"
    );

    state
        .service()
        .analyze(upload)
        .await
        .map(Json)
        .map_err(analysis_error)
}

fn analysis_error(err: ProcessingError) -> ApiError {
    let status = match &err {
        ProcessingError::Analysis(VisionError::UnreadableImage(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ProcessingError::Analysis(VisionError::InvalidResponse(_)) => StatusCode::BAD_GATEWAY,
        ProcessingError::Analysis(VisionError::ServiceUnavailable(_))
        | ProcessingError::Analysis(VisionError::Timeout(_))
        | ProcessingError::Analysis(VisionError::NotConfigured) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ProcessingError::LeagueSite(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, err.to_string())
}

// =============================================================================
// Submit
// =============================================================================

/// Body of a submission request.
#[derive(Debug, Deserialize)]
pub struct SubmitMatchRequest {
    pub match_result: MatchResult,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Defaults to the configured league.
    #[serde(default)]
    pub league_id: Option<String>,
}

/// POST /api/v1/matches/submit
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitMatchRequest>,
) -> Result<(StatusCode, Json<SubmissionOutcome>), ApiError> {
    let credentials = Credentials::new(body.username, body.password);
    if !credentials.is_complete() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Username and password are required",
        ));
    }

    info!(
        fixture = %body.match_result.fixture_label(),
        has_image = body.match_result.image.is_some(),
        "Submitting match result"
    );

    let cancel = state.shutdown_token().child_token();
    let outcome = state
        .service()
        .submit(body.match_result, credentials, body.league_id, &cancel)
        .await;

    let status = outcome_status_code(&outcome);
    if !status.is_success() {
        warn!(
            submission_id = %outcome.submission_id,
            status = outcome.status.as_str(),
            reason = outcome.reason.as_deref().unwrap_or(""),
            "Submission did not record the result"
        );
    }

    Ok((status, Json(outcome)))
}

/// HTTP status for a submission outcome.
///
/// A run cancelled after the site accepted the result still reports 200.
pub fn outcome_status_code(outcome: &SubmissionOutcome) -> StatusCode {
    match outcome.status {
        OutcomeStatus::Success | OutcomeStatus::PartialSuccess => StatusCode::OK,
        OutcomeStatus::Cancelled if outcome.result_recorded() => StatusCode::OK,
        OutcomeStatus::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        OutcomeStatus::Failed => match outcome.failure_kind {
            Some(FailureKind::InvalidInput) => StatusCode::BAD_REQUEST,
            Some(FailureKind::AuthenticationFailure) => StatusCode::UNAUTHORIZED,
            Some(FailureKind::PreconditionFailed) | Some(FailureKind::Rejected) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Some(FailureKind::TransientExternalFailure) | None => StatusCode::BAD_GATEWAY,
        },
    }
}
