//! Feedback endpoint handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use tracing::debug;

use crate::api::middleware::RequestId;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::{AiFeedback, FeedbackPatch, FeedbackRequest};

/// Feedback generated for one attempt, newest first
#[derive(Debug, Serialize)]
pub struct AttemptFeedbackResponse {
    pub feedback: Vec<AiFeedback>,
    pub total: usize,
}

/// POST /v1/feedback
pub async fn create_feedback(
    State(state): State<AppState>,
    request_id: RequestId,
    Json(request): Json<FeedbackRequest>,
) -> Result<(StatusCode, Json<AiFeedback>), ApiError> {
    debug!(attempt_id = %request.attempt_id, request_id = %request_id.as_str(), "Generating feedback");

    let feedback = state
        .feedback_service
        .generate(&request)
        .await
        .map_err(|e| request_id.error(e))?;

    Ok((StatusCode::CREATED, Json(feedback)))
}

/// GET /v1/feedback/{feedback_id}
pub async fn get_feedback(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(feedback_id): Path<String>,
) -> Result<Json<AiFeedback>, ApiError> {
    debug!(feedback_id = %feedback_id, "Getting feedback");

    let feedback = state
        .feedback_service
        .get(&feedback_id)
        .await
        .map_err(|e| request_id.error(e))?
        .ok_or_else(|| {
            ApiError::not_found(format!("Feedback '{}' not found", feedback_id))
                .with_request_id(request_id.as_str())
        })?;

    Ok(Json(feedback))
}

/// PATCH /v1/feedback/{feedback_id}
pub async fn update_feedback(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(feedback_id): Path<String>,
    Json(patch): Json<FeedbackPatch>,
) -> Result<Json<AiFeedback>, ApiError> {
    debug!(feedback_id = %feedback_id, "Updating feedback");

    state
        .feedback_service
        .update(&feedback_id, &patch)
        .await
        .map_err(|e| request_id.error(e))?;

    let feedback = state
        .feedback_service
        .get(&feedback_id)
        .await
        .map_err(|e| request_id.error(e))?
        .ok_or_else(|| {
            ApiError::not_found(format!("Feedback '{}' not found", feedback_id))
                .with_request_id(request_id.as_str())
        })?;

    Ok(Json(feedback))
}

/// GET /v1/attempts/{attempt_id}/feedback
pub async fn list_attempt_feedback(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(attempt_id): Path<String>,
) -> Result<Json<AttemptFeedbackResponse>, ApiError> {
    debug!(attempt_id = %attempt_id, "Listing feedback for attempt");

    let feedback = state
        .feedback_service
        .get_by_attempt(&attempt_id)
        .await
        .map_err(|e| request_id.error(e))?;
    let total = feedback.len();

    Ok(Json(AttemptFeedbackResponse { feedback, total }))
}
