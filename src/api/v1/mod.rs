//! Versioned feedback API

pub mod feedback;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/feedback", post(feedback::create_feedback))
        .route(
            "/feedback/{feedback_id}",
            get(feedback::get_feedback).patch(feedback::update_feedback),
        )
        .route(
            "/attempts/{attempt_id}/feedback",
            get(feedback::list_attempt_feedback),
        )
}
