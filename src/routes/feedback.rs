use axum::{extract::State, routing::post, Json, Router};
use tracing::info;

use crate::error::AppError;
use crate::models::common::SuccessResponse;
use crate::models::records::{FeedbackRecord, FeedbackRequest};
use crate::routes::AppStateArc;

pub fn feedback_routes() -> Router<AppStateArc> {
    Router::new().route("/feedback", post(submit_feedback))
}

async fn submit_feedback(
    State(state): State<AppStateArc>,
    Json(req): Json<FeedbackRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    if req.message_id.trim().is_empty() {
        return Err(AppError::InvalidArgument("message_id must not be empty".to_string()));
    }

    let record = FeedbackRecord::from_request(req);
    info!(message_id = %record.message_id, rating = record.rating.as_str(), "feedback received");

    let store = state.store.clone();
    tokio::task::spawn_blocking(move || store.feedback_insert(&record))
        .await
        .map_err(|e| AppError::Store(e.to_string()))??;

    Ok(Json(SuccessResponse::with_message("Feedback recorded")))
}
