use axum::{extract::State, routing::post, Json, Router};

use crate::error::AppError;
use crate::models::chat::{ChatRequest, ChatResponse};
use crate::models::records::UsageSource;
use crate::orchestration::pipeline::TurnStatus;
use crate::routes::AppStateArc;

pub fn chat_routes() -> Router<AppStateArc> {
    Router::new().route("/chat", post(chat))
}

async fn chat(
    State(state): State<AppStateArc>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if req.message.trim().is_empty() {
        return Err(AppError::InvalidArgument("message must not be empty".to_string()));
    }

    let outcome = state
        .pipeline
        .run_turn(&req.message, &req.history, UsageSource::Api)
        .await;

    if outcome.status == TurnStatus::Failed {
        let detail = outcome
            .error
            .unwrap_or_else(|| "the assistant failed to answer".to_string());
        return Err(AppError::Message(detail));
    }

    Ok(Json(outcome.to_chat_response()))
}
