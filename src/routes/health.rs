use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::routes::AppStateArc;

pub fn health_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
}

async fn index() -> Json<Value> {
    Json(json!({
        "name": "care-agent",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /health",
            "chat": "POST /chat",
            "feedback": "POST /feedback",
            "sms": "POST /sms"
        }
    }))
}

async fn health(State(state): State<AppStateArc>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_secs": state.started_at.elapsed().as_secs()
    }))
}
