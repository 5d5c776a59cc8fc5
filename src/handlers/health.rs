use axum::{Json, extract::State, response::IntoResponse};
use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::state::AppState;

pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let window = state.ticker_window().unwrap_or_default();
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "rate_limit": state.limiter.limit(),
        "window_scheme": state.limiter.scheme(),
        "window": {
            "id": window.window_id,
            "count": window.count,
        },
        "ticks_run": state.ticks_run.load(Ordering::Relaxed),
        "ticks_suppressed": state.ticks_suppressed.load(Ordering::Relaxed),
    }))
}
