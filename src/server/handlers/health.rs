use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.pipeline.store();
    Json(json!({
        "status": "ok",
        "records": store.len(),
        "dimension": store.dimension(),
        "provider": state.pipeline.provider_name(),
        "slack_enabled": state.slack.is_some(),
    }))
}
