use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::server::handlers::{health, slack};
use crate::state::AppState;

/// Creates the application router: health check and the Slack Events API
/// callback, traced per request.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/slack/events", post(slack::slack_events))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
