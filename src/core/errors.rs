use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Errors raised by the retrieval pipeline and its collaborators.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("tokenization failed: {0}")]
    Tokenization(String),
    #[error("embedding provider error: {0}")]
    EmbeddingProvider(String),
    #[error("malformed embedding store at line {line}: {message}")]
    StoreFormat { line: usize, message: String },
    #[error("malformed source records at line {line}: {message}")]
    RecordFormat { line: usize, message: String },
    #[error("degenerate vector: {0}")]
    DegenerateVector(String),
    #[error("completion provider error: {0}")]
    CompletionProvider(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("query is empty")]
    EmptyQuery,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    pub fn tokenization<E: std::fmt::Display>(err: E) -> Self {
        RagError::Tokenization(err.to_string())
    }

    pub fn store_format(line: usize, message: impl Into<String>) -> Self {
        RagError::StoreFormat {
            line,
            message: message.into(),
        }
    }

    pub fn record_format(line: usize, message: impl Into<String>) -> Self {
        RagError::RecordFormat {
            line,
            message: message.into(),
        }
    }
}

/// Errors surfaced by the HTTP layer.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("service unavailable")]
    ServiceUnavailable,
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service unavailable".to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_map_to_status_codes() {
        assert_eq!(
            ApiError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::ServiceUnavailable.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::BadRequest("invalid event payload".into())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn store_format_message_carries_line() {
        let err = RagError::store_format(7, "non-numeric component 'abc'");
        assert_eq!(
            err.to_string(),
            "malformed embedding store at line 7: non-numeric component 'abc'"
        );
    }
}
