use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use asset_graph::GraphError;

/// Request-level failures. Bodies are `{"detail": "<message>"}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The graph client was never constructed (missing credentials, unreachable store).
    #[error("Graph service not initialized. Check Neo4j connection.")]
    NotInitialized,

    /// A well-formed body with a value the service cannot use.
    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    Internal(String),
}

/// Anything the graph raises while serving a request is request-fatal.
impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotInitialized => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(ApiError::NotInitialized.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ApiError::Invalid("x".into()).status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ApiError::Internal("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn graph_errors_are_internal() {
        let err = ApiError::from(GraphError::Driver("connection reset".into()));
        assert!(matches!(err, ApiError::Internal(ref m) if m == "Driver error: connection reset"));

        let err = ApiError::from(GraphError::Validation("constraint violated".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
