use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use streamchat_model::{ErrorKind, ModelProviderError};
use streamchat_openai_model::Error as UpstreamError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Everything the chat route can answer with instead of a stream.
#[derive(Debug)]
pub enum AppError {
    /// The request body is not a usable conversation.
    BadRequest(String),
    /// The upstream answered with a non-success status.
    Upstream { status: StatusCode, message: String },
    /// The upstream could not be reached, or did not answer with a stream.
    BadGateway(String),
}

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        match (err.kind(), err.status()) {
            (ErrorKind::Provider, Some(status)) => AppError::Upstream {
                status,
                message: err.message().to_owned(),
            },
            _ => AppError::BadGateway(err.message().to_owned()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Upstream { status, message } => (status, message),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
