use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;
use ultra_finance::PipelineError;

pub const NO_STATE_MESSAGE: &str = "No budget state found. Open the app and make sure you are logged in.";

/// Every failure a handler can return. Bodies are always `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Rate limit exceeded. Try again in a minute.")]
    RateLimited { retry_after_secs: u64 },
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    /// A required key is not configured; raised before any upstream call
    #[error("Server configuration error: {0}")]
    Config(String),
    /// Upstream or storage failure; the client only sees `message`
    #[error("{message}")]
    Upstream {
        message: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Config(_) | ApiError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn upstream(message: &'static str) -> impl FnOnce(anyhow::Error) -> ApiError {
        move |source| ApiError::Upstream { message, source }
    }

    /// Missing state is a 404; anything else is an upstream failure.
    pub fn pipeline(message: &'static str) -> impl FnOnce(PipelineError) -> ApiError {
        move |err| match err {
            PipelineError::NoState => ApiError::NotFound(NO_STATE_MESSAGE.to_string()),
            PipelineError::State(e) => ApiError::Upstream {
                message,
                source: e.into(),
            },
            PipelineError::Upstream(source) => ApiError::Upstream { message, source },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Upstream { message, source } => error!("{message}: {source:#}"),
            ApiError::Config(what) => error!("configuration error: {what}"),
            _ => {}
        }

        let body = Json(json!({ "error": self.to_string() }));
        match self {
            ApiError::RateLimited { retry_after_secs } => (
                status,
                [(header::RETRY_AFTER, retry_after_secs.to_string())],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
