use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    code: &'static str,
    detail: String,
}

/// Engine failures the front end must tell apart: "time's up" renders
/// differently from "not your test", so none of these collapse into a
/// generic error.
#[derive(Debug, Error)]
pub(crate) enum EngineError {
    #[error("{0}")]
    NotAuthorized(&'static str),
    #[error("attempt is already completed")]
    AlreadyCompleted,
    #[error("attempt is closed")]
    AttemptClosed,
    #[error("time budget exceeded")]
    TimeExpired,
    #[error("{0}")]
    InvalidAnswerShape(String),
    #[error("test pool has {actual} questions but declares {declared}")]
    InsufficientQuestionPool { declared: i32, actual: usize },
    #[error("{0}")]
    OverrideRejected(String),
}

impl EngineError {
    fn status(&self) -> StatusCode {
        match self {
            EngineError::NotAuthorized(_) | EngineError::TimeExpired => StatusCode::FORBIDDEN,
            EngineError::AlreadyCompleted | EngineError::AttemptClosed => StatusCode::CONFLICT,
            EngineError::InvalidAnswerShape(_) | EngineError::OverrideRejected(_) => {
                StatusCode::BAD_REQUEST
            }
            EngineError::InsufficientQuestionPool { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            EngineError::NotAuthorized(_) => "not_authorized",
            EngineError::AlreadyCompleted => "already_completed",
            EngineError::AttemptClosed => "attempt_closed",
            EngineError::TimeExpired => "time_expired",
            EngineError::InvalidAnswerShape(_) => "invalid_answer_shape",
            EngineError::InsufficientQuestionPool { .. } => "insufficient_question_pool",
            EngineError::OverrideRejected(_) => "override_rejected",
        }
    }
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    ServiceUnavailable(String),
    Internal(String),
    Engine(EngineError),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, detail) = match self {
            ApiError::Unauthorized(message) => {
                let status = StatusCode::UNAUTHORIZED;
                let mut response = (
                    status,
                    Json(ErrorResponse {
                        status: status.as_u16(),
                        code: "unauthorized",
                        detail: message.to_string(),
                    }),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                return response;
            }
            ApiError::Forbidden(message) => {
                (StatusCode::FORBIDDEN, "forbidden", message.to_string())
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "bad_request", message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message),
            ApiError::ServiceUnavailable(message) => {
                tracing::error!(error = %message, "Service unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", message)
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
            ApiError::Engine(err) => (err.status(), err.code(), err.to_string()),
        };

        (status, Json(ErrorResponse { status: status.as_u16(), code, detail })).into_response()
    }
}
