//! HTTP error surface (§6.5, §7 "User-visible"). Response body shape is
//! fixed as `{error, message?, statusCode?, details?}`; this mirrors
//! `rostra-web-ui`'s `UserRequestError`/`RequestError` split between a
//! caller-facing error and an opaque internal one.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use forum_core::Role;
use serde::Serialize;
use snafu::Snafu;

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

/// Every rejection the auth middleware (§4.9) can produce, mapped 1:1 onto
/// §6.5's status/message table.
#[derive(Debug, Snafu)]
pub enum AuthError {
    #[snafu(display("Authentication required"))]
    MissingOrMalformed,
    #[snafu(display("Invalid or expired token"))]
    InvalidOrExpired,
    #[snafu(display("Service temporarily unavailable"))]
    TransportError { source: forum_kv::KvError },
    #[snafu(display("{role:?} access required"))]
    RoleRequired { role: Role },
    NotFound,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::MissingOrMalformed | AuthError::InvalidOrExpired => StatusCode::UNAUTHORIZED,
            AuthError::TransportError { .. } => StatusCode::BAD_GATEWAY,
            AuthError::RoleRequired { .. } => StatusCode::FORBIDDEN,
            AuthError::NotFound => StatusCode::NOT_FOUND,
        };
        let message = self.to_string();
        (
            status,
            Json(ErrorBody {
                error: status.canonical_reason().unwrap_or("error").to_string(),
                message: Some(message),
                status_code: Some(status.as_u16()),
            }),
        )
            .into_response()
    }
}

/// Top-level request error for non-auth handlers: DB/KV failures surface
/// as 502s, everything else as a 500.
#[derive(Debug, Snafu)]
pub enum RequestError {
    #[snafu(transparent)]
    Auth { source: AuthError },
    #[snafu(display("relational store error: {source}"))]
    Store { source: forum_db::DbError },
    #[snafu(display("key-value store error: {source}"))]
    Kv { source: forum_kv::KvError },
    #[snafu(display("{message}"))]
    NotFound { message: String },
}

pub type RequestResult<T> = std::result::Result<T, RequestError>;

impl From<forum_db::DbError> for RequestError {
    fn from(source: forum_db::DbError) -> Self {
        RequestError::Store { source }
    }
}

impl From<forum_kv::KvError> for RequestError {
    fn from(source: forum_kv::KvError) -> Self {
        RequestError::Kv { source }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        tracing::warn!(err = %self, "request error");
        match self {
            RequestError::Auth { source } => source.into_response(),
            RequestError::NotFound { message } => (
                StatusCode::NOT_FOUND,
                Json(ErrorBody {
                    error: "Not found".to_string(),
                    message: Some(message),
                    status_code: Some(404),
                }),
            )
                .into_response(),
            RequestError::Store { .. } | RequestError::Kv { .. } => (
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody {
                    error: "Service temporarily unavailable".to_string(),
                    message: None,
                    status_code: Some(502),
                }),
            )
                .into_response(),
        }
    }
}
