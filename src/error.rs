/*
 * Responsibility
 * - アプリ共通の AppError 定義 (IntoResponse: HTTP status / JSON error body)
 * - 起動時に致命となる StartupError (schema conflict / ambiguous route rule)
 * - RepoError / SchemaViolation の統一的な変換
 */
use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::repos::catalog::RepoError;
use crate::services::schema::SchemaViolation;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

/// Fatal configuration errors. The server must never start serving traffic
/// after one of these.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("extension field '{field}' conflicts with a required base search field")]
    SchemaConflict { field: &'static str },

    #[error("ambiguous route authorization rules for {method} {path}")]
    AmbiguousRouteRule { path: String, method: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{code}: {message}")]
    BadRequest { code: &'static str, message: String },

    #[error("unauthorized")]
    Unauthorized,

    #[error("not found: {resource}")]
    NotFound { resource: &'static str },

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // 401 carries the challenge and a deliberately generic message; the
        // response never reveals which credential check failed.
        if matches!(self, AppError::Unauthorized) {
            let body = ErrorResponse {
                error: ErrorBody {
                    code: "UNAUTHORIZED",
                    message: "could not validate credentials".into(),
                },
            };
            return (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                Json(body),
            )
                .into_response();
        }

        let (status, code, message) = match self {
            AppError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            AppError::NotFound { resource } => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{resource} not found."),
            ),
            AppError::Conflict { message } => (StatusCode::CONFLICT, "CONFLICT", message),
            AppError::Unauthorized => unreachable!(),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "internal server error".into(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::CollectionNotFound(_) => AppError::not_found("collection"),
            RepoError::ItemNotFound(_) => AppError::not_found("item"),
            RepoError::Conflict(message) => AppError::Conflict { message },
            RepoError::InvalidDocument(message) => {
                AppError::bad_request("INVALID_DOCUMENT", message)
            }
        }
    }
}

impl From<SchemaViolation> for AppError {
    fn from(e: SchemaViolation) -> Self {
        AppError::bad_request("INVALID_SEARCH_REQUEST", e.to_string())
    }
}
