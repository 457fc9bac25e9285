//! Error model for streamgate.
//! Library layers return typed `thiserror` enums (`PasswordError`, `StoreError`,
//! `DirectoryError`); the HTTP frontends collapse them into `AppError`, which carries
//! a stable `code`, a caller-safe `message`, and an HTTP status mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;

use crate::passwords::PasswordError;
use crate::storage::StoreError;

/// Rejected input for a directory operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("username must be between 3 and 32 characters long")]
    UsernameLength,
    #[error("password must be at least 8 characters long")]
    PasswordLength,
    #[error("namespace name must be non-empty and must not contain '/'")]
    NamespaceName,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("user already exists: {0}")]
    UserAlreadyExists(String),
    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),
    #[error("namespace already exists: {0}")]
    NamespaceAlreadyExists(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("wrong password")]
    WrongPassword,
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
    #[error("password hashing failure: {0}")]
    Password(#[from] PasswordError),
    /// The configured session lifetime cannot produce a valid expiration.
    #[error("session lifetime out of range")]
    SessionLifetime,
}

impl DirectoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DirectoryError::UserNotFound(_) | DirectoryError::NamespaceNotFound(_))
    }

    /// Failures unrelated to business rules: storage, IO, hashing.
    pub fn is_internal(&self) -> bool {
        matches!(self, DirectoryError::Store(_) | DirectoryError::Password(_) | DirectoryError::SessionLifetime)
    }
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    Auth { code: String, message: String },
    Forbidden { code: String, message: String },
    NotFound { code: String, message: String },
    Conflict { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Forbidden { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Forbidden { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn auth<S: Into<String>>(code: S, msg: S) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn forbidden<S: Into<String>>(code: S, msg: S) -> Self { AppError::Forbidden { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn conflict<S: Into<String>>(code: S, msg: S) -> Self { AppError::Conflict { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// The opaque rejection used wherever the caller must not learn which check failed.
    pub fn unauthorized() -> Self { AppError::auth("unauthorized", "unauthorized") }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::Auth { .. } => 401,
            AppError::Forbidden { .. } => 403,
            AppError::NotFound { .. } => 404,
            AppError::Conflict { .. } => 409,
            AppError::Internal { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match &err {
            DirectoryError::UserNotFound(_) => AppError::not_found("user_not_found", "user not found"),
            DirectoryError::NamespaceNotFound(_) => AppError::not_found("namespace_not_found", "namespace not found"),
            DirectoryError::UserAlreadyExists(_) => AppError::conflict("user_exists", "user already exists"),
            DirectoryError::NamespaceAlreadyExists(_) => AppError::conflict("namespace_exists", "namespace already exists"),
            DirectoryError::Validation(v) => AppError::UserInput { code: "validation".into(), message: v.to_string() },
            DirectoryError::WrongPassword => AppError::unauthorized(),
            DirectoryError::Store(_) | DirectoryError::Password(_) | DirectoryError::SessionLifetime => {
                tracing::error!(target: "streamgate::error", error = %err, "internal failure");
                AppError::internal("internal", "internal server error")
            }
        }
    }
}

/// Unreadable or mistyped request bodies get the same JSON error shape as every other failure.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::UserInput { code: "invalid_body".into(), message: rejection.body_text() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(serde_json::json!({"status": "error", "code": self.code_str(), "error": self.message()}))).into_response()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
