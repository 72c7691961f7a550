//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// A structural rule violated by a candidate race or one of its nested entities.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        ValidationError(message.into())
    }
}

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("{0}")]
    NotFound(String),
    #[error("unknown search criteria: {0}")]
    UnknownCriteria(String),
    #[error("invalid value for search criteria {key}: '{value}'")]
    InvalidCriteria { key: String, value: String },
    /// A subrace id in a write that belongs to another race or repeats within the request.
    #[error("{0}")]
    ForeignSubrace(String),
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("database: {0}")]
    Db(sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = e {
            if db.is_unique_violation() {
                let constraint = db.constraint().unwrap_or("unknown").to_string();
                return RepoError::UniqueViolation(constraint);
            }
        }
        RepoError::Db(e)
    }
}

/// Application-facing error category; decides the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    NotAcceptable,
    DeadlineExceeded,
    Conflict,
    InternalServer,
    Migration,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            ErrorKind::DeadlineExceeded => StatusCode::REQUEST_TIMEOUT,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::InternalServer => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad request",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not found",
            ErrorKind::MethodNotAllowed => "method not allowed",
            ErrorKind::NotAcceptable => "not acceptable",
            ErrorKind::DeadlineExceeded => "deadline exceeded",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InternalServer => "internal server error",
            ErrorKind::Migration => "migration failed",
        }
    }
}

/// Underlying failure wrapped by a [`ServiceError`].
#[derive(Error, Debug)]
pub enum Cause {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<sqlx::Error> for Cause {
    fn from(e: sqlx::Error) -> Self {
        Cause::Repo(RepoError::from(e))
    }
}

/// Two-level error returned by the service: the kind the HTTP layer maps on,
/// a context message, and the wrapped cause when there is one.
#[derive(Debug)]
pub struct ServiceError {
    kind: ErrorKind,
    context: String,
    cause: Option<Cause>,
}

impl ServiceError {
    pub fn new(kind: ErrorKind, context: impl Into<String>) -> Self {
        ServiceError {
            kind,
            context: context.into(),
            cause: None,
        }
    }

    pub fn wrap(kind: ErrorKind, context: impl Into<String>, cause: impl Into<Cause>) -> Self {
        ServiceError {
            kind,
            context: context.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn bad_request(context: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, context)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.cause, Some(Cause::Repo(RepoError::NotFound(_))))
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", self.context, cause),
            None => f.write_str(&self.context),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(|c| c as &(dyn std::error::Error + 'static))
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub status_code: u16,
    pub error: ErrorDetail,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorDetail {
    pub error_code: String,
    pub error_message: String,
}

impl ErrorBody {
    pub fn from_error(err: &ServiceError) -> Self {
        let status = err.kind.status_code();
        ErrorBody {
            status_code: status.as_u16(),
            error: ErrorDetail {
                error_code: status.as_u16().to_string(),
                error_message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();
        if status.is_server_error() {
            tracing::error!(kind = self.kind.as_str(), error = %self, "request failed");
        } else {
            tracing::debug!(kind = self.kind.as_str(), error = %self, "request rejected");
        }
        (status, Json(ErrorBody::from_error(&self))).into_response()
    }
}
