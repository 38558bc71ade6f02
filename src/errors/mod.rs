//! Error taxonomy.
//!
//! Every failure that leaves the gate is a [`ClassifiedError`]: a fixed
//! [`ErrorKind`], a client-safe message, and optional field details.
//! Components that already know the kind (authentication, admission,
//! input checks) build one directly. Storage and business faults are
//! reported as a [`Failure`] and mapped by [`ErrorClassifier`].
//!
//! # Data Flow
//! ```text
//! handler → Err(HandlerError::Classified) ─────────────────────→ envelope
//! handler → Err(HandlerError::Failure) → classify_failures → classify() → envelope
//! handler panics → catch_panic → Internal envelope
//! ```

pub mod classify;

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::http::response::ApiResponse;

pub use classify::{classify_failures, panic_response, ErrorClassifier, Failure, HandlerError};

/// Field name → message.
pub type FieldErrors = BTreeMap<String, String>;

/// Structured detail attached to validation-style failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorDetails {
    /// One message per offending field.
    Fields(FieldErrors),
    /// Required fields that were absent or blank.
    Missing { missing: Vec<String> },
}

impl ErrorDetails {
    /// Number of offending fields.
    pub fn len(&self) -> usize {
        match self {
            ErrorDetails::Fields(fields) => fields.len(),
            ErrorDetails::Missing { missing } => missing.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The fixed set of failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unauthorized,
    NotFound,
    MethodNotAllowed,
    RateLimited,
    ValidationFailed,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub const fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NotFound => "not_found",
            ErrorKind::MethodNotAllowed => "method_not_allowed",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        }
    }
}

pub const NO_TOKEN: &str = "No token provided";
pub const INVALID_TOKEN: &str = "Invalid or expired token";
pub const TOO_MANY_REQUESTS: &str = "Too many requests. Please try again later.";
pub const DUPLICATE_ENTRY: &str = "Duplicate entry found";
pub const VALIDATION_FAILED: &str = "Validation failed";
pub const INTERNAL: &str = "Internal server error";
pub const NOT_FOUND: &str = "Resource not found";
pub const METHOD_NOT_ALLOWED: &str = "Method not allowed";

/// A normalized, client-safe failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    pub details: Option<ErrorDetails>,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(ErrorKind::MethodNotAllowed, METHOD_NOT_ALLOWED)
    }

    pub fn rate_limited() -> Self {
        Self::new(ErrorKind::RateLimited, TOO_MANY_REQUESTS)
    }

    pub fn validation(details: ErrorDetails) -> Self {
        Self {
            kind: ErrorKind::ValidationFailed,
            message: VALIDATION_FAILED.to_string(),
            details: Some(details),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }
}

impl IntoResponse for ClassifiedError {
    fn into_response(self) -> Response {
        ApiResponse::failure(self.message, self.kind.status_code(), self.details).into_response()
    }
}
