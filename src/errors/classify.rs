//! Failure classification.
//!
//! Storage and business collaborators report faults as a [`Failure`].
//! Handlers return them inside a [`HandlerError`]; the response carries the
//! failure in its extensions until [`classify_failures`] maps it, because
//! only the middleware knows the deployment mode.

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::config::Environment;
use crate::errors::{
    ClassifiedError, ErrorDetails, ErrorKind, FieldErrors, DUPLICATE_ENTRY, INTERNAL,
};
use crate::observability::metrics;

/// A fault raised by a storage or business collaborator.
#[derive(Debug, Error)]
pub enum Failure {
    /// A uniqueness constraint was violated.
    #[error("duplicate key: {key}")]
    DuplicateKey { key: String },

    /// The storage layer rejected one or more field values.
    #[error("field validation rejected {} field(s)", .0.len())]
    FieldValidation(FieldErrors),

    /// Anything else.
    #[error(transparent)]
    Unexpected(Box<dyn std::error::Error + Send + Sync>),
}

impl Failure {
    pub fn unexpected(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Failure::Unexpected(err.into())
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        HandlerError::Failure(self).into_response()
    }
}

/// Error type returned by request handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler already knows the kind.
    #[error(transparent)]
    Classified(#[from] ClassifiedError),

    /// A collaborator fault, classified on the way out.
    #[error(transparent)]
    Failure(#[from] Failure),
}

/// Response extension carrying a failure that still needs classification.
#[derive(Debug, Clone)]
struct UnclassifiedFailure(Arc<Failure>);

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match self {
            HandlerError::Classified(err) => err.into_response(),
            HandlerError::Failure(failure) => {
                // Sent as is when no classifier is installed.
                let mut response = ClassifiedError::internal(INTERNAL).into_response();
                response
                    .extensions_mut()
                    .insert(UnclassifiedFailure(Arc::new(failure)));
                response
            }
        }
    }
}

/// Maps failures onto the taxonomy.
#[derive(Debug, Clone, Copy)]
pub struct ErrorClassifier {
    environment: Environment,
}

impl ErrorClassifier {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    /// Classify a failure. Checked in order: duplicate key, field validation,
    /// everything else. The original failure is always logged in full.
    pub fn classify(&self, failure: &Failure) -> ClassifiedError {
        tracing::error!(error = %failure, detail = ?failure, "Request failed");

        let classified = match failure {
            Failure::DuplicateKey { .. } => ClassifiedError::conflict(DUPLICATE_ENTRY),
            Failure::FieldValidation(fields) => {
                ClassifiedError::validation(ErrorDetails::Fields(fields.clone()))
            }
            Failure::Unexpected(err) => {
                if self.environment.is_development() {
                    ClassifiedError::internal(err.to_string())
                } else {
                    ClassifiedError::internal(INTERNAL)
                }
            }
        };

        metrics::record_error(classified.kind);
        classified
    }
}

/// Middleware that rewrites responses carrying an unclassified failure.
pub async fn classify_failures(
    State(classifier): State<ErrorClassifier>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let mut response = next.run(request).await;

    let Some(UnclassifiedFailure(failure)) = response.extensions_mut().remove::<UnclassifiedFailure>()
    else {
        return response;
    };

    tracing::error_span!("classify", %method, %path)
        .in_scope(|| classifier.classify(&failure))
        .into_response()
}

/// Panic handler for `CatchPanicLayer`.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    };

    tracing::error!(panic = %detail, "Handler panicked");
    metrics::record_error(ErrorKind::Internal);
    ClassifiedError::internal(INTERNAL).into_response()
}
