//! Bearer-token authentication.
//!
//! Extracts the credential from `Authorization: Bearer <token>`, verifies it
//! with the [`TokenService`], and binds the resulting [`VerifiedIdentity`] to
//! the request. Every verification failure gets the same response.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::auth::token::{Claims, TokenService};
use crate::errors::{ClassifiedError, INVALID_TOKEN, NO_TOKEN};
use crate::observability::metrics;

/// Scheme prefix, case-sensitive with exactly one space.
pub const BEARER_PREFIX: &str = "Bearer ";

/// The principal established for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiedIdentity {
    #[serde(flatten)]
    claims: Claims,
}

impl VerifiedIdentity {
    pub fn subject(&self) -> &str {
        &self.claims.sub
    }

    pub fn email(&self) -> Option<&str> {
        self.claims.email.as_deref()
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }
}

/// Pull the credential out of a raw header value.
pub fn extract_bearer(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .filter(|token| !token.is_empty())
}

/// Stateless authentication gate.
#[derive(Debug, Clone)]
pub struct AuthGate {
    tokens: Arc<TokenService>,
}

impl AuthGate {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    /// Authenticate a raw `Authorization` header value.
    pub fn authenticate(&self, header: Option<&str>) -> Result<VerifiedIdentity, ClassifiedError> {
        let Some(token) = extract_bearer(header) else {
            metrics::record_auth_failure("missing");
            return Err(ClassifiedError::unauthorized(NO_TOKEN));
        };

        match self.tokens.verify(token) {
            Ok(claims) => Ok(VerifiedIdentity { claims }),
            Err(_) => {
                metrics::record_auth_failure("invalid");
                Err(ClassifiedError::unauthorized(INVALID_TOKEN))
            }
        }
    }
}

/// Middleware requiring a valid bearer token.
pub async fn auth_middleware(
    State(gate): State<Arc<AuthGate>>,
    mut request: Request,
    next: Next,
) -> Response {
    // A header that is not valid ASCII is treated as absent.
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match gate.authenticate(header) {
        Ok(identity) => {
            tracing::debug!(subject = %identity.subject(), "Request authenticated");
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(err) => {
            tracing::debug!(path = %request.uri().path(), reason = %err, "Authentication failed");
            err.into_response()
        }
    }
}

impl<S> FromRequestParts<S> for VerifiedIdentity
where
    S: Send + Sync,
{
    type Rejection = ClassifiedError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedIdentity>()
            .cloned()
            .ok_or_else(|| ClassifiedError::unauthorized(NO_TOKEN))
    }
}
