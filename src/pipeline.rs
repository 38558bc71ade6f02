//! Request pipeline composition.
//!
//! # Data Flow
//! ```text
//! request
//!     → catch_panic            (panics → Internal envelope)
//!     → classify_failures      (Failure → ClassifiedError envelope)
//!     → rate_limit_middleware  (429 when the client's bucket is exhausted)
//!     → auth_middleware        (protected routes only; 401 on bad credentials)
//!     → handler
//! ```
//!
//! Admission always runs first, so rejected clients never reach token parsing.

use std::sync::Arc;

use axum::{middleware, Router};
use tower_http::catch_panic::CatchPanicLayer;

use crate::auth::{auth_middleware, AuthGate, TokenError, TokenService};
use crate::clock::Clock;
use crate::config::GateConfig;
use crate::errors::{classify_failures, panic_response, ClassifiedError, ErrorClassifier, NOT_FOUND};
use crate::security::rate_limit::{rate_limit_middleware, AdmissionController, AdmissionState};

/// The three guards, built once from configuration and shared by every request.
#[derive(Clone)]
pub struct Pipeline {
    admission: Arc<AdmissionController>,
    gate: Arc<AuthGate>,
    classifier: ErrorClassifier,
    trust_forwarded_for: bool,
}

impl Pipeline {
    pub fn new(config: &GateConfig, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        let tokens = Arc::new(TokenService::new(&config.auth, clock.clone())?);
        Ok(Self {
            admission: Arc::new(AdmissionController::new(&config.rate_limit, clock)),
            gate: Arc::new(AuthGate::new(tokens)),
            classifier: ErrorClassifier::new(config.environment),
            trust_forwarded_for: config.rate_limit.trust_forwarded_for,
        })
    }

    pub fn admission(&self) -> &Arc<AdmissionController> {
        &self.admission
    }

    pub fn tokens(&self) -> &Arc<TokenService> {
        self.gate.tokens()
    }

    pub fn gate(&self) -> &Arc<AuthGate> {
        &self.gate
    }

    pub fn classifier(&self) -> ErrorClassifier {
        self.classifier
    }

    /// Wrap `public` routes in admission control and `protected` routes in
    /// admission control plus authentication.
    ///
    /// Unmatched paths get a `NotFound` envelope and known paths called with
    /// the wrong method a `MethodNotAllowed` one. An empty `protected` router
    /// is accepted and adds nothing.
    pub fn compose(&self, public: Router, protected: Router) -> Router {
        // `route_layer` panics on a router without routes.
        let protected = if protected.has_routes() {
            protected.route_layer(middleware::from_fn_with_state(
                self.gate.clone(),
                auth_middleware,
            ))
        } else {
            protected
        };

        let admission = AdmissionState {
            controller: self.admission.clone(),
            trust_forwarded_for: self.trust_forwarded_for,
        };

        Router::new()
            .merge(public)
            .merge(protected)
            .method_not_allowed_fallback(method_not_allowed)
            .fallback(not_found)
            .layer(middleware::from_fn_with_state(admission, rate_limit_middleware))
            .layer(middleware::from_fn_with_state(self.classifier, classify_failures))
            .layer(CatchPanicLayer::custom(panic_response))
    }
}

async fn not_found() -> ClassifiedError {
    ClassifiedError::not_found(NOT_FOUND)
}

async fn method_not_allowed() -> ClassifiedError {
    ClassifiedError::method_not_allowed()
}
