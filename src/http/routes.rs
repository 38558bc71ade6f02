//! Built-in routes.

use axum::{routing::get, Router};
use serde::Serialize;

use crate::auth::VerifiedIdentity;
use crate::http::response::ApiResponse;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

pub async fn health() -> ApiResponse<SystemStatus> {
    ApiResponse::ok(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

/// Echo the caller's verified claims.
pub async fn whoami(identity: VerifiedIdentity) -> ApiResponse<VerifiedIdentity> {
    ApiResponse::ok(identity)
}

pub fn public_routes() -> Router {
    Router::new().route("/health", get(health))
}

pub fn protected_routes() -> Router {
    Router::new().route("/whoami", get(whoami))
}
