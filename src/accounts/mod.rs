//! Account registration and login on top of an external [`UserStore`].
//!
//! # Routes
//! - `POST /auth/register` (admission only)
//! - `POST /auth/login` (admission only)
//! - `GET /auth/me` (admission + authentication)

pub mod handlers;
pub mod service;
pub mod store;
pub mod validator;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

pub use service::{AuthService, LoginRequest, RegisterRequest, Session};
pub use store::{NewUser, UserRecord, UserStore};

/// Routes that need no token.
pub fn public_routes(service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .with_state(service)
}

/// Routes that need a verified identity.
pub fn protected_routes(service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/auth/me", get(handlers::me))
        .with_state(service)
}
