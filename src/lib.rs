//! Request gating for multi-tenant API servers.
//!
//! Every request passes per-client admission control, bearer-token
//! authentication and uniform failure classification before and around
//! the business handler.

pub mod accounts;
pub mod auth;
pub mod clock;
pub mod config;
pub mod errors;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod security;

pub use config::GateConfig;
pub use http::GateServer;
pub use lifecycle::Shutdown;
pub use pipeline::Pipeline;
