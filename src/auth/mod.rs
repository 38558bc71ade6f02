//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Authorization header
//!     → gate.rs (extract "Bearer <token>")
//!     → token.rs (verify signature, structure, expiry)
//!     → VerifiedIdentity attached to request extensions
//!     → handler
//! ```
//!
//! # Design Decisions
//! - Fail closed: any verification problem rejects the request
//! - One rejection message for every invalid token; the reason is only logged
//! - `TokenService::decode` never authorizes anything

pub mod gate;
pub mod token;

pub use gate::{auth_middleware, AuthGate, VerifiedIdentity, BEARER_PREFIX};
pub use token::{Claims, DecodedToken, InvalidToken, TokenError, TokenService};
