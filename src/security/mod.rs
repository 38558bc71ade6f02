//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client admission, 429 when exhausted)
//!     → auth (bearer token)
//!     → handler
//! ```
//!
//! # Design Decisions
//! - Admission runs before any token parsing
//! - Fail closed: reject on any security check failure
//! - No trust in client input (forwarded headers are opt-in)

pub mod rate_limit;

pub use rate_limit::{AdmissionBucket, AdmissionController, AdmissionState, Decision};
