//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request ID, tracing, connect info)
//!     → pipeline (admission → authentication → handler)
//!     → response.rs (uniform JSON envelope)
//!     → Send to client
//! ```

pub mod response;
pub mod routes;
pub mod server;

pub use response::ApiResponse;
pub use server::GateServer;
