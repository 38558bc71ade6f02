//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → command-line / environment overrides
//!     → validation.rs (semantic checks)
//!     → GateConfig (validated, immutable)
//!     → handed to each component constructor
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs, except the signing secret
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, load_config, ConfigError, Overrides};
pub use schema::{AuthConfig, Environment, GateConfig, ListenerConfig, ObservabilityConfig, RateLimitConfig};
