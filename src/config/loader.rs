//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{Environment, GateConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Values supplied on the command line or through the environment.
/// They win over whatever the file says.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub jwt_secret: Option<String>,
    pub environment: Option<Environment>,
    pub bind_address: Option<String>,
}

impl Overrides {
    fn apply(&self, config: &mut GateConfig) {
        if let Some(secret) = &self.jwt_secret {
            config.auth.jwt_secret = secret.clone();
        }
        if let Some(environment) = self.environment {
            config.environment = environment;
        }
        if let Some(bind_address) = &self.bind_address {
            config.listener.bind_address = bind_address.clone();
        }
    }
}

/// Parse a configuration from TOML text without validating it.
pub fn parse_config(content: &str) -> Result<GateConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GateConfig, ConfigError> {
    load(Some(path), &Overrides::default())
}

/// Load configuration from an optional file, apply overrides, then validate.
pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<GateConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => GateConfig::default(),
    };

    overrides.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
