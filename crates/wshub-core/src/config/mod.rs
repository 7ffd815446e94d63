//! Configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! an optional TOML file, an optional environment overlay and `WSHUB__`
//! prefixed environment variables. Every field has a default, so an empty
//! configuration is valid.

pub mod app;
pub mod hub;
pub mod logging;

use serde::{Deserialize, Serialize};

pub use self::app::ServerConfig;
pub use self::hub::{DuplicatePolicy, HubConfig};
pub use self::logging::LoggingConfig;

use crate::error::HubError;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Connection hub settings.
    #[serde(default)]
    pub hub: HubConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// Merges `path` (without extension, optional), `config/{env}` (optional)
    /// and environment variables such as `WSHUB__HUB__PING_INTERVAL_SECONDS`.
    pub fn load(path: &str, env: &str) -> Result<Self, HubError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("WSHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| HubError::configuration(format!("Failed to build config: {e}")))?;

        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| HubError::configuration(format!("Failed to deserialize config: {e}")))?;

        parsed.hub.validate()?;
        Ok(parsed)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(source: &str) -> Result<Self, HubError> {
        let parsed: Self = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        parsed.hub.validate()?;
        Ok(parsed)
    }
}
