//! Connector configuration.
//!
//! A backend is handed a [`ConnectorConfig`] when it connects. Settings can
//! be built in code, or loaded from `config/groundskeeper.toml` with
//! environment-variable overrides via [`ConnectorConfig::load`].

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Settings handed to `DataConnector::connect`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorConfig {
    /// Backend-specific connection string; the core never interprets it.
    pub connection_string: String,
    /// Logical consumer name recorded in the version ledger.
    #[serde(default = "default_migrator_name")]
    pub migrator_name: String,
    /// Whether the backend should reconcile its expected tables against the
    /// live schema as part of connecting.
    #[serde(default = "default_validate_tables")]
    pub validate_tables: bool,
}

fn default_migrator_name() -> String {
    "default".to_string()
}

fn default_validate_tables() -> bool {
    true
}

impl ConnectorConfig {
    pub fn new(connection_string: impl Into<String>, migrator_name: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            migrator_name: migrator_name.into(),
            validate_tables: default_validate_tables(),
        }
    }

    /// Load the `[connector]` section from `config/groundskeeper.toml`,
    /// falling back to `GROUNDSKEEPER`-prefixed environment variables
    /// (e.g. `GROUNDSKEEPER__CONNECTOR__CONNECTION_STRING`).
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/groundskeeper.toml").required(false))
            .add_source(Environment::with_prefix("GROUNDSKEEPER").separator("__"))
            .build()?;

        settings.get::<ConnectorConfig>("connector")
    }
}
