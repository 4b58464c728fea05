use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use super::{
    InitialStartBlock, NameParams, deserialize_duration_from_ms,
    deserialize_duration_from_seconds,
};

fn default_network_id() -> String {
    "main".to_string()
}

fn default_polling_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_notification_channel_capacity() -> u32 {
    1024
}

/// Application configuration for namewatch.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Database URL for the SQLite database.
    pub database_url: String,

    /// Handshake network the node runs on.
    #[serde(default = "default_network_id")]
    pub network_id: String,

    /// Name auction constants. Defaults to those of `network_id`.
    #[serde(default)]
    pub names: Option<NameParams>,

    /// The interval in milliseconds to poll for new blocks.
    #[serde(
        deserialize_with = "deserialize_duration_from_ms",
        default = "default_polling_interval"
    )]
    pub polling_interval_ms: Duration,

    /// The capacity of the channel used for sending notifications.
    #[serde(default = "default_notification_channel_capacity")]
    pub notification_channel_capacity: u32,

    /// The maximum time in seconds to wait for graceful shutdown.
    #[serde(
        deserialize_with = "deserialize_duration_from_seconds",
        default = "default_shutdown_timeout"
    )]
    pub shutdown_timeout: Duration,

    /// The block to start from when no block has been processed yet.
    #[serde(default)]
    pub initial_start_block: InitialStartBlock,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            network_id: default_network_id(),
            names: None,
            polling_interval_ms: default_polling_interval(),
            notification_channel_capacity: default_notification_channel_capacity(),
            shutdown_timeout: default_shutdown_timeout(),
            initial_start_block: InitialStartBlock::default(),
        }
    }
}

impl AppConfig {
    /// Creates a new `AppConfig` by reading `app.yaml` from the configuration
    /// directory, overlaid with `NAMEWATCH__*` environment variables.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir = config_dir.unwrap_or("configs");
        Config::builder()
            .add_source(File::with_name(&format!("{}/app.yaml", config_dir)))
            .add_source(Environment::with_prefix("NAMEWATCH").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// The name auction constants in effect: `names` if set, otherwise the
    /// constants of `network_id`, falling back to mainnet.
    pub fn name_params(&self) -> NameParams {
        self.names.or_else(|| NameParams::for_network(&self.network_id)).unwrap_or_default()
    }

    /// Creates a new `AppConfigBuilder` for testing purposes.
    #[cfg(test)]
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

/// A builder for creating `AppConfig` instances for testing.
#[cfg(test)]
#[derive(Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn database_url(mut self, url: &str) -> Self {
        self.config.database_url = url.to_string();
        self
    }

    pub fn network_id(mut self, network_id: &str) -> Self {
        self.config.network_id = network_id.to_string();
        self
    }

    pub fn names(mut self, names: NameParams) -> Self {
        self.config.names = Some(names);
        self
    }

    pub fn polling_interval(mut self, interval_ms: u64) -> Self {
        self.config.polling_interval_ms = Duration::from_millis(interval_ms);
        self
    }

    pub fn initial_start_block(mut self, block: InitialStartBlock) -> Self {
        self.config.initial_start_block = block;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}
