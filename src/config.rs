use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use crate::convert::ParsePolicy;
use crate::error::{ClientError, Result};
use crate::telemetry::{noop_event_listener, ClientEventListener};
use crate::types::{Consistency, Precision};

/// Default number of points buffered before the caller is expected to flush.
pub const DEFAULT_BUFFER_CAPACITY: usize = 50;

/// Prefix of environment variables read by [`ClientConfig::load`] (e.g. `INFLUXCLIENT_DATABASE`).
pub const ENV_PREFIX: &str = "INFLUXCLIENT";

/// Configuration options for [`InfluxClient`](crate::InfluxClient).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Database targeted by reads and writes.
    pub database: String,
    /// Retention policy for writes. Empty selects the server default.
    pub retention_policy: String,
    pub consistency: Consistency,
    /// Maximum number of points held before a write.
    pub buffer_capacity: usize,
    /// Precision given to points added without an explicit one.
    pub default_precision: Precision,
    /// Handling of cells that fail to convert when reading.
    pub parse_policy: ParsePolicy,
    /// Optional prefix applied to measurement names at write time (`<label>_<measurement>`).
    pub label: Option<String>,
    /// Structured event hook.
    #[serde(skip, default = "noop_event_listener")]
    pub event_listener: Arc<dyn ClientEventListener>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            database: String::new(),
            retention_policy: String::new(),
            consistency: Consistency::default(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            default_precision: Precision::Seconds,
            parse_policy: ParsePolicy::ZeroFill,
            label: None,
            event_listener: noop_event_listener(),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from (in precedence order) defaults, an optional TOML file and
    /// `INFLUXCLIENT_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(ClientError::ConfigError(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .ignore_empty(true),
        );

        let config: ClientConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_capacity == 0 {
            return Err(ClientError::ConfigError(
                "buffer_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_database(mut self, database: &str) -> Self {
        self.database = database.to_string();
        self
    }

    pub fn with_event_listener(mut self, listener: Arc<dyn ClientEventListener>) -> Self {
        self.event_listener = listener;
        self
    }
}
