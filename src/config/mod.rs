use garde::Validate;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ClientConfig {
    /// Backend origin, e.g. "https://logistics.example.com"
    #[garde(length(min = 1))]
    pub api_url: String,

    /// Delay between job status queries
    #[serde(default = "default_poll_interval_ms")]
    #[garde(range(min = 50))]
    pub poll_interval_ms: u64,

    /// Status queries before a job is reported as still processing
    #[serde(default = "default_max_poll_attempts")]
    #[garde(range(min = 1))]
    pub max_poll_attempts: u32,

    /// Delta threshold sent with every processing request
    #[serde(default = "default_delta_threshold")]
    #[garde(range(min = 0.0, max = 1_000_000.0))]
    pub delta_threshold: f64,

    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout_secs")]
    #[garde(range(min = 1))]
    pub request_timeout_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_max_poll_attempts() -> u32 {
    150
}

fn default_delta_threshold() -> f64 {
    20.0
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration with defaults for everything but the base URL.
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
            delta_threshold: default_delta_threshold(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] garde::Report),
}
