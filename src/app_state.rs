use std::sync::Arc;

use crate::config::ClientConfig;
use crate::services::{
    api::{ApiError, LogisticsClient},
    session::ReconciliationSession,
    slack::MessageFeed,
};

/// Shared client state: configuration plus one HTTP client reused by every
/// session and feed.
#[derive(Clone)]
pub struct AppState {
    pub config: ClientConfig,
    pub api: Arc<LogisticsClient>,
}

impl AppState {
    pub fn new(config: ClientConfig, api: LogisticsClient) -> Self {
        Self {
            config,
            api: Arc::new(api),
        }
    }

    pub fn from_config(config: ClientConfig) -> Result<Self, ApiError> {
        let api = LogisticsClient::from_config(&config)?;
        Ok(Self::new(config, api))
    }

    pub fn session(&self) -> ReconciliationSession<LogisticsClient> {
        ReconciliationSession::from_config(self.api.clone(), &self.config)
    }

    pub fn feed(&self) -> MessageFeed<LogisticsClient> {
        MessageFeed::new(self.api.clone())
    }
}
