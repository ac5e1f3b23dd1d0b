//! Mediator configuration.
//!
//! # Example
//!
//! ```
//! use mediator_builder::{MediatorConfig, PublishStrategy};
//!
//! let config = MediatorConfig::from_json(r#"{ "publish_strategy": "concurrent" }"#).unwrap();
//! assert_eq!(config.publish_strategy, PublishStrategy::Concurrent);
//! assert_eq!(config.handler_key, "handler");
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default key of the innermost link of every request chain.
pub const DEFAULT_HANDLER_KEY: &str = "handler";

/// How a published notification reaches its handlers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStrategy {
    /// One handler after another; the first error stops delivery.
    #[default]
    Sequential,
    /// All handlers at once; the first error is reported after all finish.
    Concurrent,
}

/// Configuration for the mediator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediatorConfig {
    /// Delivery strategy for `publish`.
    pub publish_strategy: PublishStrategy,
    /// Key of the innermost link of every request chain.
    pub handler_key: String,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            publish_strategy: PublishStrategy::default(),
            handler_key: DEFAULT_HANDLER_KEY.to_string(),
        }
    }
}

impl MediatorConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the publish strategy.
    pub fn publish_strategy(mut self, strategy: PublishStrategy) -> Self {
        self.publish_strategy = strategy;
        self
    }

    /// Set the key of the innermost link.
    pub fn handler_key(mut self, key: impl Into<String>) -> Self {
        self.handler_key = key.into();
        self
    }
}
