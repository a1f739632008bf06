//! Presence store configuration.

use serde::{Deserialize, Serialize};

/// Presence store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Store backend: `"redis"` or `"memory"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Redis settings (used when `provider = "redis"`).
    #[serde(default)]
    pub redis: RedisPresenceConfig,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            redis: RedisPresenceConfig::default(),
        }
    }
}

/// Redis connection settings for the presence store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisPresenceConfig {
    /// Redis connection URL.
    #[serde(default = "default_url")]
    pub url: String,
    /// Prefix applied to every presence key.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisPresenceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

fn default_provider() -> String {
    "redis".to_string()
}

fn default_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "huddle:".to_string()
}
