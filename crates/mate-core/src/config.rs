//! Configuration types for mate
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main mate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MateConfig {
    /// Installation group id, embedded in every ownership tag
    pub group_id: String,

    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Which consumer the driver runs
    #[serde(default)]
    pub consumer: ConsumerKind,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl MateConfig {
    /// Create a new configuration with defaults
    pub fn new(group_id: impl Into<String>, provider: ProviderConfig) -> Self {
        Self {
            group_id: group_id.into(),
            provider,
            consumer: ConsumerKind::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Load a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_group_id(&self.group_id)?;
        self.provider.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// Group ids end up inside a quoted TXT value, so quotes and whitespace are
/// rejected.
pub fn validate_group_id(group_id: &str) -> Result<(), crate::Error> {
    if group_id.is_empty() {
        return Err(crate::Error::config("Group id cannot be empty"));
    }
    if group_id.chars().any(|c| c == '"' || c.is_whitespace()) {
        return Err(crate::Error::config(format!(
            "Group id must not contain quotes or whitespace: {:?}",
            group_id
        )));
    }
    Ok(())
}

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// Account ID (optional, narrows zone listing)
        #[serde(default)]
        account_id: Option<String>,
    },

    /// In-memory provider (testing, dry runs)
    Memory {
        /// Names of the hosted zones to create
        #[serde(default)]
        zones: Vec<String>,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare { api_token, .. } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                Ok(())
            }
            ProviderConfig::Memory { .. } => Ok(()),
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Memory { .. } => "memory",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Memory { zones: Vec::new() }
    }
}

/// Consumer selected at startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsumerKind {
    /// Ownership-aware reconciliation against the provider
    #[default]
    Reconcile,
    /// Print desired endpoints only
    Stdout,
}

impl std::str::FromStr for ConsumerKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reconcile" => Ok(ConsumerKind::Reconcile),
            "stdout" => Ok(ConsumerKind::Stdout),
            other => Err(crate::Error::config(format!(
                "Unknown consumer '{}'. Supported consumers: reconcile, stdout",
                other
            ))),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between full sync passes
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    /// Capacity of the reconcile event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.sync_interval_secs == 0 {
            return Err(crate::Error::config("Sync interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: default_sync_interval_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_sync_interval_secs() -> u64 {
    60
}

fn default_event_channel_capacity() -> usize {
    1000
}
