//! Plugin-based provider registry
//!
//! Zone providers register a factory under their type name, and the daemon
//! builds the configured provider without an if-else chain over backends.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mate_core::registry::ProviderRegistry;
//! use mate_core::config::ProviderConfig;
//!
//! let registry = ProviderRegistry::new();
//! mate_core::register_builtin(&registry);
//! mate_provider_cloudflare::register(&registry);
//!
//! let config = ProviderConfig::Memory { zones: vec!["example.com".into()] };
//! let provider = registry.create_provider(&config)?;
//! ```

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::traits::{ZoneProvider, ZoneProviderFactory};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Registry of zone provider factories keyed by type name
///
/// ## Thread Safety
///
/// Interior mutability through an RwLock: concurrent lookups, exclusive
/// registration. A poisoned lock is recovered, since the map is only ever
/// written by a single insert.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Box<dyn ZoneProviderFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a zone provider factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider type name, matching `ProviderConfig::type_name`
    /// - `factory`: Factory object for creating provider instances
    ///
    /// Registering a name twice replaces the earlier factory.
    pub fn register_provider(
        &self,
        name: impl Into<String>,
        factory: Box<dyn ZoneProviderFactory>,
    ) {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        providers.insert(name.into(), factory);
    }

    /// Create a zone provider from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn ZoneProvider>)`: Created provider instance
    /// - `Err(Error::Config)`: The provider type is not registered
    /// - `Err(Error)`: The factory rejected the configuration
    pub fn create_provider(&self, config: &ProviderConfig) -> Result<Box<dyn ZoneProvider>> {
        let provider_type = config.type_name();
        let providers = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let factory = providers
            .get(provider_type)
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?;

        factory.create(config)
    }

    /// List all registered provider types, sorted
    pub fn list_providers(&self) -> Vec<String> {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        providers.contains_key(name)
    }
}
