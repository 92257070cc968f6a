// # mate-core
//
// Core library for ownership-aware DNS reconciliation.
//
// ## Architecture Overview
//
// - **EndpointSource**: Trait for producers of desired endpoints
// - **Consumer**: Trait for turning desired endpoints into DNS state
// - **ZoneProvider**: Trait for listing and changing records at a provider
// - **Reconciler**: Ownership-aware Consumer over any ZoneProvider
// - **Controller**: Driver loop running sync passes and single-endpoint creates
// - **ProviderRegistry**: Plugin-based registry for zone providers
//
// ## Ownership
//
// Every record this library writes is paired with a TXT record holding
// `"mate:<group id>"`. Names carrying another group id, or a data record
// without any TXT record, are never modified or deleted.

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod ownership;
pub mod plan;
pub mod provider;
pub mod registry;
pub mod stdout;
pub mod traits;
pub mod translate;
pub mod types;
pub mod zone;

// Re-export core types for convenience
pub use config::{ConsumerKind, EngineConfig, MateConfig, ProviderConfig};
pub use controller::Controller;
pub use engine::{ReconcileEvent, Reconciler};
pub use error::{Error, Result};
pub use plan::{Plan, SkipReason, SkippedEndpoint};
pub use provider::MemoryZoneProvider;
pub use registry::ProviderRegistry;
pub use stdout::StdoutConsumer;
pub use traits::{Consumer, EndpointSource, ZoneProvider, ZoneProviderFactory};
pub use translate::OwnershipTag;
pub use types::{ChangeBatch, ChangeKind, Endpoint, HostedZone, Record, RecordType};

/// Register the providers shipped with this crate (`"memory"`)
pub fn register_builtin(registry: &ProviderRegistry) {
    registry.register_provider("memory", Box::new(provider::MemoryZoneProviderFactory));
}
