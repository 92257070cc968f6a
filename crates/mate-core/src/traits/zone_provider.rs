// # Zone Provider Trait
//
// The provider boundary: lists hosted zones and their record sets, and
// submits one batched change set per zone.
//
// ## Implementations
//
// - In-memory: `mate_core::provider::MemoryZoneProvider`
// - Cloudflare: `mate-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use mate_core::ZoneProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* ZoneProvider implementation */;
//
//     for zone in provider.list_hosted_zones().await? {
//         let records = provider.list_record_sets(&zone.id).await?;
//         println!("{} has {} record sets", zone.name, records.len());
//     }
//
//     Ok(())
// }
// ```

use crate::types::{ChangeBatch, HostedZone, Record};
use async_trait::async_trait;

/// Trait for DNS provider backends
///
/// Implementations must be thread-safe: the reconciler lists and applies
/// several zones concurrently through one shared reference.
///
/// # Trust Level: Untrusted
///
/// Providers translate between the engine's record shape and their API and
/// nothing else.
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses
/// - ✅ Return success or failure (the next reconciliation cycle retries)
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off internally
/// - ❌ Decide which records to change (owned by the planner)
/// - ❌ Cache listings between calls
/// - ❌ Split a zone's batch into several independent submissions that could
///   leave a data record without its ownership record
#[async_trait]
pub trait ZoneProvider: Send + Sync {
    /// List every hosted zone this installation may write into
    ///
    /// Zone names must be returned in canonical form (trailing dot).
    async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>, crate::Error>;

    /// List the record sets of one zone
    ///
    /// Record names must be canonical. TXT values are returned verbatim,
    /// quotes included.
    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<Record>, crate::Error>;

    /// Submit one zone's changes as a single unit
    ///
    /// # Returns
    ///
    /// - `Ok(())`: every change in the batch was accepted
    /// - `Err(Error)`: the batch was rejected; nothing should be assumed applied
    async fn change_record_sets(
        &self,
        zone_id: &str,
        batch: &ChangeBatch,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing zone providers from configuration
pub trait ZoneProviderFactory: Send + Sync {
    /// Create a ZoneProvider instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this provider
    ///
    /// # Returns
    ///
    /// A boxed ZoneProvider trait object
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn ZoneProvider>, crate::Error>;
}
