// # Memory Zone Provider
//
// In-memory implementation of ZoneProvider.
//
// ## Purpose
//
// Holds hosted zones and their record sets in a HashMap and applies change
// batches with Route53 semantics:
//
// - CREATE fails if a record set with the same name and type exists
// - DELETE fails unless an identical record set exists
// - UPSERT replaces the record set with the same name and type, or adds it
// - A batch is validated completely before anything is written, so a
//   rejected batch leaves the zone untouched
//
// The last accepted batch per zone per change kind is kept for inspection;
// a rejected batch leaves no history. Zones can be made to fail on demand.
//
// ## When to Use
//
// - Testing environments
// - Dry runs of the reconciliation logic without credentials

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::Error;
use crate::config::ProviderConfig;
use crate::traits::{ZoneProvider, ZoneProviderFactory};
use crate::types::{ChangeBatch, ChangeKind, HostedZone, Record, sanitize_dns_name};

const PROVIDER_NAME: &str = "memory";

#[derive(Debug, Default)]
struct MemoryState {
    zones: Vec<HostedZone>,
    records: HashMap<String, Vec<Record>>,
    last_batches: HashMap<(String, ChangeKind), Vec<Record>>,
    failing_zones: HashSet<String>,
    failing_changes: HashSet<String>,
}

/// In-memory zone provider
///
/// Clones share the same zones, so a test can keep a handle while the
/// reconciler owns a boxed copy.
///
/// # Example
///
/// ```rust,no_run
/// use mate_core::provider::MemoryZoneProvider;
/// use mate_core::types::HostedZone;
/// use mate_core::ZoneProvider;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let provider = MemoryZoneProvider::new(vec![HostedZone::new("Z1", "example.com")]);
///
///     let zones = provider.list_hosted_zones().await?;
///     assert_eq!(zones[0].name, "example.com.");
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryZoneProvider {
    inner: Arc<RwLock<MemoryState>>,
    change_calls: Arc<AtomicUsize>,
}

impl MemoryZoneProvider {
    /// Create a provider holding the given (empty) zones
    pub fn new(zones: Vec<HostedZone>) -> Self {
        let records = zones
            .iter()
            .map(|zone| (zone.id.clone(), Vec::new()))
            .collect();

        Self {
            inner: Arc::new(RwLock::new(MemoryState {
                zones,
                records,
                ..MemoryState::default()
            })),
            change_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replace the records of a zone, bypassing change semantics
    pub async fn seed(&self, zone_id: &str, records: Vec<Record>) {
        let mut guard = self.inner.write().await;
        guard.records.insert(zone_id.to_string(), records);
    }

    /// Current records of a zone
    pub async fn records(&self, zone_id: &str) -> Vec<Record> {
        let guard = self.inner.read().await;
        guard.records.get(zone_id).cloned().unwrap_or_default()
    }

    /// Records of the last batch of `kind` accepted for a zone
    ///
    /// Rejected batches are not recorded; `change_call_count` counts every
    /// submission.
    pub async fn last_batch(&self, zone_id: &str, kind: ChangeKind) -> Vec<Record> {
        let guard = self.inner.read().await;
        guard
            .last_batches
            .get(&(zone_id.to_string(), kind))
            .cloned()
            .unwrap_or_default()
    }

    /// Zone IDs that received a non-empty batch of `kind`
    pub async fn zones_changed(&self, kind: ChangeKind) -> Vec<String> {
        let guard = self.inner.read().await;
        let mut zones: Vec<String> = guard
            .last_batches
            .iter()
            .filter(|((_, k), records)| *k == kind && !records.is_empty())
            .map(|((zone, _), _)| zone.clone())
            .collect();
        zones.sort();
        zones
    }

    /// Forget all recorded batches
    pub async fn reset_history(&self) {
        let mut guard = self.inner.write().await;
        guard.last_batches.clear();
        self.change_calls.store(0, Ordering::SeqCst);
    }

    /// Make listing and changing a zone fail
    pub async fn fail_zone(&self, zone_id: &str) {
        let mut guard = self.inner.write().await;
        guard.failing_zones.insert(zone_id.to_string());
    }

    /// Make only change submissions to a zone fail
    pub async fn fail_changes(&self, zone_id: &str) {
        let mut guard = self.inner.write().await;
        guard.failing_changes.insert(zone_id.to_string());
    }

    /// Clear injected failures for a zone
    pub async fn heal_zone(&self, zone_id: &str) {
        let mut guard = self.inner.write().await;
        guard.failing_zones.remove(zone_id);
        guard.failing_changes.remove(zone_id);
    }

    /// Number of change_record_sets calls, successful or not
    pub fn change_call_count(&self) -> usize {
        self.change_calls.load(Ordering::SeqCst)
    }
}

fn same_set(a: &Record, b: &Record) -> bool {
    a.name == b.name && a.record_type == b.record_type
}

/// Apply a batch to a copy of the zone's records
fn apply_batch(current: &[Record], batch: &ChangeBatch) -> Result<Vec<Record>, Error> {
    let mut records = current.to_vec();

    for (kind, record) in batch.changes() {
        match kind {
            ChangeKind::Delete => {
                let position = records.iter().position(|r| r == record).ok_or_else(|| {
                    Error::provider(
                        PROVIDER_NAME,
                        format!(
                            "Tried to delete {} record {} but it was not found",
                            record.record_type, record.name
                        ),
                    )
                })?;
                records.remove(position);
            }
            ChangeKind::Create => {
                if records.iter().any(|r| same_set(r, record)) {
                    return Err(Error::provider(
                        PROVIDER_NAME,
                        format!(
                            "Tried to create {} record {} but it already exists",
                            record.record_type, record.name
                        ),
                    ));
                }
                records.push(record.clone());
            }
            ChangeKind::Upsert => match records.iter_mut().find(|r| same_set(r, record)) {
                Some(existing) => *existing = record.clone(),
                None => records.push(record.clone()),
            },
        }
    }

    Ok(records)
}

#[async_trait]
impl ZoneProvider for MemoryZoneProvider {
    async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.zones.clone())
    }

    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<Record>, Error> {
        let guard = self.inner.read().await;
        if guard.failing_zones.contains(zone_id) {
            return Err(Error::provider(
                PROVIDER_NAME,
                format!("Listing zone {} failed", zone_id),
            ));
        }
        guard
            .records
            .get(zone_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Hosted zone {}", zone_id)))
    }

    async fn change_record_sets(&self, zone_id: &str, batch: &ChangeBatch) -> Result<(), Error> {
        self.change_calls.fetch_add(1, Ordering::SeqCst);

        let mut guard = self.inner.write().await;
        if guard.failing_zones.contains(zone_id) || guard.failing_changes.contains(zone_id) {
            return Err(Error::provider(
                PROVIDER_NAME,
                format!("Change batch for zone {} rejected", zone_id),
            ));
        }

        let current = guard
            .records
            .get(zone_id)
            .ok_or_else(|| Error::not_found(format!("Hosted zone {}", zone_id)))?;
        let updated = apply_batch(current, batch)?;
        guard.records.insert(zone_id.to_string(), updated);

        for kind in [ChangeKind::Create, ChangeKind::Upsert, ChangeKind::Delete] {
            let records = batch.records(kind);
            if !records.is_empty() {
                guard
                    .last_batches
                    .insert((zone_id.to_string(), kind), records.to_vec());
            }
        }

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Factory for in-memory providers
///
/// Each configured zone name gets the ID `/hostedzone/<name>`.
pub struct MemoryZoneProviderFactory;

impl ZoneProviderFactory for MemoryZoneProviderFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn ZoneProvider>, Error> {
        match config {
            ProviderConfig::Memory { zones } => {
                let zones = zones
                    .iter()
                    .map(|name| {
                        let name = sanitize_dns_name(name);
                        let id = format!("/hostedzone/{}", name.trim_end_matches('.'));
                        HostedZone::new(id, name)
                    })
                    .collect();
                Ok(Box::new(MemoryZoneProvider::new(zones)))
            }
            _ => Err(Error::config("Invalid config for memory provider")),
        }
    }
}
