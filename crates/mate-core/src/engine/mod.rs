//! Reconciliation engine
//!
//! The Reconciler is the ownership-aware [`Consumer`]. It is responsible for:
//! - Listing every hosted zone and its record sets through a ZoneProvider
//! - Planning per-zone change batches (see [`crate::plan`])
//! - Submitting each zone's batch independently
//! - Emitting events for monitoring/logging
//!
//! ## Architecture
//!
//! ```text
//!  desired endpoints
//!         │
//!         ▼
//! ┌──────────────┐  list zones/records  ┌──────────────┐
//! │  Reconciler  │◄────────────────────►│ ZoneProvider │
//! └──────────────┘  change batch / zone └──────────────┘
//!         │
//!         ▼
//! ┌──────────────┐
//! │    Events    │
//! │   (notify)   │
//! └──────────────┘
//! ```
//!
//! ## Sync Flow
//!
//! 1. List hosted zones, then list every zone's records concurrently
//! 2. Plan against the zones that could be listed
//! 3. Submit the non-empty batches concurrently, one per zone
//! 4. Fail the pass if any zone failed; applied zones stay applied
//!
//! There is no retry here. A failed zone is picked up again by the next pass,
//! which re-derives everything from fresh listings.

use crate::config::MateConfig;
use crate::error::{Error, Result};
use crate::plan::{Plan, SkipReason, has_target, plan_changes};
use crate::traits::{Consumer, ZoneProvider};
use crate::translate::{OwnershipTag, record_pair};
use crate::types::{ChangeBatch, Endpoint, Record, ZoneMap, sanitize_dns_name, zone_map};
use crate::zone::resolve_zone;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// A sync pass started
    SyncStarted {
        endpoints: usize,
    },

    /// A desired endpoint produced no change
    EndpointSkipped {
        name: String,
        reason: SkipReason,
    },

    /// A zone's batch was accepted
    ZoneApplied {
        zone_id: String,
        creates: usize,
        upserts: usize,
        deletes: usize,
    },

    /// Listing or applying a zone failed
    ZoneFailed {
        zone_id: String,
        error: String,
    },

    /// A sync pass finished, successfully or not
    SyncFinished {
        zones_changed: usize,
        zones_failed: usize,
        finished_at: DateTime<Utc>,
    },

    /// A single endpoint was created through the fast path
    Processed {
        name: String,
        zone_id: String,
    },
}

/// Listings gathered at the start of a pass
struct Snapshot {
    zones: ZoneMap,
    listings: HashMap<String, Vec<Record>>,
    failures: Vec<(String, String)>,
}

/// Ownership-aware consumer over a [`ZoneProvider`]
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`], keeping the event receiver
/// 2. Hand it to a [`crate::Controller`] (or call `sync`/`process` directly)
///
/// Nothing is retained between passes; every pass starts from fresh
/// listings.
pub struct Reconciler {
    /// Provider for listing and changing records
    provider: Box<dyn ZoneProvider>,

    /// This installation's ownership tag
    tag: OwnershipTag,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ReconcileEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields
    /// reconcile events
    pub fn new(
        provider: Box<dyn ZoneProvider>,
        config: &MateConfig,
    ) -> Result<(Self, mpsc::Receiver<ReconcileEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let reconciler = Self {
            provider,
            tag: OwnershipTag::new(&config.group_id),
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    /// The TXT value this installation writes and recognises
    pub fn ownership_tag(&self) -> &OwnershipTag {
        &self.tag
    }

    /// Compute the changes a sync would submit, without submitting them
    ///
    /// Zones whose records cannot be listed are left out of the plan and
    /// their endpoints are reported as [`SkipReason::ZoneUnavailable`].
    pub async fn plan(&self, endpoints: &[Endpoint]) -> Result<Plan> {
        let snapshot = self.snapshot().await?;
        Ok(plan_changes(
            endpoints,
            &snapshot.zones,
            &snapshot.listings,
            &self.tag,
        ))
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        let zones = zone_map(&self.provider.list_hosted_zones().await?);

        let results = join_all(zones.values().map(|zone_id| async move {
            let result = self.provider.list_record_sets(zone_id).await;
            (zone_id.clone(), result)
        }))
        .await;

        let mut listings = HashMap::new();
        let mut failures = Vec::new();
        for (zone_id, result) in results {
            match result {
                Ok(records) => {
                    debug!("Listed {} records in zone {}", records.len(), zone_id);
                    listings.insert(zone_id, records);
                }
                Err(e) => {
                    warn!("Failed to list records of zone {}: {}", zone_id, e);
                    failures.push((zone_id, e.to_string()));
                }
            }
        }

        Ok(Snapshot {
            zones,
            listings,
            failures,
        })
    }

    async fn apply(&self, zone_id: &str, batch: &ChangeBatch) -> Result<()> {
        self.provider.change_record_sets(zone_id, batch).await?;
        info!(
            "Applied zone {} ({} creates, {} upserts, {} deletes)",
            zone_id,
            batch.creates.len(),
            batch.upserts.len(),
            batch.deletes.len()
        );
        Ok(())
    }

    /// Emit a reconcile event
    fn emit_event(&self, event: ReconcileEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

#[async_trait]
impl Consumer for Reconciler {
    async fn sync(&self, endpoints: &[Endpoint]) -> Result<()> {
        self.emit_event(ReconcileEvent::SyncStarted {
            endpoints: endpoints.len(),
        });

        let Snapshot {
            zones,
            listings,
            mut failures,
        } = self.snapshot().await?;

        for (zone_id, error) in &failures {
            self.emit_event(ReconcileEvent::ZoneFailed {
                zone_id: zone_id.clone(),
                error: error.clone(),
            });
        }

        let plan = plan_changes(endpoints, &zones, &listings, &self.tag);
        for skipped in &plan.skipped {
            self.emit_event(ReconcileEvent::EndpointSkipped {
                name: skipped.name.clone(),
                reason: skipped.reason.clone(),
            });
        }

        let results = join_all(plan.batches.iter().map(|(zone_id, batch)| async move {
            (zone_id, batch, self.apply(zone_id, batch).await)
        }))
        .await;

        let mut zones_changed = 0;
        for (zone_id, batch, result) in results {
            match result {
                Ok(()) => {
                    zones_changed += 1;
                    self.emit_event(ReconcileEvent::ZoneApplied {
                        zone_id: zone_id.clone(),
                        creates: batch.creates.len(),
                        upserts: batch.upserts.len(),
                        deletes: batch.deletes.len(),
                    });
                }
                Err(e) => {
                    warn!("Failed to apply zone {}: {}", zone_id, e);
                    self.emit_event(ReconcileEvent::ZoneFailed {
                        zone_id: zone_id.clone(),
                        error: e.to_string(),
                    });
                    failures.push((zone_id.clone(), e.to_string()));
                }
            }
        }

        self.emit_event(ReconcileEvent::SyncFinished {
            zones_changed,
            zones_failed: failures.len(),
            finished_at: Utc::now(),
        });

        if failures.is_empty() {
            debug!("Sync pass complete, {} zone(s) changed", zones_changed);
            Ok(())
        } else {
            Err(Error::zone_failures(&failures))
        }
    }

    async fn process(&self, endpoint: &Endpoint) -> Result<()> {
        let name = sanitize_dns_name(&endpoint.dns_name);
        if !has_target(endpoint) {
            return Err(Error::invalid_input(format!(
                "Endpoint {} has neither hostname nor IP",
                name
            )));
        }

        let zones = zone_map(&self.provider.list_hosted_zones().await?);
        let zone_id = resolve_zone(&zones, &name).ok_or_else(|| Error::zone_not_found(&name))?;

        let batch = ChangeBatch {
            creates: record_pair(endpoint, zone_id, &self.tag).to_vec(),
            ..ChangeBatch::default()
        };
        self.apply(zone_id, &batch).await?;

        self.emit_event(ReconcileEvent::Processed {
            name,
            zone_id: zone_id.to_string(),
        });
        Ok(())
    }

    fn consumer_name(&self) -> &'static str {
        "reconcile"
    }
}
