//! Change planner
//!
//! Pure diff between the desired endpoints and the live zone listings. No
//! provider calls happen here: listings go in, per-zone change batches come
//! out, so every ownership rule can be tested against plain snapshots.
//!
//! ## Rules
//!
//! 1. Endpoints are grouped by canonical name. When several endpoints claim
//!    the same name ("fighting services") the first one in input order wins,
//!    unless one of them already matches the live record owned by this
//!    installation, in which case the name is left alone.
//! 2. Endpoints whose name resolves to no hosted zone are dropped.
//! 3. A name held by another installation, or by an untagged record, is never
//!    touched.
//! 4. Owned names that are missing or point elsewhere are upserted as a
//!    (data record, TXT record) pair.
//! 5. Owned names in a zone that are no longer desired in that zone are
//!    deleted, using the live records from the listing.

use crate::ownership::{owned_records, record_info, record_target, same_target};
use crate::translate::{OwnershipTag, record_pair, to_record};
use crate::types::{ChangeBatch, Endpoint, Record, ZoneMap, sanitize_dns_name};
use crate::zone::resolve_zone;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Why a desired endpoint produced no change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No hosted zone is a suffix of the name
    NoZone,
    /// The zone's records could not be listed this pass
    ZoneUnavailable,
    /// Another endpoint won the name
    Duplicate,
    /// The name carries another installation's ownership tag
    ForeignOwner(String),
    /// The name has a data record but no ownership tag
    Untagged,
    /// Neither hostname nor IP is set
    NoTarget,
}

/// A desired endpoint the planner dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEndpoint {
    /// Canonical name
    pub name: String,
    pub reason: SkipReason,
}

/// Output of a planning pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Non-empty change batches keyed by hosted zone ID
    pub batches: BTreeMap<String, ChangeBatch>,
    /// Desired endpoints that produced no change, with the reason
    pub skipped: Vec<SkippedEndpoint>,
}

impl Plan {
    /// Whether applying the plan would change nothing
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Total number of record changes across all zones
    pub fn change_count(&self) -> usize {
        self.batches.values().map(ChangeBatch::len).sum()
    }

    /// Skip reasons recorded for a name (canonical or not)
    pub fn skip_reasons(&self, name: &str) -> Vec<&SkipReason> {
        let name = sanitize_dns_name(name);
        self.skipped
            .iter()
            .filter(|skipped| skipped.name == name)
            .map(|skipped| &skipped.reason)
            .collect()
    }

    fn skip(&mut self, name: &str, reason: SkipReason) {
        debug!("Skipping {}: {:?}", name, reason);
        self.skipped.push(SkippedEndpoint {
            name: name.to_string(),
            reason,
        });
    }
}

/// Endpoints competing for one name, in input order
struct Candidates<'a> {
    name: String,
    endpoints: Vec<&'a Endpoint>,
}

/// Whether the endpoint names a hostname or an IP to point at
pub fn has_target(endpoint: &Endpoint) -> bool {
    !endpoint.hostname.is_empty() || !endpoint.ip.is_empty()
}

/// Compute the per-zone changes that bring the listed zones in line with
/// `desired`.
///
/// `listings` holds the current records of every zone that could be listed
/// this pass, keyed by zone ID. Zones absent from `listings` are left
/// untouched and their desired endpoints are reported as
/// [`SkipReason::ZoneUnavailable`].
pub fn plan_changes(
    desired: &[Endpoint],
    zones: &ZoneMap,
    listings: &HashMap<String, Vec<Record>>,
    tag: &OwnershipTag,
) -> Plan {
    let mut plan = Plan::default();
    let mut by_zone: HashMap<String, Vec<Candidates<'_>>> = HashMap::new();
    let mut index: HashMap<String, (String, usize)> = HashMap::new();

    for endpoint in desired {
        let name = sanitize_dns_name(&endpoint.dns_name);

        if let Some((zone_id, position)) = index.get(&name) {
            if let Some(group) = by_zone.get_mut(zone_id) {
                group[*position].endpoints.push(endpoint);
            }
            continue;
        }

        let Some(zone_id) = resolve_zone(zones, &name) else {
            plan.skip(&name, SkipReason::NoZone);
            continue;
        };
        if !listings.contains_key(zone_id) {
            plan.skip(&name, SkipReason::ZoneUnavailable);
            continue;
        }

        let group = by_zone.entry(zone_id.to_string()).or_default();
        index.insert(name.clone(), (zone_id.to_string(), group.len()));
        group.push(Candidates {
            name,
            endpoints: vec![endpoint],
        });
    }

    for zone_id in zones.values() {
        let Some(records) = listings.get(zone_id) else {
            continue;
        };
        let candidates = by_zone.remove(zone_id).unwrap_or_default();
        let batch = plan_zone(&mut plan, zone_id, records, &candidates, tag);
        if !batch.is_empty() {
            plan.batches.insert(zone_id.clone(), batch);
        }
    }

    plan
}

fn plan_zone(
    plan: &mut Plan,
    zone_id: &str,
    records: &[Record],
    candidates: &[Candidates<'_>],
    tag: &OwnershipTag,
) -> ChangeBatch {
    let info = record_info(records);
    let mut batch = ChangeBatch::default();
    let mut desired_names: HashSet<&str> = HashSet::new();

    for candidate in candidates {
        desired_names.insert(candidate.name.as_str());

        let usable: Vec<&Endpoint> = candidate
            .endpoints
            .iter()
            .copied()
            .filter(|endpoint| has_target(endpoint))
            .collect();
        for _ in usable.len()..candidate.endpoints.len() {
            plan.skip(&candidate.name, SkipReason::NoTarget);
        }
        if usable.is_empty() {
            continue;
        }

        let current = info.get(&candidate.name);
        if let Some(current) = current
            && !tag.matches(&current.group_id)
        {
            let reason = if current.group_id.is_empty() {
                SkipReason::Untagged
            } else {
                SkipReason::ForeignOwner(current.group_id.clone())
            };
            for _ in &usable {
                plan.skip(&candidate.name, reason.clone());
            }
            continue;
        }

        let live_match = current.and_then(|current| {
            usable.iter().position(|endpoint| {
                let target = record_target(&to_record(endpoint, zone_id));
                same_target(&target, &current.target)
            })
        });
        let winner = live_match.unwrap_or(0);

        for (position, _) in usable.iter().enumerate() {
            if position != winner {
                plan.skip(&candidate.name, SkipReason::Duplicate);
            }
        }

        if live_match.is_some() {
            debug!("{} is up to date in zone {}", candidate.name, zone_id);
            continue;
        }

        debug!("Planning upsert of {} in zone {}", candidate.name, zone_id);
        batch.upserts.extend(record_pair(usable[winner], zone_id, tag));
    }

    let mut stale: Vec<&String> = info
        .iter()
        .filter(|(name, current)| {
            tag.matches(&current.group_id) && !desired_names.contains(name.as_str())
        })
        .map(|(name, _)| name)
        .collect();
    stale.sort();

    for name in stale {
        debug!("Planning delete of {} in zone {}", name, zone_id);
        batch
            .deletes
            .extend(owned_records(records, name).into_iter().cloned());
    }

    batch
}
