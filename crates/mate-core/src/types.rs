//! Data model shared by the translator, scanner, planner and providers
//!
//! Names handled by the engine are always canonical: exactly one trailing
//! dot (see [`sanitize_dns_name`]). Providers hand back names in that form
//! and the engine compares them with plain string equality.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Hosted zone name → hosted zone ID
pub type ZoneMap = BTreeMap<String, String>;

/// Desired state for a single DNS name, as produced by an endpoint source
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// The DNS name to publish
    pub dns_name: String,

    /// Literal IPv4 target (may be empty)
    #[serde(default)]
    pub ip: String,

    /// Load balancer hostname target (may be empty). Wins over `ip`.
    #[serde(default)]
    pub hostname: String,
}

impl Endpoint {
    /// Create an endpoint with both targets given explicitly
    pub fn new(
        dns_name: impl Into<String>,
        ip: impl Into<String>,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            dns_name: dns_name.into(),
            ip: ip.into(),
            hostname: hostname.into(),
        }
    }

    /// Endpoint pointing at a load balancer hostname
    pub fn with_hostname(dns_name: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self::new(dns_name, "", hostname)
    }

    /// Endpoint pointing at a literal IP address
    pub fn with_ip(dns_name: impl Into<String>, ip: impl Into<String>) -> Self {
        Self::new(dns_name, ip, "")
    }
}

/// A DNS zone this installation may write into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedZone {
    /// Provider-assigned zone ID
    pub id: String,
    /// Zone name, canonical form
    pub name: String,
}

impl HostedZone {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: sanitize_dns_name(&name.into()),
        }
    }
}

/// Build the name → ID lookup used by the zone resolver
pub fn zone_map(zones: &[HostedZone]) -> ZoneMap {
    zones
        .iter()
        .map(|zone| (zone.name.clone(), zone.id.clone()))
        .collect()
}

/// Resource record type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Txt,
    /// Any type the engine never writes (MX, NS, SOA, ...)
    Other(String),
}

impl RecordType {
    /// Parse a provider type string, e.g. "A" or "txt"
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "CNAME" => RecordType::Cname,
            "TXT" => RecordType::Txt,
            other => RecordType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => write!(f, "A"),
            RecordType::Aaaa => write!(f, "AAAA"),
            RecordType::Cname => write!(f, "CNAME"),
            RecordType::Txt => write!(f, "TXT"),
            RecordType::Other(other) => write!(f, "{}", other),
        }
    }
}

/// Provider-side alias target, resolved by the provider at query time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTarget {
    pub dns_name: String,
    pub hosted_zone_id: String,
}

/// A provider-shaped resource record set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub record_type: RecordType,
    /// Fully qualified, trailing dot
    pub name: String,
    pub alias_target: Option<AliasTarget>,
    /// Ordered values; empty for alias records
    pub values: Vec<String>,
    /// Seconds; `None` for alias records
    pub ttl: Option<u32>,
}

impl Record {
    /// Plain record with the given values
    pub fn new(record_type: RecordType, name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            record_type,
            name: name.into(),
            alias_target: None,
            values,
            ttl: None,
        }
    }

    /// Alias A record
    pub fn alias(
        name: impl Into<String>,
        dns_name: impl Into<String>,
        hosted_zone_id: impl Into<String>,
    ) -> Self {
        Self {
            record_type: RecordType::A,
            name: name.into(),
            alias_target: Some(AliasTarget {
                dns_name: dns_name.into(),
                hosted_zone_id: hosted_zone_id.into(),
            }),
            values: Vec::new(),
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn is_txt(&self) -> bool {
        self.record_type == RecordType::Txt
    }
}

/// Kind of change submitted to a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Create,
    Upsert,
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Create => write!(f, "CREATE"),
            ChangeKind::Upsert => write!(f, "UPSERT"),
            ChangeKind::Delete => write!(f, "DELETE"),
        }
    }
}

/// All changes for one hosted zone, submitted as a single unit.
///
/// Records always come in (data record, ownership record) pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    pub creates: Vec<Record>,
    pub upserts: Vec<Record>,
    pub deletes: Vec<Record>,
}

impl ChangeBatch {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.upserts.is_empty() && self.deletes.is_empty()
    }

    /// Total number of record changes in the batch
    pub fn len(&self) -> usize {
        self.creates.len() + self.upserts.len() + self.deletes.len()
    }

    /// Records of one change kind
    pub fn records(&self, kind: ChangeKind) -> &[Record] {
        match kind {
            ChangeKind::Create => &self.creates,
            ChangeKind::Upsert => &self.upserts,
            ChangeKind::Delete => &self.deletes,
        }
    }

    /// Iterate over every change in submission order: deletes, creates, upserts
    pub fn changes(&self) -> impl Iterator<Item = (ChangeKind, &Record)> {
        self.deletes
            .iter()
            .map(|r| (ChangeKind::Delete, r))
            .chain(self.creates.iter().map(|r| (ChangeKind::Create, r)))
            .chain(self.upserts.iter().map(|r| (ChangeKind::Upsert, r)))
    }
}

/// Normalize a DNS name to its canonical form: surrounding whitespace
/// removed and exactly one trailing dot.
pub fn sanitize_dns_name(name: &str) -> String {
    let trimmed = name.trim().trim_end_matches('.');
    format!("{}.", trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_adds_single_trailing_dot() {
        assert_eq!(sanitize_dns_name("example.com"), "example.com.");
        assert_eq!(sanitize_dns_name("example.com."), "example.com.");
        assert_eq!(sanitize_dns_name("example.com.."), "example.com.");
        assert_eq!(sanitize_dns_name(" www.example.com "), "www.example.com.");
    }

    #[test]
    fn test_record_type_parse_roundtrip() {
        assert_eq!(RecordType::parse("txt"), RecordType::Txt);
        assert_eq!(RecordType::parse("CNAME"), RecordType::Cname);
        assert_eq!(RecordType::parse("MX"), RecordType::Other("MX".to_string()));
        assert_eq!(RecordType::Aaaa.to_string(), "AAAA");
    }

    #[test]
    fn test_change_batch_order_and_len() {
        let batch = ChangeBatch {
            creates: vec![Record::new(RecordType::A, "c.example.com.", vec![])],
            upserts: vec![Record::new(RecordType::A, "u.example.com.", vec![])],
            deletes: vec![Record::new(RecordType::A, "d.example.com.", vec![])],
        };

        let kinds: Vec<_> = batch.changes().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, vec![ChangeKind::Delete, ChangeKind::Create, ChangeKind::Upsert]);
        assert_eq!(batch.len(), 3);
        assert!(!batch.is_empty());
        assert!(ChangeBatch::default().is_empty());
    }

    #[test]
    fn test_hosted_zone_name_is_canonical() {
        let zone = HostedZone::new("Z1", "example.com");
        assert_eq!(zone.name, "example.com.");
        assert_eq!(zone_map(&[zone]).get("example.com."), Some(&"Z1".to_string()));
    }

    #[test]
    fn test_endpoint_deserializes_with_missing_targets() {
        let ep: Endpoint = serde_json::from_str(r#"{"dns_name":"a.example.com"}"#).unwrap();
        assert_eq!(ep, Endpoint::new("a.example.com", "", ""));
    }
}
