//! Record translator
//!
//! Maps a desired [`Endpoint`] onto the provider record shape and derives the
//! paired TXT ownership record.

use crate::types::{Endpoint, Record, RecordType, sanitize_dns_name};
use std::fmt;

/// TTL for plain A and TXT records written by this installation
pub const DEFAULT_TTL: u32 = 300;

/// Prefix of every ownership tag
pub const OWNERSHIP_PREFIX: &str = "mate";

/// The literal TXT value marking a name as owned by one installation:
/// `"mate:<group id>"`, quotes included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnershipTag(String);

impl OwnershipTag {
    pub fn new(group_id: &str) -> Self {
        Self(format!("\"{}:{}\"", OWNERSHIP_PREFIX, group_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact-string comparison against a TXT value read from a provider
    pub fn matches(&self, value: &str) -> bool {
        self.0 == value
    }
}

impl fmt::Display for OwnershipTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Translate an endpoint into an A record in the given zone.
///
/// A non-empty hostname always produces an alias record, even when an IP is
/// also set.
pub fn to_record(endpoint: &Endpoint, zone_id: &str) -> Record {
    let name = sanitize_dns_name(&endpoint.dns_name);

    if !endpoint.hostname.is_empty() {
        return Record::alias(name, sanitize_dns_name(&endpoint.hostname), zone_id);
    }

    let values = if endpoint.ip.is_empty() {
        Vec::new()
    } else {
        vec![endpoint.ip.clone()]
    };
    Record::new(RecordType::A, name, values).with_ttl(DEFAULT_TTL)
}

/// Build the TXT ownership record that accompanies a data record
pub fn to_ownership_record(data: &Record, tag: &OwnershipTag) -> Record {
    Record::new(RecordType::Txt, data.name.clone(), vec![tag.as_str().to_string()])
        .with_ttl(DEFAULT_TTL)
}

/// Data record plus ownership record, in submission order
pub fn record_pair(endpoint: &Endpoint, zone_id: &str, tag: &OwnershipTag) -> [Record; 2] {
    let data = to_record(endpoint, zone_id);
    let owner = to_ownership_record(&data, tag);
    [data, owner]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname_and_ip_prefers_alias() {
        let ep = Endpoint::new("example.com", "10.202.10.123", "amazon.elb.com");
        let record = to_record(&ep, "test");

        assert_eq!(record.record_type, RecordType::A);
        assert_eq!(record.name, "example.com.");
        let alias = record.alias_target.expect("alias target");
        assert_eq!(alias.dns_name, "amazon.elb.com.");
        assert_eq!(alias.hosted_zone_id, "test");
        assert!(record.values.is_empty());
        assert_eq!(record.ttl, None);
    }

    #[test]
    fn test_ip_only_produces_plain_a_record() {
        let ep = Endpoint::with_ip("example.com", "10.202.10.123");
        let record = to_record(&ep, "test");

        assert_eq!(record.record_type, RecordType::A);
        assert_eq!(record.name, "example.com.");
        assert!(record.alias_target.is_none());
        assert_eq!(record.values, vec!["10.202.10.123".to_string()]);
        assert_eq!(record.ttl, Some(DEFAULT_TTL));
    }

    #[test]
    fn test_hostname_only_produces_alias() {
        let ep = Endpoint::with_hostname("example.com", "amazon.elb.com");
        let record = to_record(&ep, "test");

        assert_eq!(
            record.alias_target.map(|a| a.dns_name),
            Some("amazon.elb.com.".to_string())
        );
    }

    #[test]
    fn test_ownership_record() {
        let tag = OwnershipTag::new("test");
        let ep = Endpoint::new("example.com", "10.202.10.123", "amazon.elb.com");
        let txt = to_ownership_record(&to_record(&ep, "test"), &tag);

        assert_eq!(txt.record_type, RecordType::Txt);
        assert_eq!(txt.name, "example.com.");
        assert_eq!(txt.values, vec!["\"mate:test\"".to_string()]);
    }

    #[test]
    fn test_tag_is_quoted_and_compared_verbatim() {
        let tag = OwnershipTag::new("test");
        assert_eq!(tag.as_str(), "\"mate:test\"");
        assert!(tag.matches("\"mate:test\""));
        assert!(!tag.matches("mate:test"));
    }

    #[test]
    fn test_record_pair_shares_name() {
        let tag = OwnershipTag::new("g");
        let [data, owner] = record_pair(&Endpoint::with_ip("a.example.com.", "1.2.3.4"), "Z", &tag);
        assert_eq!(data.name, owner.name);
        assert!(owner.is_txt());
    }
}
