//! Zone resolver
//!
//! Picks the most specific hosted zone for a record name: among the zones
//! whose name is a label-aligned suffix of the record name, the longest wins.

use crate::types::{ZoneMap, sanitize_dns_name};

/// Resolve the hosted zone ID that owns `record_name`.
///
/// Zone names match only at a label boundary, so `notexample.com` never
/// falls into `example.com`. Returns `None` when no zone matches.
pub fn resolve_zone<'a>(zones: &'a ZoneMap, record_name: &str) -> Option<&'a str> {
    let name = sanitize_dns_name(record_name);

    zones
        .iter()
        .map(|(zone_name, zone_id)| (sanitize_dns_name(zone_name), zone_id))
        .filter(|(zone_name, _)| is_label_suffix(&name, zone_name))
        .max_by_key(|(zone_name, _)| zone_name.len())
        .map(|(_, zone_id)| zone_id.as_str())
}

/// Both arguments must be canonical (trailing dot).
fn is_label_suffix(name: &str, zone: &str) -> bool {
    if name == zone {
        return true;
    }
    name.strip_suffix(zone)
        .is_some_and(|prefix| prefix.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zones() -> ZoneMap {
        [
            ("example.com", "id1"),
            ("test.com", "id2"),
            ("sub.test.com", "id3"),
            ("long-sub1.internal.example.com", "id4"),
            ("long-sub2.internal.example.com", "id5"),
        ]
        .into_iter()
        .map(|(name, id)| (name.to_string(), id.to_string()))
        .collect()
    }

    #[test]
    fn test_longest_suffix_wins() {
        let zones = zones();

        assert_eq!(resolve_zone(&zones, "name.example.com"), Some("id1"));
        assert_eq!(resolve_zone(&zones, "name.example.test.com"), Some("id2"));
        assert_eq!(resolve_zone(&zones, "name.sub.test.com"), Some("id3"));
        assert_eq!(
            resolve_zone(&zones, "name.long-sub1.internal.example.com"),
            Some("id4")
        );
        assert_eq!(
            resolve_zone(&zones, "name.long-sub2.internal.example.com"),
            Some("id5")
        );
    }

    #[test]
    fn test_matches_only_at_label_boundary() {
        let zones = zones();

        assert_eq!(resolve_zone(&zones, "notexample.com"), None);
        assert_eq!(resolve_zone(&zones, "name.mysub.test.com"), Some("id2"));
    }

    #[test]
    fn test_trailing_dots_are_ignored() {
        let mut zones = zones();
        zones.insert("foo.org.".to_string(), "id6".to_string());

        assert_eq!(resolve_zone(&zones, "a.foo.org"), Some("id6"));
        assert_eq!(resolve_zone(&zones, "a.example.com."), Some("id1"));
    }

    #[test]
    fn test_zone_apex_resolves_to_itself() {
        assert_eq!(resolve_zone(&zones(), "sub.test.com."), Some("id3"));
    }

    #[test]
    fn test_unknown_name_is_unresolved() {
        assert_eq!(resolve_zone(&zones(), "name.example.org"), None);
        assert_eq!(resolve_zone(&ZoneMap::new(), "name.example.com"), None);
    }
}
