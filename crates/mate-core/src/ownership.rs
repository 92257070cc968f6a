//! Ownership scanner
//!
//! Reads a zone listing and works out, per name, which installation owns it
//! (the verbatim value of the name's TXT record) and where it currently
//! points (the target of its data record).

use crate::types::Record;
use std::collections::HashMap;

/// What a zone listing says about one name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordInfo {
    /// TXT ownership value, verbatim. Empty when the name has no TXT record.
    pub group_id: String,
    /// Alias target, or first value of the data record. Empty when the name
    /// only has a TXT record.
    pub target: String,
}

/// Target of a single record: the alias DNS name if present, otherwise the
/// first value. TXT records have no target.
pub fn record_target(record: &Record) -> String {
    if record.is_txt() {
        return String::new();
    }
    if let Some(alias) = &record.alias_target {
        return alias.dns_name.clone();
    }
    record.values.first().cloned().unwrap_or_default()
}

/// TXT value of an ownership record, `None` for malformed (valueless) TXT
fn ownership_value(record: &Record) -> Option<&str> {
    if !record.is_txt() {
        return None;
    }
    record.values.first().map(String::as_str)
}

/// Map every name with a well-formed TXT record to its ownership value
pub fn group_id_info(records: &[Record]) -> HashMap<String, String> {
    records
        .iter()
        .filter_map(|record| {
            ownership_value(record).map(|value| (record.name.clone(), value.to_string()))
        })
        .collect()
}

/// Map every name to its [`RecordInfo`].
///
/// TXT records without values are skipped, so a name that only carries such
/// a record has no entry at all. A name with a data record but no TXT record
/// yields an entry with an empty group id.
pub fn record_info(records: &[Record]) -> HashMap<String, RecordInfo> {
    let mut info: HashMap<String, RecordInfo> = HashMap::new();

    for record in records {
        if record.is_txt() {
            if let Some(value) = ownership_value(record) {
                info.entry(record.name.clone()).or_default().group_id = value.to_string();
            }
            continue;
        }

        let entry = info.entry(record.name.clone()).or_default();
        if entry.target.is_empty() {
            entry.target = record_target(record);
        }
    }

    info
}

/// The records making up the owned pair for `name`: its data record and its
/// TXT ownership record, as they appear in the listing.
///
/// A half-written pair yields only the member present, so a lone owned TXT
/// record is still cleaned up.
pub fn owned_records<'a>(records: &'a [Record], name: &str) -> Vec<&'a Record> {
    let data = records
        .iter()
        .find(|record| record.name == name && !record.is_txt());
    let owner = records
        .iter()
        .find(|record| record.name == name && record.is_txt());

    data.into_iter().chain(owner).collect()
}

/// Compare two targets, ignoring one trailing dot and ASCII case
pub fn same_target(a: &str, b: &str) -> bool {
    a.trim_end_matches('.')
        .eq_ignore_ascii_case(b.trim_end_matches('.'))
}
