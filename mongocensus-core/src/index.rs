//! Index descriptor normalization.
//!
//! `listIndexes` replies vary across server versions: old servers stored
//! the namespace inline as `ns`, newer ones omit it; optional modifiers
//! appear only when set. Normalization maps any raw descriptor into the
//! uniform [`IndexRecord`] shape with explicit defaults.

use crate::models::IndexRecord;
use mongodb::bson::{Bson, Document};

/// Normalizes one raw index descriptor into a uniform record.
///
/// `namespace_fallback` is the `<db>.<collection>` namespace used when the
/// descriptor predates inline `ns` storage.
pub fn normalize_index(raw: &Document, namespace_fallback: &str) -> IndexRecord {
    let key = raw
        .get_document("key")
        .map(|key_doc| {
            key_doc
                .iter()
                .map(|(field, value)| (field.clone(), value.clone().into_relaxed_extjson()))
                .collect()
        })
        .unwrap_or_default();

    IndexRecord {
        name: raw.get_str("name").unwrap_or("unnamed").to_string(),
        key,
        unique: raw.get_bool("unique").unwrap_or(false),
        sparse: raw.get_bool("sparse").unwrap_or(false),
        background: raw.get_bool("background").unwrap_or(false),
        partial_filter_expression: raw
            .get_document("partialFilterExpression")
            .ok()
            .map(|d| Bson::Document(d.clone()).into_relaxed_extjson()),
        expire_after_seconds: get_integer(raw, "expireAfterSeconds"),
        text_index_version: get_integer(raw, "textIndexVersion"),
        weights: raw
            .get_document("weights")
            .ok()
            .map(|d| Bson::Document(d.clone()).into_relaxed_extjson()),
        default_language: raw.get_str("default_language").ok().map(str::to_string),
        language_override: raw.get_str("language_override").ok().map(str::to_string),
        version: get_integer(raw, "v"),
        namespace: raw
            .get_str("ns")
            .unwrap_or(namespace_fallback)
            .to_string(),
    }
}

/// Reads an integer property that the server may encode as i32, i64, or
/// double depending on version and magnitude.
fn get_integer(doc: &Document, key: &str) -> Option<i64> {
    match doc.get(key) {
        Some(Bson::Int64(v)) => Some(*v),
        Some(Bson::Int32(v)) => Some(i64::from(*v)),
        Some(Bson::Double(v)) => Some(*v as i64),
        _ => None,
    }
}
