//! Type-preserving document codec.
//!
//! Sampled documents are emitted in canonical (strict) Extended JSON so the
//! downstream compatibility checker can recover exact BSON types: 128-bit
//! decimals, binary blobs with subtype, millisecond datetimes, ObjectIds,
//! regular expressions with flags, min/max sentinels, and 64-bit integers
//! beyond safe-float range all survive the round trip.
//!
//! Deprecated BSON kinds the consumer has no mapping for (undefined,
//! symbol, DBPointer, JavaScript code) degrade to the relaxed best-effort
//! representation and flag the containing document instead of aborting the
//! export.

use crate::error::{CensusError, Result};
use mongodb::bson::{Bson, Document};
use serde_json::Value as JsonValue;

/// One document encoded for the sample stream.
#[derive(Debug, Clone)]
pub struct EncodedDocument {
    /// Canonical Extended JSON text, one line, no trailing newline.
    pub text: String,
    /// True when any value degraded to a best-effort plain representation.
    pub partial_encoding: bool,
}

/// Encodes a document as one line of canonical Extended JSON.
pub fn encode_document(doc: &Document) -> Result<EncodedDocument> {
    let mut partial_encoding = false;
    let mut map = serde_json::Map::with_capacity(doc.len());
    for (key, value) in doc {
        map.insert(key.clone(), encode_value(value, &mut partial_encoding));
    }

    let text = serde_json::to_string(&JsonValue::Object(map))
        .map_err(|e| CensusError::serialization("Extended JSON encoding", e))?;

    Ok(EncodedDocument {
        text,
        partial_encoding,
    })
}

/// Decodes one line of Extended JSON back into a document.
pub fn decode_document(text: &str) -> Result<Document> {
    let value: JsonValue = serde_json::from_str(text)
        .map_err(|e| CensusError::serialization("Extended JSON parsing", e))?;

    if !value.is_object() {
        return Err(CensusError::configuration(
            "Extended JSON line is not a document",
        ));
    }

    match Bson::try_from(value)
        .map_err(|e| CensusError::codec_failed("Extended JSON decoding", e))?
    {
        Bson::Document(doc) => Ok(doc),
        _ => Err(CensusError::configuration(
            "Extended JSON line is not a document",
        )),
    }
}

fn encode_value(value: &Bson, partial: &mut bool) -> JsonValue {
    match value {
        Bson::Document(doc) => {
            let mut map = serde_json::Map::with_capacity(doc.len());
            for (key, inner) in doc {
                map.insert(key.clone(), encode_value(inner, partial));
            }
            JsonValue::Object(map)
        }
        Bson::Array(items) => {
            JsonValue::Array(items.iter().map(|v| encode_value(v, partial)).collect())
        }
        Bson::Double(_)
        | Bson::String(_)
        | Bson::Boolean(_)
        | Bson::Null
        | Bson::Int32(_)
        | Bson::Int64(_)
        | Bson::Decimal128(_)
        | Bson::ObjectId(_)
        | Bson::DateTime(_)
        | Bson::Binary(_)
        | Bson::RegularExpression(_)
        | Bson::Timestamp(_)
        | Bson::MinKey
        | Bson::MaxKey => value.clone().into_canonical_extjson(),
        other => {
            tracing::debug!(
                "Degrading unrecognized BSON value to best-effort encoding: {}",
                other
            );
            *partial = true;
            other.clone().into_relaxed_extjson()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{
        Binary, DateTime, Decimal128, Regex, Timestamp, doc, oid::ObjectId, spec::BinarySubtype,
    };
    use std::str::FromStr;

    fn round_trip(doc: Document) {
        let encoded = encode_document(&doc).unwrap();
        assert!(!encoded.partial_encoding);
        let decoded = decode_document(&encoded.text).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn test_round_trip_object_id() {
        round_trip(doc! { "_id": ObjectId::new() });
    }

    #[test]
    fn test_round_trip_datetime_millisecond_precision() {
        round_trip(doc! { "createdAt": DateTime::from_millis(1_700_000_123_456) });
    }

    #[test]
    fn test_round_trip_decimal128() {
        let price = Decimal128::from_str("12345.6789").unwrap();
        round_trip(doc! { "price": price });
    }

    #[test]
    fn test_round_trip_binary_with_subtype() {
        let blob = Binary {
            subtype: BinarySubtype::Generic,
            bytes: vec![0xde, 0xad, 0xbe, 0xef],
        };
        round_trip(doc! { "payload": blob });
    }

    #[test]
    fn test_round_trip_int64_beyond_safe_float_range() {
        round_trip(doc! { "big": 9_007_199_254_740_993_i64 });
    }

    #[test]
    fn test_round_trip_regex_with_flags() {
        let pattern = Regex {
            pattern: "^ord-[0-9]+$".to_string(),
            options: "i".to_string(),
        };
        round_trip(doc! { "matcher": pattern });
    }

    #[test]
    fn test_round_trip_min_max_sentinels() {
        round_trip(doc! { "low": Bson::MinKey, "high": Bson::MaxKey });
    }

    #[test]
    fn test_round_trip_timestamp() {
        round_trip(doc! { "ts": Timestamp { time: 1_700_000_000, increment: 7 } });
    }

    #[test]
    fn test_round_trip_nested_mixed_document() {
        round_trip(doc! {
            "order": {
                "items": [ { "sku": "a-1", "qty": 2_i32 }, { "sku": "b-2", "qty": 1_i32 } ],
                "total": Decimal128::from_str("99.95").unwrap(),
            },
            "placed": DateTime::from_millis(1_700_000_000_000),
        });
    }

    #[test]
    fn test_decimal_and_binary_keep_type_tags() {
        // Scenario: a document with a 128-bit decimal and a binary field
        // must decode to the original types, not plain numbers/strings.
        let doc = doc! {
            "amount": Decimal128::from_str("0.1").unwrap(),
            "digest": Binary { subtype: BinarySubtype::Md5, bytes: vec![1, 2, 3] },
        };
        let encoded = encode_document(&doc).unwrap();
        assert!(encoded.text.contains("$numberDecimal"));
        assert!(encoded.text.contains("$binary"));

        let decoded = decode_document(&encoded.text).unwrap();
        assert!(matches!(decoded.get("amount"), Some(Bson::Decimal128(_))));
        assert!(matches!(decoded.get("digest"), Some(Bson::Binary(_))));
    }

    #[test]
    fn test_deprecated_kind_sets_partial_flag() {
        let doc = doc! { "legacy": Bson::Undefined, "name": "ok" };
        let encoded = encode_document(&doc).unwrap();
        assert!(encoded.partial_encoding);
    }

    #[test]
    fn test_partial_flag_propagates_from_nested_values() {
        let doc = doc! { "outer": { "inner": [Bson::Symbol("old".to_string())] } };
        let encoded = encode_document(&doc).unwrap();
        assert!(encoded.partial_encoding);
    }

    #[test]
    fn test_decode_rejects_non_document_line() {
        assert!(decode_document("[1, 2, 3]").is_err());
        assert!(decode_document("not json").is_err());
    }

    #[test]
    fn test_encoding_is_single_line() {
        let encoded = encode_document(&doc! { "a": { "b": [1, 2, 3] } }).unwrap();
        assert!(!encoded.text.contains('\n'));
    }
}
