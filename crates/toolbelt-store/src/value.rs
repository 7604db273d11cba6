//! Firestore typed-value codec.
//!
//! The REST API wraps every value in a single-key object naming its type
//! (`{"stringValue": "x"}`, `{"integerValue": "3"}`, ...). Decoding flattens
//! these into plain [`serde_json::Value`]s; timestamps, references, and bytes
//! stay strings.

use crate::document::StoreError;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Decode a document's `fields` object.
pub fn decode_fields(fields: &Map<String, Value>) -> Result<BTreeMap<String, Value>, StoreError> {
    fields
        .iter()
        .map(|(k, v)| Ok((k.clone(), decode_value(v)?)))
        .collect()
}

/// Decode one typed value.
pub fn decode_value(typed: &Value) -> Result<Value, StoreError> {
    let obj = typed
        .as_object()
        .ok_or_else(|| StoreError::Decode(format!("typed value is not an object: {typed}")))?;
    let (kind, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| StoreError::Decode("empty typed value".to_string()))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" | "doubleValue" | "geoPointValue" => Ok(inner.clone()),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => Ok(inner.clone()),
        // int64 travels as a decimal string to survive JSON number precision.
        "integerValue" => match inner {
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| StoreError::Decode(format!("bad integerValue {s:?}: {e}"))),
            Value::Number(_) => Ok(inner.clone()),
            other => Err(StoreError::Decode(format!("bad integerValue {other}"))),
        },
        "mapValue" => {
            let fields = inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .transpose()?
                .unwrap_or_default();
            Ok(Value::Object(fields.into_iter().collect()))
        }
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|vs| vs.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
                .transpose()?
                .unwrap_or_default();
            Ok(Value::Array(values))
        }
        other => Err(StoreError::Decode(format!("unknown value type {other:?}"))),
    }
}

pub fn encode_string(s: &str) -> Value {
    json!({ "stringValue": s })
}
