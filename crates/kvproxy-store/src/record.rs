//! Record model and the JSON wire codec spoken by the proxy.
//!
//! A record travels as a JSON object mapping field names to standard base64
//! strings, which is how the proxy's Go clients marshal `map[string][]byte`.
//! On `get`, the proxy may hand the object back wrapped in a JSON string
//! literal (double encoded); [`ResponseEncoding`] selects which form a store
//! expects.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

/// One logical row: field name to raw value bytes.
pub type Record = HashMap<String, Bytes>;

/// Wire identifier of a record. Slashes inside `table` or `key` are not
/// escaped, so `("a/b", "c")` and `("a", "b/c")` share a key.
pub fn composite_key(table: &str, key: &str) -> String {
    let mut out = String::with_capacity(table.len() + key.len() + 1);
    out.push_str(table);
    out.push('/');
    out.push_str(key);
    out
}

/// Shape of the `/redis/get` response body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseEncoding {
    /// The record object serialized once more as a JSON string literal,
    /// e.g. `"{\"name\":\"YWxpY2U=\"}"`.
    #[default]
    Quoted,
    /// The record object as plain JSON.
    Json,
}

/// Serialize a record into the `value` form field of `/redis/set`.
pub fn encode_record(record: &Record) -> Result<String> {
    let object: Map<String, Value> = record
        .iter()
        .map(|(field, value)| (field.clone(), Value::String(STANDARD.encode(value))))
        .collect();
    Ok(serde_json::to_string(&object)?)
}

/// Decode a `/redis/get` response body.
///
/// An empty body, `null`, or an empty quoted string is a missing record and
/// decodes to an empty map.
pub fn decode_record(body: &str, encoding: ResponseEncoding) -> Result<Record> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Record::new());
    }

    let parsed: Value = serde_json::from_str(trimmed).map_err(|e| StoreError::decode(e, body))?;

    let object = match (encoding, parsed) {
        (_, Value::Null) => return Ok(Record::new()),
        (ResponseEncoding::Json, Value::Object(object)) => object,
        (ResponseEncoding::Json, _) => {
            return Err(StoreError::decode("expected a JSON object", body));
        }
        (ResponseEncoding::Quoted, Value::String(inner)) => {
            let inner = inner.trim();
            if inner.is_empty() {
                return Ok(Record::new());
            }
            match serde_json::from_str(inner).map_err(|e| StoreError::decode(e, body))? {
                Value::Object(object) => object,
                Value::Null => return Ok(Record::new()),
                _ => return Err(StoreError::decode("quoted payload is not a JSON object", body)),
            }
        }
        (ResponseEncoding::Quoted, _) => {
            return Err(StoreError::decode("expected a JSON string literal", body));
        }
    };

    object
        .into_iter()
        .map(|(field, value)| {
            let Value::String(encoded) = value else {
                return Err(StoreError::decode(
                    format!("field '{field}' is not a string"),
                    body,
                ));
            };
            let raw = STANDARD
                .decode(encoded.as_bytes())
                .map_err(|e| StoreError::decode(format!("field '{field}': {e}"), body))?;
            Ok((field, Bytes::from(raw)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Bytes::from(v.to_string())))
            .collect()
    }

    /// Wrap a JSON document the way a double-encoding proxy does.
    fn quote(inner: &str) -> String {
        serde_json::to_string(inner).unwrap()
    }

    #[test]
    fn test_composite_key() {
        assert_eq!(composite_key("users", "u1"), "users/u1");
        assert_eq!(composite_key("", ""), "/");
        assert_eq!(composite_key("a/b", "c"), composite_key("a", "b/c"));
    }

    #[test]
    fn test_encode_uses_base64_values() {
        let encoded = encode_record(&record(&[("name", "alice")])).unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value, json!({"name": "YWxpY2U="}));
    }

    #[test]
    fn test_decode_plain_json() {
        let decoded = decode_record(r#"{"name":"YWxpY2U="}"#, ResponseEncoding::Json).unwrap();
        assert_eq!(decoded, record(&[("name", "alice")]));
    }

    #[test]
    fn test_decode_quoted_json() {
        let body = quote(r#"{"name":"YWxpY2U=","age":"MzA="}"#);
        let decoded = decode_record(&body, ResponseEncoding::Quoted).unwrap();
        assert_eq!(decoded, record(&[("name", "alice"), ("age", "30")]));
    }

    #[test]
    fn test_decode_quoted_with_escaped_quote_in_field_name() {
        let original = record(&[("say \"hi\"", "x")]);
        let body = quote(&encode_record(&original).unwrap());
        assert!(body.contains(r#"\\\""#));
        assert_eq!(decode_record(&body, ResponseEncoding::Quoted).unwrap(), original);
    }

    #[test]
    fn test_decode_escaped_slashes() {
        // "??>" encodes to "Pz8+", "???" to "Pz8/"; some proxies emit "\/".
        let body = quote(r#"{"path\/name":"Pz8\/"}"#);
        let decoded = decode_record(&body, ResponseEncoding::Quoted).unwrap();
        assert_eq!(decoded, record(&[("path/name", "???")]));
    }

    #[test]
    fn test_decode_missing_record() {
        for encoding in [ResponseEncoding::Quoted, ResponseEncoding::Json] {
            assert!(decode_record("", encoding).unwrap().is_empty());
            assert!(decode_record("null", encoding).unwrap().is_empty());
        }
        assert!(decode_record(r#""""#, ResponseEncoding::Quoted).unwrap().is_empty());
    }

    #[test]
    fn test_decode_wrong_shape_is_error() {
        let err = decode_record(r#"{"name":"YWxpY2U="}"#, ResponseEncoding::Quoted).unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));

        let err = decode_record(&quote("{}"), ResponseEncoding::Json).unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));

        let err = decode_record(r#"{"n":1}"#, ResponseEncoding::Json).unwrap_err();
        assert!(err.to_string().contains("field 'n' is not a string"));
    }

    #[test]
    fn test_decode_malformed_keeps_body() {
        match decode_record("{not json", ResponseEncoding::Json).unwrap_err() {
            StoreError::Decode { body, .. } => assert_eq!(body, "{not json"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_invalid_base64() {
        let err = decode_record(r#"{"name":"alice"}"#, ResponseEncoding::Json).unwrap_err();
        assert!(err.to_string().contains("field 'name'"));
    }
}
