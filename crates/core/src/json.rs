//! Conversion between `serde_json` values and document values.
//!
//! Plain JSON maps one to one onto `Value`. Extended kinds project onto tagged
//! objects (`$date`, `$oid`, `$binary`, `$regex`, `$type`) when going back to
//! JSON; the reverse direction never interprets tags, so selectors such as
//! `{"$regex": "^a"}` stay plain objects.

use crate::document::Document;
use crate::value::Value;
use alloc::format;
use alloc::string::{String, ToString};
use serde_json::{Map, Number};

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(Document::from_json_map(map)),
        }
    }
}

impl Document {
    /// Builds a document from a JSON object map, keeping key order.
    pub fn from_json_map(map: Map<String, serde_json::Value>) -> Document {
        map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
    }

    /// Builds a document from any JSON value; non-objects give `None`.
    pub fn from_json(json: serde_json::Value) -> Option<Document> {
        match json {
            serde_json::Value::Object(map) => Some(Document::from_json_map(map)),
            _ => None,
        }
    }

    /// Projects the document onto JSON.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = Map::with_capacity(self.len());
        for (k, v) in self.iter() {
            map.insert(String::from(k), v.to_json());
        }
        serde_json::Value::Object(map)
    }
}

impl Value {
    /// Projects the value onto JSON, tagging the extended kinds.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(doc) => doc.to_json(),
            Value::Binary(bytes) => tagged("$binary", serde_json::Value::String(hex(bytes))),
            Value::Date(ms) => tagged("$date", serde_json::Value::from(*ms)),
            Value::ObjectId(h) => tagged("$oid", serde_json::Value::String(h.clone())),
            Value::Regex(re) => {
                let mut map = Map::new();
                map.insert("$regex".into(), serde_json::Value::String(re.pattern.clone()));
                map.insert("$options".into(), serde_json::Value::String(re.flags.clone()));
                serde_json::Value::Object(map)
            }
            Value::Custom(custom) => {
                let mut map = Map::new();
                map.insert("$type".into(), serde_json::Value::String(custom.type_name().into()));
                map.insert("$value".into(), custom.to_json_value().to_json());
                serde_json::Value::Object(map)
            }
        }
    }

    /// Serializes the value to a string that is equal for two values exactly
    /// when they are deep-equal.
    ///
    /// Unlike [`Value::to_json`], every node carries its `$type` code, so a
    /// date never collides with an object spelled `{"$date": ...}` and NaN
    /// never collides with null.
    pub fn canonical_key(&self) -> String {
        self.to_tagged_json().to_string()
    }

    fn to_tagged_json(&self) -> serde_json::Value {
        let payload = match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            // -0.0 + 0.0 is 0.0, matching numeric equality.
            Value::Number(n) => Number::from_f64(*n + 0.0)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String("NaN".into())),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_tagged_json).collect())
            }
            Value::Object(doc) => serde_json::Value::Array(
                doc.iter()
                    .map(|(k, v)| {
                        serde_json::Value::Array(alloc::vec![
                            serde_json::Value::String(String::from(k)),
                            v.to_tagged_json(),
                        ])
                    })
                    .collect(),
            ),
            Value::Binary(bytes) => serde_json::Value::String(hex(bytes)),
            Value::Date(ms) => serde_json::Value::from(*ms),
            Value::ObjectId(h) => serde_json::Value::String(h.clone()),
            Value::Regex(re) => serde_json::Value::Array(alloc::vec![
                serde_json::Value::String(re.pattern.clone()),
                serde_json::Value::String(re.flags.clone()),
            ]),
            Value::Custom(custom) => serde_json::Value::Array(alloc::vec![
                serde_json::Value::String(custom.type_name().into()),
                custom.to_json_value().to_tagged_json(),
            ]),
        };
        // Custom values share the object code; give them their own tag.
        let tag = match self {
            Value::Custom(_) => serde_json::Value::String("custom".into()),
            other => serde_json::Value::from(other.type_code()),
        };
        serde_json::Value::Array(alloc::vec![tag, payload])
    }
}

fn tagged(tag: &str, value: serde_json::Value) -> serde_json::Value {
    let mut map = Map::new();
    map.insert(tag.into(), value);
    serde_json::Value::Object(map)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::RegexValue;
    use alloc::vec;
    use serde_json::json;

    #[test]
    fn test_from_json_keeps_key_order() {
        let doc = Document::from_json(json!({"z": 1, "a": [true, null], "m": {"x": "y"}})).unwrap();
        let keys: alloc::vec::Vec<&str> = doc.keys().collect();
        assert_eq!(keys, ["z", "a", "m"]);
        assert_eq!(doc.get("z"), Some(&Value::Number(1.0)));
        assert_eq!(
            doc.get("a"),
            Some(&Value::Array(vec![Value::Bool(true), Value::Null]))
        );
    }

    #[test]
    fn test_from_json_non_object() {
        assert!(Document::from_json(json!([1, 2])).is_none());
    }

    #[test]
    fn test_extended_values_are_tagged() {
        assert_eq!(Value::Date(5).to_json(), json!({"$date": 5}));
        assert_eq!(Value::Binary(vec![1, 255]).to_json(), json!({"$binary": "01ff"}));
        assert_eq!(
            Value::Regex(RegexValue::new("^a", "i")).to_json(),
            json!({"$regex": "^a", "$options": "i"})
        );
    }

    #[test]
    fn test_canonical_key_distinguishes_key_order() {
        let a = Value::from(json!({"a": 1, "b": 2}));
        let b = Value::from(json!({"b": 2, "a": 1}));
        assert_ne!(a.canonical_key(), b.canonical_key());
        assert_eq!(a.canonical_key(), a.clone().canonical_key());
    }

    #[test]
    fn test_canonical_key_tags_types() {
        let pairs = [
            (Value::Number(f64::NAN), Value::Null),
            (Value::Date(5), Value::from(json!({"$date": 5}))),
            (Value::ObjectId("ab".into()), Value::from(json!({"$oid": "ab"}))),
            (Value::Binary(vec![1]), Value::from(json!({"$binary": "01"}))),
            (
                Value::Regex(RegexValue::new("^a", "i")),
                Value::from(json!({"$regex": "^a", "$options": "i"})),
            ),
            (Value::from("5"), Value::from(5)),
            (Value::Array(vec![]), Value::from(json!({}))),
        ];
        for (a, b) in pairs.iter() {
            assert_ne!(a.canonical_key(), b.canonical_key(), "{:?} vs {:?}", a, b);
        }
        assert_eq!(Value::Number(-0.0).canonical_key(), Value::Number(0.0).canonical_key());
        assert_eq!(
            Value::Number(f64::NAN).canonical_key(),
            Value::Number(f64::NAN).canonical_key()
        );
    }
}
