//! Document identifiers.

use crate::value::Value;
use alloc::string::{String, ToString};
use core::fmt;

/// The `_id` of a stored document.
///
/// Strings and ObjectIds are the only accepted id types. Two ids of different
/// kinds never collide even when their text is the same.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocId {
    /// A plain string id.
    String(String),
    /// A 24-character hex ObjectId.
    ObjectId(String),
}

impl DocId {
    /// Reads an id out of a value, if the value is an id type.
    pub fn from_value(value: &Value) -> Option<DocId> {
        match value {
            Value::String(s) => Some(DocId::String(s.clone())),
            Value::ObjectId(hex) => Some(DocId::ObjectId(hex.clone())),
            _ => None,
        }
    }

    /// Converts the id back into the value stored under `_id`.
    pub fn to_value(&self) -> Value {
        match self {
            DocId::String(s) => Value::String(s.clone()),
            DocId::ObjectId(hex) => Value::ObjectId(hex.clone()),
        }
    }

    /// Returns the id text.
    #[inline]
    pub fn as_str(&self) -> &str {
        match self {
            DocId::String(s) | DocId::ObjectId(s) => s.as_str(),
        }
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocId::String(s) => f.write_str(s),
            DocId::ObjectId(hex) => write!(f, "ObjectId({})", hex),
        }
    }
}

impl From<&str> for DocId {
    fn from(s: &str) -> Self {
        DocId::String(s.to_string())
    }
}

impl From<String> for DocId {
    fn from(s: String) -> Self {
        DocId::String(s)
    }
}

impl PartialEq<str> for DocId {
    fn eq(&self, other: &str) -> bool {
        matches!(self, DocId::String(s) if s == other)
    }
}

impl PartialEq<&str> for DocId {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, DocId::String(s) if s == *other)
    }
}
