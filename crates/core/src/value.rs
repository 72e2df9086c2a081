//! Value type definitions for Docket.
//!
//! This module defines the `Value` enum which represents anything that can
//! appear inside a document: JSON scalars, arrays, nested documents and the
//! extended scalar kinds (binary, dates, ObjectIds, regexes, custom types).

use crate::compare::values_equal;
use crate::document::Document;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

/// `$type` code of numbers.
pub const TYPE_NUMBER: u8 = 1;
/// `$type` code of strings.
pub const TYPE_STRING: u8 = 2;
/// `$type` code of objects (custom values included).
pub const TYPE_OBJECT: u8 = 3;
/// `$type` code of arrays.
pub const TYPE_ARRAY: u8 = 4;
/// `$type` code of binary values.
pub const TYPE_BINARY: u8 = 5;
/// `$type` code of ObjectIds.
pub const TYPE_OBJECT_ID: u8 = 7;
/// `$type` code of booleans.
pub const TYPE_BOOL: u8 = 8;
/// `$type` code of dates.
pub const TYPE_DATE: u8 = 9;
/// `$type` code of null.
pub const TYPE_NULL: u8 = 10;
/// `$type` code of regexes.
pub const TYPE_REGEX: u8 = 11;

/// A user-defined scalar type.
///
/// Custom values take part in matching and sorting through their canonical
/// JSON projection and are compared for equality with `equals`.
pub trait CustomValue: fmt::Debug {
    /// Name of the type, used in canonical JSON and equality.
    fn type_name(&self) -> &str;

    /// The canonical JSON projection of this value.
    fn to_json_value(&self) -> Value;

    /// Tests equality with another custom value.
    fn equals(&self, other: &dyn CustomValue) -> bool {
        self.type_name() == other.type_name()
            && values_equal(&self.to_json_value(), &other.to_json_value())
    }
}

/// A regular expression literal: source pattern plus flag letters.
///
/// Compilation happens in the query crate; here it is plain data.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RegexValue {
    pub pattern: String,
    pub flags: String,
}

impl RegexValue {
    /// Creates a regex literal.
    pub fn new(pattern: impl Into<String>, flags: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            flags: flags.into(),
        }
    }
}

/// A value stored in a document.
#[derive(Clone)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Every number is a double
    Number(f64),
    /// UTF-8 string
    String(String),
    /// Ordered array
    Array(Vec<Value>),
    /// Nested document
    Object(Document),
    /// Byte array
    Binary(Vec<u8>),
    /// Date as Unix timestamp in milliseconds
    Date(i64),
    /// ObjectId as lowercase hex
    ObjectId(String),
    /// Regular expression literal
    Regex(RegexValue),
    /// Extension type
    Custom(Rc<dyn CustomValue>),
}

impl Value {
    /// Returns the `$type` code of this value.
    pub fn type_code(&self) -> u8 {
        match self {
            Value::Null => TYPE_NULL,
            Value::Bool(_) => TYPE_BOOL,
            Value::Number(_) => TYPE_NUMBER,
            Value::String(_) => TYPE_STRING,
            Value::Array(_) => TYPE_ARRAY,
            Value::Object(_) | Value::Custom(_) => TYPE_OBJECT,
            Value::Binary(_) => TYPE_BINARY,
            Value::Date(_) => TYPE_DATE,
            Value::ObjectId(_) => TYPE_OBJECT_ID,
            Value::Regex(_) => TYPE_REGEX,
        }
    }

    /// Returns the rank of this value's type in the cross-type sort order.
    ///
    /// null < numbers < strings < objects < arrays < binary < ObjectIds
    /// < booleans < dates < regexes.
    pub fn type_order(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Number(_) => 1,
            Value::String(_) => 2,
            Value::Object(_) | Value::Custom(_) => 3,
            Value::Array(_) => 4,
            Value::Binary(_) => 5,
            Value::ObjectId(_) => 6,
            Value::Bool(_) => 7,
            Value::Date(_) => 8,
            Value::Regex(_) => 9,
        }
    }

    /// Returns true if this value is Null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if this value is an array.
    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Returns true for plain documents (not arrays, not custom values).
    #[inline]
    pub fn is_plain_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Returns true if a dotted path can descend into this value.
    #[inline]
    pub fn is_indexable(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Object(_))
    }

    /// JavaScript-style falsiness: null, false, 0, NaN and "".
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Number(n) => *n == 0.0 || n.is_nan(),
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Returns the boolean value if this is a Bool, None otherwise.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the number if this is a Number, None otherwise.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a reference to the string if this is a String, None otherwise.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Returns the elements if this is an Array.
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the elements mutably if this is an Array.
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the document if this is an Object.
    pub fn as_object(&self) -> Option<&Document> {
        match self {
            Value::Object(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the document mutably if this is an Object.
    pub fn as_object_mut(&mut self) -> Option<&mut Document> {
        match self {
            Value::Object(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the regex literal if this is a Regex.
    pub fn as_regex(&self) -> Option<&RegexValue> {
        match self {
            Value::Regex(v) => Some(v),
            _ => None,
        }
    }

    /// Looks up a direct child: a key of an object or a numeric index of an array.
    pub fn child(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(doc) => doc.get(key),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Object(doc) => fmt::Debug::fmt(doc, f),
            Value::Binary(bytes) => write!(f, "Binary({:?})", bytes),
            Value::Date(ms) => write!(f, "Date({})", ms),
            Value::ObjectId(hex) => write!(f, "ObjectId({})", hex),
            Value::Regex(re) => write!(f, "/{}/{}", re.pattern, re.flags),
            Value::Custom(c) => write!(f, "{}({:?})", c.type_name(), c.to_json_value()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        values_equal(self, other)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<Document> for Value {
    fn from(v: Document) -> Self {
        Value::Object(v)
    }
}

impl From<RegexValue> for Value {
    fn from(v: RegexValue) -> Self {
        Value::Regex(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}
