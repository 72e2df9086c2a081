//! Dotted-path lookup with array branching.
//!
//! A lookup returns every value a path can reach. Without arrays on the way
//! that is exactly one entry, possibly `None` when a segment is missing.
//! Arrays found in the middle of the path branch: the next segment is tried
//! both as an index into the array and against each plain-object element.
//!
//! ```text
//! lookup("a.x", {a: {x: 1}})                               -> [1]
//! lookup("a.x", {a: {x: [1]}})                             -> [[1]]
//! lookup("a.x", {a: 5})                                    -> [undefined]
//! lookup("a.x", {a: [5]})                                  -> []
//! lookup("a.x", {a: [{x: 1}, [], 4, {x: [2]}, {y: 3}]})    -> [1, [2], undefined]
//! ```

use docket_core::{Document, Value};

/// Returns true if `part` is a non-empty run of ASCII digits.
#[inline]
pub fn is_numeric_key(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}

/// Something a path can be looked up in: a stored document or any value
/// (array elements under `$elemMatch` and `$pull` need the latter).
#[derive(Clone, Copy, Debug)]
pub enum LookupRoot<'a> {
    Document(&'a Document),
    Value(&'a Value),
}

impl<'a> LookupRoot<'a> {
    /// Wraps a value, unwrapping plain objects to their document.
    pub fn from_value(value: &'a Value) -> Self {
        match value {
            Value::Object(doc) => LookupRoot::Document(doc),
            other => LookupRoot::Value(other),
        }
    }

    /// Looks up a dotted path, returning one entry per branch.
    pub fn lookup(self, path: &str) -> Vec<Option<&'a Value>> {
        match self {
            LookupRoot::Document(doc) => lookup_document(doc, path),
            LookupRoot::Value(value) => lookup(value, path),
        }
    }

    /// The root as a document, if it is one.
    pub fn as_document(self) -> Option<&'a Document> {
        match self {
            LookupRoot::Document(doc) => Some(doc),
            LookupRoot::Value(value) => value.as_object(),
        }
    }
}

/// Looks up a dotted path in a document.
pub fn lookup_document<'a>(doc: &'a Document, path: &str) -> Vec<Option<&'a Value>> {
    let parts: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    descend(false, doc.get(parts[0]), &parts[1..], &mut out);
    out
}

/// Looks up a dotted path in an arbitrary value.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Vec<Option<&'a Value>> {
    let parts: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    lookup_parts(root, &parts, &mut out);
    out
}

fn lookup_parts<'a>(doc: &'a Value, parts: &[&str], out: &mut Vec<Option<&'a Value>>) {
    let first = parts[0];

    // An invalid index into an array yields no branch at all, which is
    // different from one undefined branch: null equality must not match it.
    if let Value::Array(items) = doc {
        match first.parse::<usize>() {
            Ok(idx) if is_numeric_key(first) && idx < items.len() => {}
            _ => return,
        }
    }

    descend(doc.is_array(), doc.child(first), &parts[1..], out);
}

fn descend<'a>(
    parent_is_array: bool,
    first_level: Option<&'a Value>,
    rest: &[&str],
    out: &mut Vec<Option<&'a Value>>,
) {
    if rest.is_empty() {
        out.push(first_level);
        return;
    }

    match first_level {
        Some(next) if next.is_indexable() => {
            lookup_parts(next, rest, out);
            if let Value::Array(items) = next {
                for branch in items.iter().filter(|b| b.is_plain_object()) {
                    lookup_parts(branch, rest, out);
                }
            }
        }
        // After an explicit index into an array there is nothing to report;
        // otherwise a single undefined branch (which still matches null).
        _ => {
            if !parent_is_array {
                out.push(None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docket_core::{doc, value};

    fn owned(branches: Vec<Option<&Value>>) -> Vec<Option<Value>> {
        branches.into_iter().map(|b| b.cloned()).collect()
    }

    #[test]
    fn test_lookup_plain_paths() {
        let d = doc!({"a": {"x": 1}});
        assert_eq!(owned(lookup_document(&d, "a.x")), vec![Some(value!(1))]);

        let d = doc!({"a": {"x": [1]}});
        assert_eq!(owned(lookup_document(&d, "a.x")), vec![Some(value!([1]))]);

        let d = doc!({"a": 5});
        assert_eq!(owned(lookup_document(&d, "a.x")), vec![None]);
        assert_eq!(owned(lookup_document(&d, "b")), vec![None]);
    }

    #[test]
    fn test_lookup_branches_into_objects_only() {
        let d = doc!({"a": [5]});
        assert!(lookup_document(&d, "a.x").is_empty());

        let d = doc!({"a": [{"x": 1}, [], 4, {"x": [2]}, {"y": 3}]});
        assert_eq!(
            owned(lookup_document(&d, "a.x")),
            vec![Some(value!(1)), Some(value!([2])), None]
        );
    }

    #[test]
    fn test_lookup_numeric_index() {
        let d = doc!({"a": [{"x": 1}, {"x": 2}]});
        assert_eq!(owned(lookup_document(&d, "a.1.x")), vec![Some(value!(2))]);
        assert!(lookup_document(&d, "a.7.x").is_empty());

        let d = doc!({"a": [[5]]});
        assert_eq!(owned(lookup_document(&d, "a.0")), vec![Some(value!([5]))]);
    }

    #[test]
    fn test_lookup_on_scalar_root() {
        let v = value!(5);
        assert_eq!(owned(LookupRoot::from_value(&v).lookup("x")), vec![None]);

        let v = value!({"x": 3});
        assert_eq!(owned(LookupRoot::from_value(&v).lookup("x")), vec![Some(value!(3))]);
    }

    #[test]
    fn test_numeric_key() {
        assert!(is_numeric_key("0"));
        assert!(is_numeric_key("01"));
        assert!(!is_numeric_key(""));
        assert!(!is_numeric_key("+1"));
        assert!(!is_numeric_key("1a"));
    }
}
