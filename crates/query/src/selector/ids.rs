//! Id extraction for selectors that pin `_id`.

use docket_core::{DocId, Value, ID_FIELD};
use hashbrown::HashSet;

/// Returns true if the selector is a bare id (string, number or ObjectId).
#[inline]
pub fn selector_is_id(selector: &Value) -> bool {
    matches!(
        selector,
        Value::String(_) | Value::Number(_) | Value::ObjectId(_)
    )
}

/// Returns true for a bare id or `{_id: <id>}` with no other keys.
pub fn selector_is_id_perhaps_as_object(selector: &Value) -> bool {
    if selector_is_id(selector) {
        return true;
    }
    match selector {
        Value::Object(doc) => {
            doc.len() == 1 && doc.get(ID_FIELD).map_or(false, selector_is_id)
        }
        _ => false,
    }
}

/// Returns the ids a selector is limited to, if it pins `_id` to a
/// fixed set.
///
/// Recognizes a bare id, `{_id: id}`, `{_id: {$in: [ids]}}` and those same
/// forms nested in a top-level `$and`. Numeric ids never name a stored
/// document and are dropped from the result; repeated ids appear once.
pub fn ids_matched_by_selector(selector: &Value) -> Option<Vec<DocId>> {
    if selector_is_id(selector) {
        return Some(DocId::from_value(selector).into_iter().collect());
    }

    let doc = selector.as_object()?;
    if let Some(id) = doc.get(ID_FIELD) {
        if selector_is_id(id) {
            return Some(DocId::from_value(id).into_iter().collect());
        }
        if let Some(Value::Array(candidates)) = id.as_object().and_then(|ops| ops.get("$in")) {
            if !candidates.is_empty() && candidates.iter().all(selector_is_id) {
                let mut seen = HashSet::with_capacity(candidates.len());
                return Some(
                    candidates
                        .iter()
                        .filter_map(DocId::from_value)
                        .filter(|id| seen.insert(id.clone()))
                        .collect(),
                );
            }
        }
        return None;
    }

    if let Some(Value::Array(branches)) = doc.get("$and") {
        return branches.iter().find_map(ids_matched_by_selector);
    }

    None
}
