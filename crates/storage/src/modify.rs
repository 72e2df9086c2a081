//! Update modifiers.
//!
//! [`modify`] computes the document an update produces without touching its
//! input; a modifier that fails part-way leaves nothing half-applied.
//!
//! A modifier whose first key starts with `$` is a set of operators applied
//! in order. Anything else replaces the document wholesale, keeping `_id`.
//!
//! Dotted keypaths are resolved against the document with these rules:
//!
//! - a numeric part indexes an array, padding it with `null` up to the index
//!   and appending `{}` when a further part follows
//! - a non-numeric part cannot index an array
//! - a missing intermediate becomes an object keyed by the part
//! - scalars (including `null`) cannot be traversed
//!
//! `$unset`, `$pop`, `$pull`, `$pullAll` and `$rename` never create
//! anything along the path; a missing path makes them no-ops.

use docket_core::{values_equal, Document, Error, Result, Value, ID_FIELD};
use docket_query::lookup::is_numeric_key;
use docket_query::{compile_selector, compile_sort, compile_value_matcher};

/// Applies `modifier` to `doc` and returns the resulting document.
pub fn modify(doc: &Document, modifier: &Value) -> Result<Document> {
    let spec = modifier
        .as_object()
        .ok_or_else(|| Error::modifier(format!("Modifier must be an object, got {:?}", modifier)))?;
    let is_operator_update = spec.keys().next().map_or(false, |k| k.starts_with('$'));

    let new_doc = if is_operator_update {
        let mut new_doc = doc.clone();
        for (op, operand) in spec.iter() {
            apply_operator(&mut new_doc, op, operand)?;
        }
        new_doc
    } else {
        check_replacement(doc, spec)?;
        spec.clone()
    };

    Ok(keep_id(doc, new_doc))
}

/// Puts the original `_id` first, whatever the modifier did to it.
fn keep_id(old: &Document, new_doc: Document) -> Document {
    match old.get(ID_FIELD) {
        Some(id) => {
            let mut out = Document::with_capacity(new_doc.len() + 1);
            out.insert(ID_FIELD, id.clone());
            for (key, value) in new_doc {
                if key != ID_FIELD {
                    out.insert(key, value);
                }
            }
            out
        }
        None => new_doc,
    }
}

fn check_replacement(old: &Document, replacement: &Document) -> Result<()> {
    for (key, value) in replacement.iter() {
        if key.starts_with('$') {
            return Err(Error::modifier(format!(
                "When replacing document, field name may not start with '$': {}",
                key
            )));
        }
        if key.contains('.') {
            return Err(Error::modifier(format!(
                "When replacing document, field name may not contain '.': {}",
                key
            )));
        }
        if key == ID_FIELD && old.get(ID_FIELD).map_or(false, |id| !values_equal(id, value)) {
            return Err(Error::modifier("The _id field cannot be changed"));
        }
    }
    Ok(())
}

type OperatorFn = fn(&mut Slot<'_>, &Value) -> Result<()>;

fn apply_operator(doc: &mut Document, op: &str, operand: &Value) -> Result<()> {
    let (apply, no_create): (OperatorFn, bool) = match op {
        "$set" => (op_set, false),
        "$unset" => (op_unset, true),
        "$inc" => (op_inc, false),
        "$push" => (op_push, false),
        "$pushAll" => (op_push_all, false),
        "$addToSet" => (op_add_to_set, false),
        "$pop" => (op_pop, true),
        "$pull" => (op_pull, true),
        "$pullAll" => (op_pull_all, true),
        "$rename" => {
            for (keypath, arg) in operand_fields(op, operand)? {
                rename(doc, keypath, &split_keypath(keypath)?, arg)?;
            }
            return Ok(());
        }
        // Only meaningful for upserts, which collections do not perform.
        "$setOnInsert" => return Ok(()),
        "$bit" => return Err(Error::modifier("$bit is not supported")),
        other => return Err(Error::modifier(format!("Invalid modifier specified {}", other))),
    };

    for (keypath, arg) in operand_fields(op, operand)? {
        let parts = split_keypath(keypath)?;
        if op == "$set" && keypath == ID_FIELD && !doc.get(ID_FIELD).map_or(false, |id| values_equal(id, arg)) {
            return Err(Error::modifier("Mod on _id not allowed"));
        }

        let opts = PathOptions {
            no_create,
            forbid_array: false,
        };
        if let Some(mut slot) = resolve_in_object(doc, &parts, opts)? {
            apply(&mut slot, arg)?;
        }
    }
    Ok(())
}

fn operand_fields<'a>(op: &str, operand: &'a Value) -> Result<impl Iterator<Item = (&'a str, &'a Value)>> {
    operand
        .as_object()
        .map(Document::iter)
        .ok_or_else(|| Error::modifier(format!("Modifier {} needs an object operand", op)))
}

fn split_keypath(keypath: &str) -> Result<Vec<&str>> {
    if keypath.ends_with('.') {
        return Err(Error::modifier(format!(
            "The update path '{}' contains an empty field name",
            keypath
        )));
    }
    Ok(keypath.split('.').collect())
}

#[derive(Clone, Copy, Debug)]
struct PathOptions {
    no_create: bool,
    forbid_array: bool,
}

/// The place a keypath points at: a field of an object or an array slot.
enum Slot<'a> {
    Field(&'a mut Document, String),
    Index(&'a mut Vec<Value>, usize),
}

impl Slot<'_> {
    fn get(&self) -> Option<&Value> {
        match self {
            Slot::Field(doc, key) => doc.get(key),
            Slot::Index(items, index) => items.get(*index),
        }
    }

    fn get_mut(&mut self) -> Option<&mut Value> {
        match self {
            Slot::Field(doc, key) => doc.get_mut(key),
            Slot::Index(items, index) => items.get_mut(*index),
        }
    }

    fn set(&mut self, value: Value) {
        match self {
            Slot::Field(doc, key) => {
                doc.insert(key.clone(), value);
            }
            Slot::Index(items, index) => {
                while items.len() < *index {
                    items.push(Value::Null);
                }
                if *index < items.len() {
                    items[*index] = value;
                } else {
                    items.push(value);
                }
            }
        }
    }

    /// Removes the value; array slots are nulled rather than shifted.
    fn take(&mut self) -> Option<Value> {
        match self {
            Slot::Field(doc, key) => doc.remove(key),
            Slot::Index(items, index) => items
                .get_mut(*index)
                .map(|v| core::mem::replace(v, Value::Null)),
        }
    }

    /// Returns the array in this slot, creating an empty one if missing.
    fn array_or_default(&mut self, op: &str) -> Result<&mut Vec<Value>> {
        if self.get().is_none() {
            self.set(Value::Array(Vec::new()));
        }
        match self.get_mut() {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(Error::modifier(format!("Cannot apply {} modifier to non-array", op))),
        }
    }

    /// Returns the array in this slot; `None` if the slot is empty.
    fn existing_array(&mut self, op: &str) -> Result<Option<&mut Vec<Value>>> {
        match self.get_mut() {
            None => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items)),
            Some(_) => Err(Error::modifier(format!("Cannot apply {} modifier to non-array", op))),
        }
    }
}

fn resolve_in_object<'a>(doc: &'a mut Document, parts: &[&str], opts: PathOptions) -> Result<Option<Slot<'a>>> {
    let (part, rest) = match parts.split_first() {
        Some(split) => split,
        None => return Ok(None),
    };
    if opts.no_create && !doc.contains_key(part) {
        return Ok(None);
    }
    if rest.is_empty() {
        return Ok(Some(Slot::Field(doc, part.to_string())));
    }
    let child = doc.get_or_insert_with(part, || Value::Object(Document::new()));
    resolve_in_value(child, rest, opts)
}

fn resolve_in_array<'a>(items: &'a mut Vec<Value>, parts: &[&str], opts: PathOptions) -> Result<Option<Slot<'a>>> {
    let (part, rest) = match parts.split_first() {
        Some(split) => split,
        None => return Ok(None),
    };
    if opts.forbid_array {
        return Err(Error::modifier("$rename source and target may not cross an array"));
    }
    // "01" indexes element 1.
    let index = match is_numeric_key(part).then(|| part.parse::<usize>().ok()).flatten() {
        Some(index) => index,
        None if opts.no_create => return Ok(None),
        None => {
            return Err(Error::modifier(format!(
                "can't append to array using string field name [{}]",
                part
            )))
        }
    };
    if opts.no_create && index >= items.len() {
        return Ok(None);
    }
    while items.len() < index {
        items.push(Value::Null);
    }
    if rest.is_empty() {
        return Ok(Some(Slot::Index(items, index)));
    }
    if items.len() == index {
        items.push(Value::Object(Document::new()));
    }
    resolve_in_value(&mut items[index], rest, opts)
}

fn resolve_in_value<'a>(node: &'a mut Value, parts: &[&str], opts: PathOptions) -> Result<Option<Slot<'a>>> {
    match node {
        Value::Object(doc) => resolve_in_object(doc, parts, opts),
        Value::Array(items) => resolve_in_array(items, parts, opts),
        _ if opts.no_create => Ok(None),
        other => Err(Error::modifier(format!(
            "cannot use the part '{}' to traverse {:?}",
            parts.first().copied().unwrap_or_default(),
            other
        ))),
    }
}

fn op_set(slot: &mut Slot<'_>, arg: &Value) -> Result<()> {
    slot.set(arg.clone());
    Ok(())
}

fn op_unset(slot: &mut Slot<'_>, _arg: &Value) -> Result<()> {
    slot.take();
    Ok(())
}

fn op_inc(slot: &mut Slot<'_>, arg: &Value) -> Result<()> {
    let by = match arg {
        Value::Number(n) => *n,
        _ => return Err(Error::modifier("Modifier $inc allowed for numbers only")),
    };
    if let Some(existing) = slot.get_mut() {
        return match existing {
            Value::Number(n) => {
                *n += by;
                Ok(())
            }
            _ => Err(Error::modifier("Cannot apply $inc modifier to non-number")),
        };
    }
    slot.set(Value::Number(by));
    Ok(())
}

fn op_push(slot: &mut Slot<'_>, arg: &Value) -> Result<()> {
    let fancy = arg.as_object().filter(|o| o.get("$each").map_or(false, |v| !v.is_falsy()));
    let fancy = match fancy {
        Some(fancy) => fancy,
        None => {
            slot.array_or_default("$push")?.push(arg.clone());
            return Ok(());
        }
    };

    let to_push = fancy
        .get("$each")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::modifier("$each must be an array"))?;

    let slice = match fancy.get("$slice") {
        None => None,
        Some(Value::Number(n)) if *n <= 0.0 => Some((-*n) as usize),
        Some(Value::Number(_)) => {
            return Err(Error::modifier("$slice in $push must be zero or negative"));
        }
        Some(_) => return Err(Error::modifier("$slice in $push must be a number")),
    };

    let sorter = match fancy.get("$sort") {
        None => None,
        Some(spec) => {
            if slice.is_none() {
                return Err(Error::modifier("$sort requires $slice to be present"));
            }
            if to_push.iter().any(|v| !v.is_plain_object()) {
                return Err(Error::modifier(
                    "$push like modifiers using $sort require all elements to be objects",
                ));
            }
            Some(compile_sort(spec)?)
        }
    };

    let items = slot.array_or_default("$push")?;
    items.extend(to_push.iter().cloned());

    if let Some(sorter) = sorter {
        let empty = Document::new();
        items.sort_by(|a, b| {
            sorter.compare(a.as_object().unwrap_or(&empty), b.as_object().unwrap_or(&empty))
        });
    }
    if let Some(keep) = slice {
        if keep < items.len() {
            let drop = items.len() - keep;
            items.drain(..drop);
        }
    }
    Ok(())
}

fn op_push_all(slot: &mut Slot<'_>, arg: &Value) -> Result<()> {
    let values = arg
        .as_array()
        .ok_or_else(|| Error::modifier("Modifier $pushAll allowed for arrays only"))?;
    slot.array_or_default("$pushAll")?.extend(values.iter().cloned());
    Ok(())
}

fn op_add_to_set(slot: &mut Slot<'_>, arg: &Value) -> Result<()> {
    let candidates: Vec<Value> = match arg.as_object() {
        Some(fancy) if fancy.keys().next() == Some("$each") => fancy
            .get("$each")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| Error::modifier("$each in $addToSet must be an array"))?,
        _ => vec![arg.clone()],
    };

    let items = slot.array_or_default("$addToSet")?;
    for candidate in candidates {
        if !items.iter().any(|existing| values_equal(existing, &candidate)) {
            items.push(candidate);
        }
    }
    Ok(())
}

fn op_pop(slot: &mut Slot<'_>, arg: &Value) -> Result<()> {
    let items = match slot.existing_array("$pop")? {
        Some(items) => items,
        None => return Ok(()),
    };
    if matches!(arg, Value::Number(n) if *n < 0.0) {
        if !items.is_empty() {
            items.remove(0);
        }
    } else {
        items.pop();
    }
    Ok(())
}

fn op_pull(slot: &mut Slot<'_>, arg: &Value) -> Result<()> {
    let matcher = match arg {
        Value::Object(spec) if spec.keys().next().map_or(false, |k| k.starts_with('$')) => {
            Some(compile_value_matcher(arg)?)
        }
        Value::Object(_) => Some(compile_selector(arg)?),
        _ => None,
    };
    let items = match slot.existing_array("$pull")? {
        Some(items) => items,
        None => return Ok(()),
    };
    match matcher {
        Some(matcher) => items.retain(|v| !matcher.matches_value(v)),
        None => items.retain(|v| !values_equal(v, arg)),
    }
    Ok(())
}

fn op_pull_all(slot: &mut Slot<'_>, arg: &Value) -> Result<()> {
    let values = arg
        .as_array()
        .ok_or_else(|| Error::modifier("Modifier $pullAll allowed for arrays only"))?;
    if let Some(items) = slot.existing_array("$pullAll")? {
        items.retain(|v| !values.iter().any(|x| values_equal(v, x)));
    }
    Ok(())
}

fn rename(doc: &mut Document, keypath: &str, parts: &[&str], arg: &Value) -> Result<()> {
    let target = arg
        .as_str()
        .ok_or_else(|| Error::modifier("$rename target must be a string"))?;
    if target == keypath {
        return Err(Error::modifier("$rename source must differ from target"));
    }

    let source_opts = PathOptions {
        no_create: true,
        forbid_array: true,
    };
    let value = match resolve_in_object(doc, parts, source_opts)? {
        Some(mut slot) => slot.take(),
        None => None,
    };
    let value = match value {
        Some(value) => value,
        None => return Ok(()),
    };

    let target_parts: Vec<&str> = target.split('.').collect();
    let target_opts = PathOptions {
        no_create: false,
        forbid_array: true,
    };
    if let Some(mut slot) = resolve_in_object(doc, &target_parts, target_opts)? {
        slot.set(value);
    }
    Ok(())
}
