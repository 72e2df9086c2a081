//! Selector compilation.
//!
//! A selector is compiled once into a [`Matcher`] and then evaluated
//! against many documents. Compilation validates the whole selector up
//! front, so evaluation itself cannot fail.
//!
//! Accepted selector shapes:
//!
//! - a string, number or ObjectId: match on `_id`
//! - `null`, `false`, or an object whose `_id` is falsy: match nothing
//! - an object of field clauses and `$and` / `$or` / `$nor` / `$comment`
//!
//! Anything else (`true`, arrays, binary, dates...) is rejected.

mod ids;
mod value;

pub use ids::{ids_matched_by_selector, selector_is_id, selector_is_id_perhaps_as_object};

use crate::lookup::LookupRoot;
use docket_core::{values_equal, Document, Error, Result, Value, ID_FIELD};
use std::fmt;
use std::rc::Rc;
use value::ValueSelector;

/// A compiled document selector: a conjunction of clauses.
#[derive(Debug)]
pub(crate) struct DocumentSelector {
    clauses: Vec<Clause>,
}

#[derive(Debug)]
enum Clause {
    Field {
        path: String,
        /// Every lookup branch must match (`$ne`, `$nin`, `$not`) instead of any.
        all_branches: bool,
        selector: ValueSelector,
    },
    And(Vec<DocumentSelector>),
    Or(Vec<DocumentSelector>),
    Nor(Vec<DocumentSelector>),
}

impl DocumentSelector {
    pub(crate) fn compile(selector: &Document) -> Result<Self> {
        let mut clauses = Vec::with_capacity(selector.len());
        for (key, operand) in selector.iter() {
            if let Some(op) = key.strip_prefix('$') {
                match op {
                    "and" => clauses.push(Clause::And(compile_branches(key, operand)?)),
                    "or" => clauses.push(Clause::Or(compile_branches(key, operand)?)),
                    "nor" => clauses.push(Clause::Nor(compile_branches(key, operand)?)),
                    "comment" => {}
                    "where" => {
                        return Err(Error::selector(
                            "$where needs a predicate; use Matcher::from_fn",
                        ));
                    }
                    _ => {
                        return Err(Error::selector(format!(
                            "Unrecognized logical operator: {}",
                            key
                        )));
                    }
                }
                continue;
            }

            let all_branches = match operand {
                Value::Object(ops) => {
                    ops.contains_key("$not") || ops.contains_key("$ne") || ops.contains_key("$nin")
                }
                _ => false,
            };
            clauses.push(Clause::Field {
                path: key.to_string(),
                all_branches,
                selector: ValueSelector::compile(operand)?,
            });
        }
        Ok(Self { clauses })
    }

    pub(crate) fn matches(&self, root: LookupRoot<'_>) -> bool {
        self.clauses.iter().all(|clause| clause.matches(root))
    }
}

impl Clause {
    fn matches(&self, root: LookupRoot<'_>) -> bool {
        match self {
            Clause::Field {
                path,
                all_branches,
                selector,
            } => {
                let branches = root.lookup(path);
                if *all_branches {
                    branches.into_iter().all(|b| selector.matches(b))
                } else {
                    branches.into_iter().any(|b| selector.matches(b))
                }
            }
            Clause::And(subs) => subs.iter().all(|s| s.matches(root)),
            Clause::Or(subs) => subs.iter().any(|s| s.matches(root)),
            Clause::Nor(subs) => !subs.iter().any(|s| s.matches(root)),
        }
    }
}

fn compile_branches(key: &str, operand: &Value) -> Result<Vec<DocumentSelector>> {
    let items = match operand {
        Value::Array(items) if !items.is_empty() => items,
        _ => {
            return Err(Error::selector(format!(
                "{} needs a non-empty array of selectors",
                key
            )));
        }
    };
    items
        .iter()
        .map(|item| match item {
            Value::Object(sub) => DocumentSelector::compile(sub),
            _ => Err(Error::selector(format!("{} entries must be objects", key))),
        })
        .collect()
}

enum MatcherKind {
    Nothing,
    Id(Value),
    Predicate(Box<dyn Fn(&Document) -> bool>),
    Selector(DocumentSelector),
    /// Operators applied to a value itself, such as `{$gt: 4}` under `$pull`.
    Element(ValueSelector),
}

/// A compiled selector.
///
/// Cheap to clone; clones share the compiled form.
#[derive(Clone)]
pub struct Matcher {
    kind: Rc<MatcherKind>,
}

impl Matcher {
    fn new(kind: MatcherKind) -> Self {
        Self { kind: Rc::new(kind) }
    }

    /// A matcher that accepts nothing.
    pub fn nothing() -> Self {
        Self::new(MatcherKind::Nothing)
    }

    /// A matcher driven by an arbitrary predicate (the `$where` form).
    pub fn from_fn<F>(predicate: F) -> Self
    where
        F: Fn(&Document) -> bool + 'static,
    {
        Self::new(MatcherKind::Predicate(Box::new(predicate)))
    }

    /// Tests a stored document.
    pub fn matches(&self, doc: &Document) -> bool {
        match self.kind.as_ref() {
            MatcherKind::Nothing => false,
            MatcherKind::Id(id) => doc.get(ID_FIELD).map_or(false, |v| values_equal(v, id)),
            MatcherKind::Predicate(f) => f(doc),
            MatcherKind::Selector(sel) => sel.matches(LookupRoot::Document(doc)),
            MatcherKind::Element(sel) => sel.matches(Some(&Value::Object(doc.clone()))),
        }
    }

    /// Tests an arbitrary value, such as an array element under `$pull`.
    ///
    /// Non-object values behave like documents with no fields.
    pub fn matches_value(&self, value: &Value) -> bool {
        match self.kind.as_ref() {
            MatcherKind::Selector(sel) => sel.matches(LookupRoot::from_value(value)),
            MatcherKind::Element(sel) => sel.matches(Some(value)),
            _ => value.as_object().map_or(false, |doc| self.matches(doc)),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind.as_ref() {
            MatcherKind::Nothing => f.write_str("Matcher::Nothing"),
            MatcherKind::Id(id) => write!(f, "Matcher::Id({:?})", id),
            MatcherKind::Predicate(_) => f.write_str("Matcher::Predicate"),
            MatcherKind::Selector(sel) => write!(f, "Matcher::Selector({:?})", sel),
            MatcherKind::Element(sel) => write!(f, "Matcher::Element({:?})", sel),
        }
    }
}

/// Compiles a selector value.
pub fn compile_selector(selector: &Value) -> Result<Matcher> {
    if selector_is_id(selector) {
        return Ok(Matcher::new(MatcherKind::Id(selector.clone())));
    }

    match selector {
        Value::Null | Value::Bool(false) => Ok(Matcher::nothing()),
        Value::Object(doc) => {
            if doc.get(ID_FIELD).map_or(false, Value::is_falsy) {
                return Ok(Matcher::nothing());
            }
            log::trace!("compiling selector with {} top-level keys", doc.len());
            Ok(Matcher::new(MatcherKind::Selector(DocumentSelector::compile(doc)?)))
        }
        other => Err(Error::selector(format!("Invalid selector: {:?}", other))),
    }
}

/// Compiles a value selector (`5`, `[1, 2]`, `{$gt: 4}`, ...) that tests
/// values directly instead of looking up fields.
pub fn compile_value_matcher(operand: &Value) -> Result<Matcher> {
    Ok(Matcher::new(MatcherKind::Element(ValueSelector::compile(operand)?)))
}

/// Compiles a selector given as a document.
#[inline]
pub fn compile_document_selector(selector: &Document) -> Result<Matcher> {
    compile_selector(&Value::Object(selector.clone()))
}
