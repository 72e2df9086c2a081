//! Value selectors: the right-hand side of a field clause.
//!
//! A value selector is tested against one lookup branch at a time; `None`
//! stands for a missing field.

use super::DocumentSelector;
use crate::lookup::LookupRoot;
use crate::regexp::{compile_regex, compile_regex_value};
use docket_core::{compare_values, values_equal, Document, Error, Result, Value};
use regex::Regex;
use std::cmp::Ordering;

/// Comparison operators sharing one evaluation path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Comparison {
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Comparison {
    #[inline]
    fn test(self, ord: Ordering) -> bool {
        match self {
            Comparison::Lt => ord == Ordering::Less,
            Comparison::Lte => ord != Ordering::Greater,
            Comparison::Gt => ord == Ordering::Greater,
            Comparison::Gte => ord != Ordering::Less,
        }
    }
}

#[derive(Debug)]
pub(crate) enum Operator {
    In(Vec<Value>),
    Nin(Vec<Value>),
    All(Vec<Value>),
    Compare(Comparison, Value),
    Ne(Value),
    Exists(bool),
    Mod { divisor: f64, remainder: f64 },
    Size(f64),
    Type(f64),
    Regex(Regex),
    ElemMatch(Box<DocumentSelector>),
    Not(Box<ValueSelector>),
}

#[derive(Debug)]
pub(crate) enum ValueSelector {
    /// `null` matches null and missing.
    Null,
    /// Scalars and plain objects: deep equality with the value or any element.
    Equal(Value),
    /// Regex literal: any string element matches.
    Regex(Regex),
    /// Array literal: the value must be an array equal to it or containing it.
    ArrayEqual(Value),
    /// Operator object: every operator must hold.
    Operators(Vec<Operator>),
}

/// Decides whether an object operand is an operator object.
///
/// Mixing `$`-keys with plain keys is rejected.
pub(crate) fn has_operators(operand: &Document) -> Result<bool> {
    let mut verdict: Option<bool> = None;
    for key in operand.keys() {
        let this = key.starts_with('$');
        match verdict {
            None => verdict = Some(this),
            Some(prev) if prev != this => {
                return Err(Error::selector("Inconsistent selector"));
            }
            Some(_) => {}
        }
    }
    Ok(verdict.unwrap_or(false))
}

impl ValueSelector {
    pub(crate) fn compile(operand: &Value) -> Result<Self> {
        match operand {
            Value::Null => Ok(ValueSelector::Null),
            Value::Regex(re) => Ok(ValueSelector::Regex(compile_regex_value(re)?)),
            Value::Array(_) => Ok(ValueSelector::ArrayEqual(operand.clone())),
            Value::Object(ops) if has_operators(ops)? => {
                compile_operators(ops).map(ValueSelector::Operators)
            }
            _ => Ok(ValueSelector::Equal(operand.clone())),
        }
    }

    pub(crate) fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            ValueSelector::Null => value.map_or(true, |v| any_if_array(v, Value::is_null)),
            ValueSelector::Equal(target) => {
                value.map_or(false, |v| any_if_array(v, |x| values_equal(target, x)))
            }
            ValueSelector::Regex(re) => value.map_or(false, |v| any_if_array(v, |x| is_match(re, x))),
            ValueSelector::ArrayEqual(target) => match value {
                Some(v @ Value::Array(_)) => any_if_array_plus(v, |x| values_equal(target, x)),
                _ => false,
            },
            ValueSelector::Operators(ops) => ops.iter().all(|op| op.matches(value)),
        }
    }
}

fn compile_operators(ops: &Document) -> Result<Vec<Operator>> {
    let mut compiled = Vec::with_capacity(ops.len());
    for (name, operand) in ops.iter() {
        let op = match name {
            "$in" => Operator::In(array_operand(name, operand)?),
            "$nin" => Operator::Nin(array_operand(name, operand)?),
            "$all" => Operator::All(array_operand(name, operand)?),
            "$lt" => Operator::Compare(Comparison::Lt, operand.clone()),
            "$lte" => Operator::Compare(Comparison::Lte, operand.clone()),
            "$gt" => Operator::Compare(Comparison::Gt, operand.clone()),
            "$gte" => Operator::Compare(Comparison::Gte, operand.clone()),
            "$ne" => Operator::Ne(operand.clone()),
            "$exists" => Operator::Exists(!operand.is_falsy()),
            "$mod" => compile_mod(operand)?,
            "$size" => Operator::Size(number_operand(name, operand)?),
            "$type" => Operator::Type(number_operand(name, operand)?),
            "$regex" => Operator::Regex(compile_regex_operator(operand, ops.get("$options"))?),
            // Consumed by $regex; alone it constrains nothing.
            "$options" => continue,
            "$elemMatch" => match operand {
                Value::Object(sub) => {
                    Operator::ElemMatch(Box::new(DocumentSelector::compile(sub)?))
                }
                _ => return Err(Error::selector("$elemMatch needs an object")),
            },
            "$not" => Operator::Not(Box::new(ValueSelector::compile(operand)?)),
            other => {
                return Err(Error::selector(format!("Unrecognized operator: {}", other)));
            }
        };
        compiled.push(op);
    }
    Ok(compiled)
}

fn array_operand(name: &str, operand: &Value) -> Result<Vec<Value>> {
    match operand {
        Value::Array(items) => Ok(items.clone()),
        _ => Err(Error::selector(format!("Argument to {} must be array", name))),
    }
}

fn number_operand(name: &str, operand: &Value) -> Result<f64> {
    operand
        .as_f64()
        .ok_or_else(|| Error::selector(format!("Argument to {} must be a number", name)))
}

fn compile_mod(operand: &Value) -> Result<Operator> {
    match operand.as_array().map(Vec::as_slice) {
        Some([Value::Number(divisor), Value::Number(remainder)]) => Ok(Operator::Mod {
            divisor: *divisor,
            remainder: *remainder,
        }),
        _ => Err(Error::selector("$mod needs [divisor, remainder]")),
    }
}

/// `$options` replaces the flags of a regex literal operand.
fn compile_regex_operator(operand: &Value, options: Option<&Value>) -> Result<Regex> {
    let pattern = match operand {
        Value::Regex(re) => {
            if options.is_none() {
                return compile_regex_value(re);
            }
            re.pattern.as_str()
        }
        Value::String(s) => s.as_str(),
        _ => return Err(Error::selector("$regex needs a string or a regex")),
    };
    let flags = match options {
        None => "",
        Some(Value::String(flags)) => flags.as_str(),
        Some(_) => return Err(Error::selector("$options needs a string")),
    };
    compile_regex(pattern, flags)
}

impl Operator {
    fn matches(&self, value: Option<&Value>) -> bool {
        match self {
            Operator::In(list) => value.map_or(false, |v| is_in(list, v)),
            Operator::Nin(list) => value.map_or(true, |v| !is_in(list, v)),
            Operator::All(list) => match value {
                Some(Value::Array(items)) => list
                    .iter()
                    .all(|wanted| items.iter().any(|x| values_equal(wanted, x))),
                _ => false,
            },
            // A missing field is never ordered against an operand.
            Operator::Compare(cmp, operand) => value.map_or(false, |v| {
                any_if_array(v, |x| cmp.test(compare_values(Some(x), Some(operand))))
            }),
            Operator::Ne(operand) => {
                !value.map_or(false, |v| any_if_array_plus(v, |x| values_equal(x, operand)))
            }
            Operator::Exists(wanted) => value.is_some() == *wanted,
            Operator::Mod { divisor, remainder } => value.map_or(false, |v| {
                any_if_array(v, |x| x.as_f64().map_or(false, |n| n % divisor == *remainder))
            }),
            Operator::Size(len) => {
                matches!(value, Some(Value::Array(items)) if items.len() as f64 == *len)
            }
            Operator::Type(code) => {
                value.map_or(false, |v| any_if_array(v, |x| f64::from(x.type_code()) == *code))
            }
            Operator::Regex(re) => value.map_or(false, |v| any_if_array(v, |x| is_match(re, x))),
            Operator::ElemMatch(sub) => match value {
                Some(Value::Array(items)) => items
                    .iter()
                    .any(|x| sub.matches(LookupRoot::from_value(x))),
                _ => false,
            },
            Operator::Not(inner) => !inner.matches(value),
        }
    }
}

#[inline]
fn is_in(list: &[Value], value: &Value) -> bool {
    any_if_array_plus(value, |x| list.iter().any(|e| values_equal(e, x)))
}

#[inline]
fn is_match(re: &Regex, value: &Value) -> bool {
    value.as_str().map_or(false, |s| re.is_match(s))
}

/// Tests an array's elements, or the value itself when it is not an array.
fn any_if_array(value: &Value, f: impl Fn(&Value) -> bool) -> bool {
    match value {
        Value::Array(items) => items.iter().any(f),
        other => f(other),
    }
}

/// Tests the value itself, then each element when it is an array.
fn any_if_array_plus(value: &Value, f: impl Fn(&Value) -> bool) -> bool {
    f(value) || matches!(value, Value::Array(items) if items.iter().any(&f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docket_core::{doc, value};

    fn sel(operand: Value) -> ValueSelector {
        ValueSelector::compile(&operand).unwrap()
    }

    #[test]
    fn test_null_matches_missing() {
        let s = sel(value!(null));
        assert!(s.matches(None));
        assert!(s.matches(Some(&value!(null))));
        assert!(s.matches(Some(&value!([1, null]))));
        assert!(!s.matches(Some(&value!(0))));
    }

    #[test]
    fn test_array_literal_needs_array() {
        let s = sel(value!([1, 2]));
        assert!(s.matches(Some(&value!([1, 2]))));
        assert!(s.matches(Some(&value!([[1, 2], 3]))));
        assert!(!s.matches(Some(&value!([2, 1]))));
        assert!(!s.matches(Some(&value!(1))));
    }

    #[test]
    fn test_has_operators() {
        assert!(has_operators(&doc!({"$gt": 1})).unwrap());
        assert!(!has_operators(&doc!({"a": 1})).unwrap());
        assert!(!has_operators(&doc!({})).unwrap());
        assert!(has_operators(&doc!({"$gt": 1, "a": 1})).is_err());
    }

    #[test]
    fn test_comparison_skips_missing() {
        let s = sel(value!({"$lt": 10}));
        assert!(!s.matches(None));
        assert!(s.matches(Some(&value!(3))));
        assert!(s.matches(Some(&value!([20, 3]))));
        // A string never sorts below a number.
        assert!(!s.matches(Some(&value!("3"))));
    }

    #[test]
    fn test_nin_and_ne_on_missing() {
        assert!(sel(value!({"$nin": [1]})).matches(None));
        assert!(sel(value!({"$ne": 1})).matches(None));
        assert!(!sel(value!({"$in": [1]})).matches(None));
    }

    #[test]
    fn test_operator_errors() {
        assert!(ValueSelector::compile(&value!({"$in": 1})).is_err());
        assert!(ValueSelector::compile(&value!({"$mod": [1]})).is_err());
        assert!(ValueSelector::compile(&value!({"$bogus": 1})).is_err());
        assert!(ValueSelector::compile(&value!({"$regex": "a", "$options": "x"})).is_err());
    }
}
