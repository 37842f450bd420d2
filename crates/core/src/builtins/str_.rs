//! `str`: an immutable sequence of Unicode scalar values, spec §4.E.
//! Indexing and slicing operate on `char`s (not UTF-8 bytes), matching
//! CPython's per-codepoint semantics.

use crate::error::{PyException, PyResult};
use crate::types::{CompareOp, PyTypeSlots};
use crate::value::Value;
use crate::vm::Vm;

fn as_str(v: &Value) -> Option<&str> {
    match v {
        Value::Str(s) => Some(s),
        _ => None,
    }
}

fn self_str(zelf: &Value) -> &str {
    as_str(zelf).expect("str slot invoked on non-str")
}

fn repr_(zelf: &Value, _vm: &Vm) -> PyResult<Value> {
    Ok(Value::str(quote(self_str(zelf))))
}

/// CPython's `unicode_repr`, simplified: prefers single quotes, switches
/// to double quotes if the string contains a `'` but no `"`; escapes
/// backslash, the chosen quote, and the common control characters.
fn quote(s: &str) -> String {
    let quote_ch = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote_ch);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote_ch => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote_ch);
    out
}

fn str_(zelf: &Value, _vm: &Vm) -> PyResult<Value> {
    Ok(zelf.clone())
}

fn hash_(zelf: &Value, _vm: &Vm) -> PyResult<i64> {
    Ok(picovm_common::hash::hash_str(self_str(zelf)))
}

fn add(a: &Value, b: &Value, _vm: &Vm) -> PyResult<Value> {
    let x = self_str(a);
    match as_str(b) {
        Some(y) => Ok(Value::str(format!("{x}{y}"))),
        None => Ok(Value::NotImplemented),
    }
}

fn richcompare(a: &Value, b: &Value, op: CompareOp, _vm: &Vm) -> PyResult<Value> {
    use CompareOp::*;
    let x = self_str(a);
    let Some(y) = as_str(b) else {
        return Ok(Value::NotImplemented);
    };
    let result = match op {
        Lt => x < y,
        Le => x <= y,
        Eq => x == y,
        Ne => x != y,
        Gt => x > y,
        Ge => x >= y,
    };
    Ok(Value::Bool(result))
}

fn sq_length(zelf: &Value, _vm: &Vm) -> PyResult<usize> {
    Ok(self_str(zelf).chars().count())
}

fn sq_item(zelf: &Value, index: i64, _vm: &Vm) -> PyResult<Value> {
    let s = self_str(zelf);
    let len = s.chars().count() as i64;
    let idx = if index < 0 { index + len } else { index };
    if idx < 0 || idx >= len {
        return Err(PyException::IndexError("string index out of range".to_owned()));
    }
    s.chars()
        .nth(idx as usize)
        .map(|c| Value::str(c.to_string()))
        .ok_or_else(|| PyException::IndexError("string index out of range".to_owned()))
}

fn sq_repeat(zelf: &Value, n: i64, _vm: &Vm) -> PyResult<Value> {
    let s = self_str(zelf);
    if n <= 0 {
        return Ok(Value::str(""));
    }
    Ok(Value::str(s.repeat(n as usize)))
}

fn new(
    _cls: &crate::types::PyTypeRef,
    args: &[Value],
    _kwargs: Option<&Value>,
    vm: &Vm,
) -> PyResult<Value> {
    match args {
        [] => Ok(Value::str("")),
        [x] => crate::ops::str_of(vm, x),
        _ => Err(vm.new_type_error("str() takes at most 1 argument")),
    }
}

pub fn extend_slots(slots: &mut PyTypeSlots) {
    slots.repr = Some(repr_);
    slots.str_ = Some(str_);
    slots.hash = Some(hash_);
    slots.richcompare = Some(richcompare);
    slots.as_number.add = Some(add);
    slots.as_sequence.length = Some(sq_length);
    slots.as_sequence.item = Some(sq_item);
    slots.as_sequence.repeat = Some(sq_repeat);
    slots.new = Some(new);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repr_prefers_single_quotes_and_escapes() {
        assert_eq!(quote("it's"), "\"it's\"");
        assert_eq!(quote("a\nb"), "'a\\nb'");
    }

    #[test]
    fn negative_index_wraps() {
        let vm = Vm::new();
        let s = Value::str("abc");
        let v = sq_item(&s, -1, &vm).unwrap();
        assert!(matches!(v, Value::Str(c) if &*c == "c"));
    }

    #[test]
    fn out_of_range_index_raises_index_error() {
        let vm = Vm::new();
        let s = Value::str("abc");
        assert!(sq_item(&s, 3, &vm).is_err());
    }
}
