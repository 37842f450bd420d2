//! `tuple`: an immutable sequence, spec §4.E. No `sq_ass_item`; elements
//! are compared/hashed through the abstract-operations layer so nested
//! tuples of arbitrary built-in types compare correctly.

use crate::error::{PyException, PyResult};
use crate::types::{CompareOp, PyTypeSlots};
use crate::value::Value;
use crate::vm::Vm;

fn as_tuple(v: &Value) -> Option<&[Value]> {
    match v {
        Value::Tuple(items) => Some(items),
        _ => None,
    }
}

fn self_tuple(zelf: &Value) -> &[Value] {
    as_tuple(zelf).expect("tuple slot invoked on non-tuple")
}

fn repr_(zelf: &Value, vm: &Vm) -> PyResult<Value> {
    let items = self_tuple(zelf);
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        parts.push(crate::ops::repr(vm, item)?);
    }
    let body = parts.join(", ");
    Ok(Value::str(if items.len() == 1 {
        format!("({body},)")
    } else {
        format!("({body})")
    }))
}

fn hash_(zelf: &Value, _vm: &Vm) -> PyResult<i64> {
    crate::value::value_hash(zelf)
}

fn add(a: &Value, b: &Value, _vm: &Vm) -> PyResult<Value> {
    let x = self_tuple(a);
    match as_tuple(b) {
        Some(y) => {
            let mut combined = Vec::with_capacity(x.len() + y.len());
            combined.extend_from_slice(x);
            combined.extend_from_slice(y);
            Ok(Value::tuple(combined))
        }
        None => Ok(Value::NotImplemented),
    }
}

fn richcompare(a: &Value, b: &Value, op: CompareOp, vm: &Vm) -> PyResult<Value> {
    use CompareOp::*;
    let x = self_tuple(a);
    let Some(y) = as_tuple(b) else {
        return Ok(Value::NotImplemented);
    };
    for (p, q) in x.iter().zip(y.iter()) {
        if !crate::ops::equal(vm, p, q)? {
            let less = crate::ops::rich_compare_bool(vm, p, q, Lt)?;
            return Ok(Value::Bool(match op {
                Lt | Le => less,
                Gt | Ge => !less,
                Eq => false,
                Ne => true,
            }));
        }
    }
    let result = match op {
        Lt => x.len() < y.len(),
        Le => x.len() <= y.len(),
        Eq => x.len() == y.len(),
        Ne => x.len() != y.len(),
        Gt => x.len() > y.len(),
        Ge => x.len() >= y.len(),
    };
    Ok(Value::Bool(result))
}

fn sq_length(zelf: &Value, _vm: &Vm) -> PyResult<usize> {
    Ok(self_tuple(zelf).len())
}

fn sq_item(zelf: &Value, index: i64, _vm: &Vm) -> PyResult<Value> {
    let items = self_tuple(zelf);
    let len = items.len() as i64;
    let idx = if index < 0 { index + len } else { index };
    if idx < 0 || idx >= len {
        return Err(PyException::IndexError("tuple index out of range".to_owned()));
    }
    Ok(items[idx as usize].clone())
}

fn sq_repeat(zelf: &Value, n: i64, _vm: &Vm) -> PyResult<Value> {
    let items = self_tuple(zelf);
    if n <= 0 {
        return Ok(Value::tuple(Vec::new()));
    }
    let mut out = Vec::with_capacity(items.len() * n as usize);
    for _ in 0..n {
        out.extend_from_slice(items);
    }
    Ok(Value::tuple(out))
}

fn new(
    _cls: &crate::types::PyTypeRef,
    args: &[Value],
    _kwargs: Option<&Value>,
    vm: &Vm,
) -> PyResult<Value> {
    match args {
        [] => Ok(Value::tuple(Vec::new())),
        [Value::Tuple(items)] => Ok(Value::Tuple(items.clone())),
        [Value::List(items)] => Ok(Value::tuple(items.borrow().clone())),
        [other] => Err(vm.new_type_error(format!(
            "'{}' object is not iterable",
            other.type_name()
        ))),
        _ => Err(vm.new_type_error("tuple() takes at most 1 argument")),
    }
}

pub fn extend_slots(slots: &mut PyTypeSlots) {
    slots.repr = Some(repr_);
    slots.str_ = Some(repr_);
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
    fn single_element_repr_has_trailing_comma() {
        let vm = Vm::new();
        let t = Value::tuple(vec![Value::int(1)]);
        let r = repr_(&t, &vm).unwrap();
        assert!(matches!(r, Value::Str(s) if &*s == "(1,)"));
    }

    #[test]
    fn lexicographic_compare() {
        let vm = Vm::new();
        let a = Value::tuple(vec![Value::int(1), Value::int(2)]);
        let b = Value::tuple(vec![Value::int(1), Value::int(3)]);
        let r = richcompare(&a, &b, CompareOp::Lt, &vm).unwrap();
        assert!(matches!(r, Value::Bool(true)));
    }
}
