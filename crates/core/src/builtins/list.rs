//! `list`: a mutable sequence, spec §4.E. Backed by `Rc<RefCell<Vec<Value>>>`
//! so append/assignment is visible through every alias, matching §5's
//! single-threaded `Rc`/`RefCell` ownership model.

use crate::error::PyResult;
use crate::types::{CompareOp, PyTypeSlots};
use crate::value::Value;
use crate::vm::Vm;

fn self_list(zelf: &Value) -> &std::rc::Rc<std::cell::RefCell<Vec<Value>>> {
    match zelf {
        Value::List(items) => items,
        _ => panic!("list slot invoked on non-list"),
    }
}

fn repr_(zelf: &Value, vm: &Vm) -> PyResult<Value> {
    let items = self_list(zelf).borrow();
    let mut parts = Vec::with_capacity(items.len());
    for item in items.iter() {
        parts.push(crate::ops::repr(vm, item)?);
    }
    Ok(Value::str(format!("[{}]", parts.join(", "))))
}

fn add(a: &Value, b: &Value, _vm: &Vm) -> PyResult<Value> {
    let x = self_list(a).borrow();
    match b {
        Value::List(y) => {
            let mut combined = x.clone();
            combined.extend(y.borrow().iter().cloned());
            Ok(Value::list(combined))
        }
        _ => Ok(Value::NotImplemented),
    }
}

fn inplace_add(a: &Value, b: &Value, vm: &Vm) -> PyResult<Value> {
    match b {
        Value::List(y) => {
            self_list(a).borrow_mut().extend(y.borrow().iter().cloned());
            Ok(a.clone())
        }
        _ => {
            let _ = vm;
            Ok(Value::NotImplemented)
        }
    }
}

fn richcompare(a: &Value, b: &Value, op: CompareOp, vm: &Vm) -> PyResult<Value> {
    use CompareOp::*;
    let Value::List(y) = b else {
        return Ok(Value::NotImplemented);
    };
    let x = self_list(a).borrow();
    let y = y.borrow();
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
    Ok(self_list(zelf).borrow().len())
}

fn normalize_index(len: usize, index: i64) -> Option<usize> {
    let len = len as i64;
    let idx = if index < 0 { index + len } else { index };
    if idx < 0 || idx >= len {
        None
    } else {
        Some(idx as usize)
    }
}

fn sq_item(zelf: &Value, index: i64, _vm: &Vm) -> PyResult<Value> {
    let items = self_list(zelf).borrow();
    normalize_index(items.len(), index)
        .map(|i| items[i].clone())
        .ok_or_else(|| crate::error::PyException::IndexError("list index out of range".to_owned()))
}

fn sq_ass_item(zelf: &Value, index: i64, value: Value, _vm: &Vm) -> PyResult<()> {
    let cell = self_list(zelf);
    let len = cell.borrow().len();
    let idx = normalize_index(len, index)
        .ok_or_else(|| crate::error::PyException::IndexError("list assignment index out of range".to_owned()))?;
    cell.borrow_mut()[idx] = value;
    Ok(())
}

fn sq_repeat(zelf: &Value, n: i64, _vm: &Vm) -> PyResult<Value> {
    let items = self_list(zelf).borrow();
    if n <= 0 {
        return Ok(Value::list(Vec::new()));
    }
    let mut out = Vec::with_capacity(items.len() * n as usize);
    for _ in 0..n {
        out.extend(items.iter().cloned());
    }
    Ok(Value::list(out))
}

fn new(
    _cls: &crate::types::PyTypeRef,
    args: &[Value],
    _kwargs: Option<&Value>,
    vm: &Vm,
) -> PyResult<Value> {
    match args {
        [] => Ok(Value::list(Vec::new())),
        [Value::List(items)] => Ok(Value::list(items.borrow().clone())),
        [Value::Tuple(items)] => Ok(Value::list(items.to_vec())),
        [other] => Err(vm.new_type_error(format!(
            "'{}' object is not iterable",
            other.type_name()
        ))),
        _ => Err(vm.new_type_error("list() takes at most 1 argument")),
    }
}

/// Not a slot: `LIST_APPEND`/`LIST_EXTEND` (§4.G) call this directly,
/// the way the teacher's bytecode handlers call `PyList::append` rather
/// than routing through `tp_call`.
pub fn append(zelf: &Value, value: Value) {
    self_list(zelf).borrow_mut().push(value);
}

pub fn extend_slots(slots: &mut PyTypeSlots) {
    slots.repr = Some(repr_);
    slots.str_ = Some(repr_);
    slots.richcompare = Some(richcompare);
    slots.as_number.add = Some(add);
    slots.as_number.inplace_add = Some(inplace_add);
    slots.as_sequence.length = Some(sq_length);
    slots.as_sequence.item = Some(sq_item);
    slots.as_sequence.ass_item = Some(sq_ass_item);
    slots.as_sequence.repeat = Some(sq_repeat);
    slots.new = Some(new);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_mutates_in_place() {
        let vm = Vm::new();
        let l = Value::list(vec![Value::int(1), Value::int(2)]);
        sq_ass_item(&l, 0, Value::int(9), &vm).unwrap();
        let v = sq_item(&l, 0, &vm).unwrap();
        assert!(matches!(v, Value::Int(n) if n == malachite_bigint::BigInt::from(9)));
    }

    #[test]
    fn inplace_add_extends_and_returns_same_object() {
        let vm = Vm::new();
        let l = Value::list(vec![Value::int(1)]);
        let other = Value::list(vec![Value::int(2)]);
        let r = inplace_add(&l, &other, &vm).unwrap();
        assert!(r.is_identical(&l));
        assert_eq!(sq_length(&l, &vm).unwrap(), 2);
    }
}
