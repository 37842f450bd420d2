//! `bool`: spec §4.E's required "subtype of `int`". Built by `zoo` with
//! `base = int_type`, so every numeric/compare/repr slot not overridden
//! here is inherited from `int` (`TypeBuilder::build`'s slot inheritance).
//! Only `and`/`or`/`xor` are overridden, to stay `bool` when both operands
//! are `bool` (CPython's `bool_and`/`bool_or`/`bool_xor`) instead of
//! widening to `int` the way the inherited slot would.

use crate::builtins::int::as_bigint;
use crate::error::PyResult;
use crate::types::PyTypeSlots;
use crate::value::Value;
use crate::vm::Vm;

fn as_bool(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        _ => None,
    }
}

macro_rules! bool_or_int_op {
    ($name:ident, $bop:tt, $iop:tt) => {
        fn $name(a: &Value, b: &Value, _vm: &Vm) -> PyResult<Value> {
            match (as_bool(a), as_bool(b)) {
                (Some(x), Some(y)) => Ok(Value::Bool(x $bop y)),
                _ => {
                    let x = as_bigint(a).expect("left operand must be bool");
                    match as_bigint(b) {
                        Some(y) => Ok(Value::Int(x $iop y)),
                        None => Ok(Value::NotImplemented),
                    }
                }
            }
        }
    };
}

bool_or_int_op!(and, &, &);
bool_or_int_op!(or, |, |);
bool_or_int_op!(xor, ^, ^);

fn repr_(zelf: &Value, _vm: &Vm) -> PyResult<Value> {
    let b = as_bool(zelf).expect("bool repr on non-bool");
    Ok(Value::str(if b { "True" } else { "False" }))
}

fn new(
    _cls: &crate::types::PyTypeRef,
    args: &[Value],
    _kwargs: Option<&Value>,
    vm: &Vm,
) -> PyResult<Value> {
    match args {
        [] => Ok(Value::Bool(false)),
        [x] => Ok(Value::Bool(crate::ops::is_true(vm, x)?)),
        _ => Err(vm.new_type_error("bool() takes at most 1 argument")),
    }
}

pub fn extend_slots(slots: &mut PyTypeSlots) {
    slots.as_number.and = Some(and);
    slots.as_number.or = Some(or);
    slots.as_number.xor = Some(xor);
    slots.repr = Some(repr_);
    slots.str_ = Some(repr_);
    slots.new = Some(new);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_stays_bool_when_both_operands_are_bool() {
        let vm = Vm::new();
        let r = and(&Value::Bool(true), &Value::Bool(false), &vm).unwrap();
        assert!(matches!(r, Value::Bool(false)));
    }

    #[test]
    fn and_widens_to_int_when_mixed() {
        let vm = Vm::new();
        let r = and(&Value::Bool(true), &Value::int(3), &vm).unwrap();
        assert!(matches!(r, Value::Int(n) if n == malachite_bigint::BigInt::from(1)));
    }
}
