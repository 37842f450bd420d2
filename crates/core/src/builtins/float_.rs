//! `float`: host `f64`, spec §4.E. Numeric slots accept `int`/`bool` by
//! conversion; division/modulo by zero raise `ZeroDivisionError`
//! (SPEC_FULL §4.E/§7, a supplement to the base taxonomy).

use num_traits::ToPrimitive;

use crate::builtins::int::as_bigint;
use crate::error::{PyException, PyResult};
use crate::types::{CompareOp, PyTypeSlots};
use crate::value::Value;
use crate::vm::Vm;

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Float(f) => Some(*f),
        Value::Int(i) => i.to_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn self_f64(zelf: &Value) -> f64 {
    match zelf {
        Value::Float(f) => *f,
        other => as_f64(other).expect("float slot invoked on non-float"),
    }
}

fn neg(zelf: &Value, _vm: &Vm) -> PyResult<Value> {
    Ok(Value::Float(-self_f64(zelf)))
}

fn abs_(zelf: &Value, _vm: &Vm) -> PyResult<Value> {
    Ok(Value::Float(self_f64(zelf).abs()))
}

fn int_(zelf: &Value, vm: &Vm) -> PyResult<Value> {
    let f = self_f64(zelf);
    if !f.is_finite() {
        return Err(vm.new_value_error("cannot convert float infinity or NaN to integer"));
    }
    Ok(Value::Int(
        malachite_bigint::BigInt::from(f.trunc() as i64),
    ))
}

fn bool_(zelf: &Value, _vm: &Vm) -> PyResult<bool> {
    Ok(self_f64(zelf) != 0.0)
}

fn repr_(zelf: &Value, _vm: &Vm) -> PyResult<Value> {
    Ok(Value::str(picovm_common::float_ops::to_repr(self_f64(zelf))))
}

fn hash_(zelf: &Value, _vm: &Vm) -> PyResult<i64> {
    Ok(picovm_common::hash::hash_f64(self_f64(zelf)))
}

macro_rules! binary_op {
    ($name:ident, $op:tt) => {
        fn $name(a: &Value, b: &Value, _vm: &Vm) -> PyResult<Value> {
            let x = self_f64(a);
            match as_f64(b) {
                Some(y) => Ok(Value::Float(x $op y)),
                None => Ok(Value::NotImplemented),
            }
        }
    };
}

binary_op!(add, +);
binary_op!(sub, -);
binary_op!(mul, *);

fn richcompare(a: &Value, b: &Value, op: CompareOp, _vm: &Vm) -> PyResult<Value> {
    use CompareOp::*;
    let x = self_f64(a);
    let Some(y) = as_f64(b) else {
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

fn new(
    _cls: &crate::types::PyTypeRef,
    args: &[Value],
    kwargs: Option<&Value>,
    vm: &Vm,
) -> PyResult<Value> {
    if kwargs.is_some_and(|k| !matches!(k, Value::Dict(d) if d.borrow().is_empty())) {
        return Err(PyException::TypeError(
            "float() takes no keyword arguments".to_owned(),
        ));
    }
    match args {
        [] => Ok(Value::Float(0.0)),
        [Value::Str(s)] => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| PyException::ValueError(format!("could not convert string to float: {s:?}"))),
        [other] => as_f64(other)
            .map(Value::Float)
            .ok_or_else(|| vm.new_type_error(format!(
                "float() argument must be a string or a real number, not '{}'",
                other.type_name()
            ))),
        _ => Err(PyException::TypeError(
            "float() takes at most 1 argument".to_owned(),
        )),
    }
}

/// True division, §4.G's `BINARY_TRUE_DIVIDE`: routed through `mul`'s
/// sibling slots would be overkill for a CORE with no `__truediv__`
/// entry in its slot table (spec §4.B enumerates only the slots listed);
/// the interpreter calls this helper directly instead (ops::true_divide).
pub fn true_divide(a: &Value, b: &Value, vm: &Vm) -> PyResult<Value> {
    let x = as_f64(a).ok_or_else(|| vm.new_type_error("unsupported operand for /"))?;
    let y = as_f64(b).ok_or_else(|| vm.new_type_error("unsupported operand for /"))?;
    if y == 0.0 {
        return Err(PyException::ZeroDivisionError("float division by zero".to_owned()));
    }
    Ok(Value::Float(x / y))
}

pub fn floor_divide(a: &Value, b: &Value, vm: &Vm) -> PyResult<Value> {
    let x = as_f64(a).ok_or_else(|| vm.new_type_error("unsupported operand for //"))?;
    let y = as_f64(b).ok_or_else(|| vm.new_type_error("unsupported operand for //"))?;
    if y == 0.0 {
        return Err(PyException::ZeroDivisionError("float floor division by zero".to_owned()));
    }
    Ok(Value::Float((x / y).floor()))
}

pub fn modulo(a: &Value, b: &Value, vm: &Vm) -> PyResult<Value> {
    let x = as_f64(a).ok_or_else(|| vm.new_type_error("unsupported operand for %"))?;
    let y = as_f64(b).ok_or_else(|| vm.new_type_error("unsupported operand for %"))?;
    if y == 0.0 {
        return Err(PyException::ZeroDivisionError("float modulo".to_owned()));
    }
    let r = x % y;
    Ok(Value::Float(if r != 0.0 && (r < 0.0) != (y < 0.0) { r + y } else { r }))
}

/// `as_bigint`/`as_f64` both accept `int`/`bool`; used by `ops::binary`
/// to decide whether `int OP float` should defer to float's handler.
pub fn accepts(v: &Value) -> bool {
    as_bigint(v).is_some() || matches!(v, Value::Float(_))
}

pub fn extend_slots(slots: &mut PyTypeSlots) {
    slots.as_number.neg = Some(neg);
    slots.as_number.abs = Some(abs_);
    slots.as_number.int = Some(int_);
    slots.as_number.bool_ = Some(bool_);
    slots.as_number.add = Some(add);
    slots.as_number.sub = Some(sub);
    slots.as_number.mul = Some(mul);
    slots.repr = Some(repr_);
    slots.str_ = Some(repr_);
    slots.hash = Some(hash_);
    slots.richcompare = Some(richcompare);
    slots.new = Some(new);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn true_divide_by_zero_raises_zero_division() {
        let vm = Vm::new();
        let err = true_divide(&Value::Float(1.0), &Value::Float(0.0), &vm).unwrap_err();
        assert!(matches!(err, PyException::ZeroDivisionError(_)));
    }

    #[test]
    fn floor_div_matches_python_rounding() {
        let vm = Vm::new();
        let r = floor_divide(&Value::Float(-7.0), &Value::Float(2.0), &vm).unwrap();
        assert!(matches!(r, Value::Float(f) if f == -4.0));
    }
}
