//! `int`: arbitrary precision, spec §4.E. Defines every numeric slot;
//! `bool` (spec's required "subtype of int") inherits all of them and
//! only overrides `and`/`or`/`xor` (SPEC_FULL §4.E) to stay `bool` when
//! both operands are `bool`.

use malachite_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::error::{PyException, PyResult};
use crate::types::PyTypeSlots;
use crate::value::Value;
use crate::vm::Vm;

/// Coerce `v` to a `BigInt` if it is `int` or `bool` (bool is 0/1),
/// spec's "accepts int by conversion" rule as seen from `int`'s side.
pub fn as_bigint(v: &Value) -> Option<BigInt> {
    match v {
        Value::Int(i) => Some(i.clone()),
        Value::Bool(b) => Some(BigInt::from(*b as i64)),
        _ => None,
    }
}

fn neg(zelf: &Value, _vm: &Vm) -> PyResult<Value> {
    Ok(Value::Int(-as_bigint(zelf).expect("int neg on non-int")))
}

fn abs_(zelf: &Value, _vm: &Vm) -> PyResult<Value> {
    Ok(Value::Int(as_bigint(zelf).expect("int abs on non-int").abs()))
}

fn int_(zelf: &Value, _vm: &Vm) -> PyResult<Value> {
    Ok(Value::Int(as_bigint(zelf).expect("int __int__ on non-int")))
}

fn index(zelf: &Value, _vm: &Vm) -> PyResult<Value> {
    Ok(Value::Int(as_bigint(zelf).expect("int __index__ on non-int")))
}

fn repr_(zelf: &Value, _vm: &Vm) -> PyResult<Value> {
    Ok(Value::str(as_bigint(zelf).expect("int repr on non-int").to_string()))
}

fn hash_(zelf: &Value, _vm: &Vm) -> PyResult<i64> {
    Ok(picovm_common::hash::hash_bigint(
        &as_bigint(zelf).expect("int hash on non-int"),
    ))
}

fn bool_(zelf: &Value, _vm: &Vm) -> PyResult<bool> {
    Ok(!as_bigint(zelf).expect("int bool on non-int").is_zero())
}

macro_rules! binary_op {
    ($name:ident, $op:tt) => {
        fn $name(a: &Value, b: &Value, _vm: &Vm) -> PyResult<Value> {
            let x = as_bigint(a).expect("left operand must be int");
            match as_bigint(b) {
                Some(y) => Ok(Value::Int(x $op y)),
                None => Ok(Value::NotImplemented),
            }
        }
    };
}

binary_op!(add, +);
binary_op!(sub, -);
binary_op!(mul, *);
binary_op!(and, &);
binary_op!(or, |);
binary_op!(xor, ^);

fn new(
    cls: &crate::types::PyTypeRef,
    args: &[Value],
    kwargs: Option<&Value>,
    vm: &Vm,
) -> PyResult<Value> {
    if kwargs.is_some_and(|k| !matches!(k, Value::Dict(d) if d.borrow().is_empty())) {
        return Err(PyException::TypeError(
            "int() takes no keyword arguments".to_owned(),
        ));
    }
    let result = match args {
        [] => BigInt::zero(),
        [x] => from_value(x, None, vm)?,
        [x, base] => {
            let base = as_bigint(base)
                .and_then(|b| b.to_u32())
                .ok_or_else(|| vm.new_type_error("int() base must be an integer"))?;
            from_value(x, Some(base), vm)?
        }
        _ => {
            return Err(PyException::TypeError(
                "int() takes at most 2 arguments".to_owned(),
            ));
        }
    };
    let _ = cls;
    Ok(Value::Int(result))
}

fn from_value(x: &Value, base: Option<u32>, vm: &Vm) -> PyResult<BigInt> {
    match (x, base) {
        (Value::Str(s), base) => parse_int_literal(s, base.unwrap_or(10)),
        (other, Some(_)) => Err(vm.new_type_error(format!(
            "int() can't convert non-string with explicit base, got '{}'",
            other.type_name()
        ))),
        (Value::Int(i), None) => Ok(i.clone()),
        (Value::Bool(b), None) => Ok(BigInt::from(*b as i64)),
        (Value::Float(f), None) => Ok(BigInt::from(f.trunc() as i64)),
        (other, None) => Err(vm.new_type_error(format!(
            "int() argument must be a string, a bytes-like object or a real number, not '{}'",
            other.type_name()
        ))),
    }
}

/// Parse an `int()` literal, SPEC_FULL §4.E: optional sign, `0x`/`0o`/`0b`
/// prefixes recognized when `base` matches (or `base == 0`, in which case
/// the prefix *selects* the base), single digit-group underscores, no
/// leading/trailing/double underscores.
pub fn parse_int_literal(raw: &str, base: u32) -> PyResult<BigInt> {
    let invalid = || {
        PyException::ValueError(format!(
            "invalid literal for int() with base {base}: {raw:?}"
        ))
    };
    if !(base == 0 || (2..=36).contains(&base)) {
        return Err(PyException::ValueError(
            "int() base must be >= 2 and <= 36, or 0".to_owned(),
        ));
    }
    let s = raw.trim();
    if s.is_empty() {
        return Err(invalid());
    }
    let (sign, rest) = match s.as_bytes()[0] {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => (1, s),
    };
    if rest.is_empty() {
        return Err(invalid());
    }
    let (effective_base, digits) = detect_base(rest, base).ok_or_else(invalid)?;
    if digits.is_empty() {
        return Err(invalid());
    }
    let cleaned = strip_underscores(digits).ok_or_else(invalid)?;
    if cleaned.is_empty() {
        return Err(invalid());
    }
    let mut acc = BigInt::zero();
    let radix = BigInt::from(effective_base);
    for ch in cleaned.chars() {
        let d = ch.to_digit(effective_base).ok_or_else(invalid)?;
        acc = acc * &radix + BigInt::from(d);
    }
    Ok(acc * sign)
}

/// `int / int`, spec's `BINARY_TRUE_DIVIDE`: Python 3 true division of
/// two ints always produces a `float` (unlike `//`/`%`, which stay int).
pub fn true_divide(a: &Value, b: &Value, vm: &Vm) -> PyResult<Value> {
    let x = as_bigint(a).expect("left operand must be int");
    let y = as_bigint(b).ok_or_else(|| vm.new_type_error("unsupported operand for /"))?;
    if y.is_zero() {
        return Err(PyException::ZeroDivisionError("division by zero".to_owned()));
    }
    let xf = x.to_f64().unwrap_or(f64::NAN);
    let yf = y.to_f64().unwrap_or(f64::NAN);
    Ok(Value::Float(xf / yf))
}

/// `int // int`, spec's `BINARY_FLOOR_DIVIDE`: floors toward negative
/// infinity, matching CPython (not Rust's truncating `/`).
pub fn floor_divide(a: &Value, b: &Value, vm: &Vm) -> PyResult<Value> {
    let x = as_bigint(a).expect("left operand must be int");
    let y = as_bigint(b).ok_or_else(|| vm.new_type_error("unsupported operand for //"))?;
    if y.is_zero() {
        return Err(PyException::ZeroDivisionError(
            "integer division or modulo by zero".to_owned(),
        ));
    }
    Ok(Value::Int(x.div_floor(&y)))
}

/// `int % int`, spec's `BINARY_MODULO`: result carries the sign of the
/// divisor, matching CPython (not Rust's `%`, which carries the sign of
/// the dividend).
pub fn modulo(a: &Value, b: &Value, vm: &Vm) -> PyResult<Value> {
    let x = as_bigint(a).expect("left operand must be int");
    let y = as_bigint(b).ok_or_else(|| vm.new_type_error("unsupported operand for %"))?;
    if y.is_zero() {
        return Err(PyException::ZeroDivisionError(
            "integer division or modulo by zero".to_owned(),
        ));
    }
    Ok(Value::Int(x.mod_floor(&y)))
}

fn detect_base(rest: &str, base: u32) -> Option<(u32, &str)> {
    let lower: String = rest.chars().take(2).collect::<String>().to_lowercase();
    let prefixed = |p: &str| rest.len() > p.len() && lower.starts_with(p);
    match base {
        0 => {
            if prefixed("0x") {
                Some((16, &rest[2..]))
            } else if prefixed("0o") {
                Some((8, &rest[2..]))
            } else if prefixed("0b") {
                Some((2, &rest[2..]))
            } else if rest.chars().all(|c| c == '0' || c == '_') {
                Some((10, rest))
            } else if rest.starts_with('0') && rest.len() > 1 {
                None // leading zero without a base prefix is not a valid literal
            } else {
                Some((10, rest))
            }
        }
        16 if prefixed("0x") => Some((16, &rest[2..])),
        8 if prefixed("0o") => Some((8, &rest[2..])),
        2 if prefixed("0b") => Some((2, &rest[2..])),
        b => Some((b, rest)),
    }
}

fn strip_underscores(s: &str) -> Option<String> {
    if s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return None;
    }
    Some(s.replace('_', ""))
}

pub fn extend_slots(slots: &mut PyTypeSlots) {
    slots.as_number.neg = Some(neg);
    slots.as_number.abs = Some(abs_);
    slots.as_number.int = Some(int_);
    slots.as_number.index = Some(index);
    slots.as_number.bool_ = Some(bool_);
    slots.as_number.add = Some(add);
    slots.as_number.sub = Some(sub);
    slots.as_number.mul = Some(mul);
    slots.as_number.and = Some(and);
    slots.as_number.or = Some(or);
    slots.as_number.xor = Some(xor);
    slots.repr = Some(repr_);
    slots.str_ = Some(repr_);
    slots.hash = Some(hash_);
    slots.richcompare = Some(richcompare);
    slots.new = Some(new);
}

fn richcompare(a: &Value, b: &Value, op: crate::types::CompareOp, _vm: &Vm) -> PyResult<Value> {
    use crate::types::CompareOp::*;
    let (Some(x), Some(y)) = (as_bigint(a), as_bigint(b)) else {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal() {
        assert_eq!(parse_int_literal("42", 10).unwrap(), BigInt::from(42));
        assert_eq!(parse_int_literal("-42", 10).unwrap(), BigInt::from(-42));
        assert_eq!(parse_int_literal("1_000", 10).unwrap(), BigInt::from(1000));
    }

    #[test]
    fn parses_with_prefix_when_base_zero() {
        assert_eq!(parse_int_literal("0x2a", 0).unwrap(), BigInt::from(42));
        assert_eq!(parse_int_literal("0b101", 0).unwrap(), BigInt::from(5));
    }

    #[test]
    fn base_36_round_trip() {
        assert_eq!(parse_int_literal("10", 36).unwrap(), BigInt::from(36));
    }

    #[test]
    fn rejects_bad_base() {
        assert!(parse_int_literal("10", 37).is_err());
    }

    #[test]
    fn rejects_double_underscore() {
        assert!(parse_int_literal("1__000", 10).is_err());
    }

    #[test]
    fn floor_divide_rounds_toward_negative_infinity() {
        let vm = Vm::new();
        let r = floor_divide(&Value::int(-7), &Value::int(2), &vm).unwrap();
        assert!(matches!(r, Value::Int(n) if n == BigInt::from(-4)));
    }

    #[test]
    fn modulo_carries_divisor_sign() {
        let vm = Vm::new();
        let r = modulo(&Value::int(-7), &Value::int(2), &vm).unwrap();
        assert!(matches!(r, Value::Int(n) if n == BigInt::from(1)));
    }

    #[test]
    fn true_divide_by_zero_raises_zero_division() {
        let vm = Vm::new();
        let err = true_divide(&Value::int(1), &Value::int(0), &vm).unwrap_err();
        assert!(matches!(err, PyException::ZeroDivisionError(_)));
    }
}
