//! Abstract operations, spec §4.D: the layer every bytecode handler goes
//! through instead of touching a type's slot table directly. Implements
//! the left/right/reflected-operand dispatch rule, in-place fallback
//! (SPEC_FULL), rich-comparison swapping, and the handful of op + type
//! convenience wrappers (`is_true`, `size`, `repr`, `str_of`, attribute
//! access) that `frame`/`call`/the builtins call into.
//!
//! Mirrors the teacher's `vm::vm::VirtualMachine::_binary_op`-style
//! dispatch helpers, but against this CORE's fixed slot table rather
//! than a generic method-lookup-by-name.

use crate::error::{PyException, PyResult};
use crate::types::{CompareOp, PyTypeRef};
use crate::value::Value;
use crate::vm::Vm;

fn type_of(vm: &Vm, v: &Value) -> PyTypeRef {
    vm.types.type_of(v)
}

/// `__bool__`/`__len__` truthiness, spec §4.D: `nb_bool` wins if present,
/// else `mp_length` then `sq_length` (nonzero is truthy) — per §9's open
/// question, `mp_length` is probed first, matching CPython's order —
/// else every value is truthy (CPython's default).
pub fn is_true(vm: &Vm, v: &Value) -> PyResult<bool> {
    let ty = type_of(vm, v);
    if let Some(f) = ty.slots.as_number.bool_ {
        return f(v, vm);
    }
    if let Some(f) = ty.slots.as_mapping.length {
        return Ok(f(v, vm)? != 0);
    }
    if let Some(f) = ty.slots.as_sequence.length {
        return Ok(f(v, vm)? != 0);
    }
    Ok(true)
}

/// `len(v)`, spec §4.D: tries `sq_length` then `mp_length`.
pub fn size(vm: &Vm, v: &Value) -> PyResult<usize> {
    let ty = type_of(vm, v);
    if let Some(f) = ty.slots.as_sequence.length {
        return f(v, vm);
    }
    if let Some(f) = ty.slots.as_mapping.length {
        return f(v, vm);
    }
    Err(PyException::TypeError(format!(
        "object of type '{}' has no len()",
        v.type_name()
    )))
}

/// `repr(v)`: invokes `tp_repr`, falling back to a generic
/// `<typename object>` form if the type left it empty (never happens for
/// a built-in, but keeps this total rather than panicking).
pub fn repr(vm: &Vm, v: &Value) -> PyResult<String> {
    let ty = type_of(vm, v);
    let rendered = match ty.slots.repr {
        Some(f) => f(v, vm)?,
        None => Value::str(format!("<{} object>", ty.name)),
    };
    match rendered {
        Value::Str(s) => Ok(s.to_string()),
        other => Err(PyException::Internal(format!(
            "__repr__ returned non-string ({})",
            other.type_name()
        ))),
    }
}

/// `str(v)`: `tp_str` if defined, else falls back to `tp_repr` (CPython's
/// `object.__str__` default).
pub fn str_of(vm: &Vm, v: &Value) -> PyResult<Value> {
    let ty = type_of(vm, v);
    if let Some(f) = ty.slots.str_ {
        return f(v, vm);
    }
    Ok(Value::str(repr(vm, v)?))
}

fn unsupported_binop(op: &str, a: &Value, b: &Value) -> PyException {
    PyException::TypeError(format!(
        "unsupported operand type(s) for {op}: '{}' and '{}'",
        a.type_name(),
        b.type_name()
    ))
}

/// The arithmetic/bitwise slot a `BinOp` name selects, spec §4.D.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
}

impl BinOp {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
        }
    }

    fn slot(self, slots: &crate::types::NumberSlots) -> Option<crate::types::slots::BinaryFn> {
        match self {
            Self::Add => slots.add,
            Self::Sub => slots.sub,
            Self::Mul => slots.mul,
            Self::And => slots.and,
            Self::Or => slots.or,
            Self::Xor => slots.xor,
        }
    }

    fn inplace_slot(self, slots: &crate::types::NumberSlots) -> Option<crate::types::slots::BinaryFn> {
        match self {
            Self::Add => slots.inplace_add,
            Self::Sub => slots.inplace_sub,
            Self::Mul => slots.inplace_mul,
            Self::And => slots.inplace_and,
            Self::Or => slots.inplace_or,
            Self::Xor => slots.inplace_xor,
        }
    }
}

/// `a OP b`, spec §4.D's left/right/reflected dispatch:
/// 1. If `type(b)` is a proper subtype of `type(a)` and overrides the
///    slot, try `b`'s reflected handler first (CPython's subclass rule).
/// 2. Otherwise try `a`'s left-hand slot.
/// 3. If that is absent or returns `NotImplemented`, try `b`'s slot
///    playing the same role (built-in types use one commutative-shaped
///    slot for both sides; `mul` additionally falls back to `sq_repeat`
///    when one side is a sequence and the other an index per §4.D).
pub fn binary_op(vm: &Vm, op: BinOp, a: &Value, b: &Value) -> PyResult<Value> {
    let ty_a = type_of(vm, a);
    let ty_b = type_of(vm, b);
    let b_is_subtype = !std::rc::Rc::ptr_eq(&ty_a, &ty_b) && ty_b.is_subtype_of(&ty_a);

    let try_a = |result: &mut Option<Value>| -> PyResult<()> {
        if result.is_none() {
            if let Some(f) = op.slot(&ty_a.slots.as_number) {
                let v = f(a, b, vm)?;
                if !v.is_not_implemented() {
                    *result = Some(v);
                }
            }
        }
        Ok(())
    };
    let try_b = |result: &mut Option<Value>| -> PyResult<()> {
        if result.is_none() {
            if let Some(f) = op.slot(&ty_b.slots.as_number) {
                let v = f(a, b, vm)?;
                if !v.is_not_implemented() {
                    *result = Some(v);
                }
            }
        }
        Ok(())
    };

    let mut result = None;
    if b_is_subtype {
        try_b(&mut result)?;
        try_a(&mut result)?;
    } else {
        try_a(&mut result)?;
        try_b(&mut result)?;
    }

    if result.is_none() && op == BinOp::Mul {
        if let Some(f) = ty_a.slots.as_sequence.repeat {
            if let Some(n) = as_index(vm, b).ok() {
                result = Some(f(a, n, vm)?);
            }
        } else if let Some(f) = ty_b.slots.as_sequence.repeat {
            if let Some(n) = as_index(vm, a).ok() {
                result = Some(f(b, n, vm)?);
            }
        }
    }

    result.ok_or_else(|| unsupported_binop(op.symbol(), a, b))
}

/// `a OP= b`, SPEC_FULL §4.D: tries the in-place slot on `a` first
/// (mutates and returns `a` for mutable types, or the freshly computed
/// value for immutable ones); falls back to the plain `binary_op` path
/// if no in-place slot is defined or it returns `NotImplemented`.
pub fn inplace_binary_op(vm: &Vm, op: BinOp, a: &Value, b: &Value) -> PyResult<Value> {
    let ty_a = type_of(vm, a);
    if let Some(f) = op.inplace_slot(&ty_a.slots.as_number) {
        let v = f(a, b, vm)?;
        if !v.is_not_implemented() {
            return Ok(v);
        }
    }
    binary_op(vm, op, a, b)
}

fn as_index(vm: &Vm, v: &Value) -> PyResult<i64> {
    use num_traits::ToPrimitive;
    match v {
        Value::Int(i) => i
            .to_i64()
            .ok_or_else(|| PyException::OverflowError("index too large".to_owned())),
        Value::Bool(b) => Ok(*b as i64),
        other => {
            let ty = type_of(vm, other);
            if let Some(f) = ty.slots.as_number.index {
                if let Value::Int(i) = f(other, vm)? {
                    return i
                        .to_i64()
                        .ok_or_else(|| PyException::OverflowError("index too large".to_owned()));
                }
            }
            Err(PyException::TypeError(format!(
                "'{}' object cannot be interpreted as an integer",
                other.type_name()
            )))
        }
    }
}

/// `a CMP b`, spec §4.D: left handler first, then (unless the left
/// handler already ran because `b`'s type is a proper subtype overriding
/// `richcompare`) the swapped comparison on `b`.
pub fn rich_compare(vm: &Vm, a: &Value, b: &Value, op: CompareOp) -> PyResult<Value> {
    let ty_a = type_of(vm, a);
    let ty_b = type_of(vm, b);
    let b_is_subtype = !std::rc::Rc::ptr_eq(&ty_a, &ty_b) && ty_b.is_subtype_of(&ty_a);

    let try_a = |vm: &Vm| -> PyResult<Option<Value>> {
        match ty_a.slots.richcompare {
            Some(f) => {
                let v = f(a, b, op, vm)?;
                Ok((!v.is_not_implemented()).then_some(v))
            }
            None => Ok(None),
        }
    };
    let try_b = |vm: &Vm| -> PyResult<Option<Value>> {
        match ty_b.slots.richcompare {
            Some(f) => {
                let v = f(b, a, op.swapped(), vm)?;
                Ok((!v.is_not_implemented()).then_some(v))
            }
            None => Ok(None),
        }
    };

    let result = if b_is_subtype {
        match try_b(vm)? {
            Some(v) => Some(v),
            None => try_a(vm)?,
        }
    } else {
        match try_a(vm)? {
            Some(v) => Some(v),
            None => try_b(vm)?,
        }
    };

    match result {
        Some(v) => Ok(v),
        None if op == CompareOp::Eq => Ok(Value::Bool(a.is_identical(b))),
        None if op == CompareOp::Ne => Ok(Value::Bool(!a.is_identical(b))),
        None => Err(PyException::TypeError(format!(
            "'{}' not supported between instances of '{}' and '{}'",
            op.symbol(),
            a.type_name(),
            b.type_name()
        ))),
    }
}

/// `rich_compare` plus truthiness extraction, spec §4.D — what
/// `COMPARE_OP`/sort/`in` actually need. Short-circuits on identity for
/// `==`/`!=` before any slot runs (spec §4.D, §8 "identity implies
/// equality"), so a NaN `float` (or a container holding one) still
/// compares equal to itself.
pub fn rich_compare_bool(vm: &Vm, a: &Value, b: &Value, op: CompareOp) -> PyResult<bool> {
    if a.is_identical(b) {
        match op {
            CompareOp::Eq => return Ok(true),
            CompareOp::Ne => return Ok(false),
            _ => {}
        }
    }
    let v = rich_compare(vm, a, b, op)?;
    is_true(vm, &v)
}

/// `a == b` via structural equality fast path isn't used here on
/// purpose: §4.D routes every comparison through slots so user-visible
/// semantics (e.g. bool/int cross-equality) stay centralized in one
/// place (`int`/`bool`/`float`'s `richcompare`).
pub fn equal(vm: &Vm, a: &Value, b: &Value) -> PyResult<bool> {
    rich_compare_bool(vm, a, b, CompareOp::Eq)
}

/// `v[key]`, spec §4.D: `mp_subscript` if the type is a mapping,
/// else `sq_item` after coercing `key` via `__index__`.
pub fn get_item(vm: &Vm, v: &Value, key: &Value) -> PyResult<Value> {
    let ty = type_of(vm, v);
    if let Some(f) = ty.slots.as_mapping.subscript {
        return f(v, key, vm);
    }
    if let Some(f) = ty.slots.as_sequence.item {
        let idx = as_index(vm, key)?;
        return f(v, idx, vm);
    }
    Err(PyException::TypeError(format!(
        "'{}' object is not subscriptable",
        v.type_name()
    )))
}

pub fn set_item(vm: &Vm, v: &Value, key: &Value, value: Value) -> PyResult<()> {
    let ty = type_of(vm, v);
    if let Some(f) = ty.slots.as_mapping.ass_subscript {
        return f(v, key, value, vm);
    }
    if let Some(f) = ty.slots.as_sequence.ass_item {
        let idx = as_index(vm, key)?;
        return f(v, idx, value, vm);
    }
    Err(PyException::TypeError(format!(
        "'{}' object does not support item assignment",
        v.type_name()
    )))
}

pub fn del_item(vm: &Vm, v: &Value, key: &Value) -> PyResult<()> {
    let ty = type_of(vm, v);
    if let Some(f) = ty.slots.as_mapping.del_item {
        return f(v, key, vm);
    }
    Err(PyException::TypeError(format!(
        "'{}' object does not support item deletion",
        v.type_name()
    )))
}

/// `getattr(v, name)`, spec §4.D: `tp_getattribute` (unconditional hook)
/// first, then the narrower `tp_getattr` if the former is absent.
pub fn get_attr(vm: &Vm, v: &Value, name: &str) -> PyResult<Value> {
    let ty = type_of(vm, v);
    if let Some(f) = ty.slots.getattribute {
        return f(v, name, vm);
    }
    if let Some(f) = ty.slots.getattr {
        return f(v, name, vm);
    }
    Err(PyException::AttributeError(format!(
        "'{}' object has no attribute '{name}'",
        v.type_name()
    )))
}

pub fn set_attr(vm: &Vm, v: &Value, name: &str, value: Value) -> PyResult<()> {
    let ty = type_of(vm, v);
    match ty.slots.setattr {
        Some(f) => f(v, name, value, vm),
        None => Err(PyException::AttributeError(format!(
            "'{}' object has no attribute '{name}'",
            v.type_name()
        ))),
    }
}

pub fn del_attr(vm: &Vm, v: &Value, name: &str) -> PyResult<()> {
    let ty = type_of(vm, v);
    match ty.slots.delattr {
        Some(f) => f(v, name, vm),
        None => Err(PyException::AttributeError(format!(
            "'{}' object has no attribute '{name}'",
            v.type_name()
        ))),
    }
}

/// Which numeric path `/`, `//`, `%` take, spec §4.E/§4.G: the CORE has
/// no `__truediv__`/`__floordiv__`/`__mod__` slots (§4.B enumerates a
/// fixed slot set that doesn't include them), so the interpreter calls
/// these directly instead of going through `binary_op`. Both operands
/// int/bool stays on the int path (`//`/`%` return `int`, `/` still
/// widens to `float` per Python 3); either operand `float` takes the
/// float path, which accepts int/bool by conversion.
fn both_int_like(a: &Value, b: &Value) -> bool {
    crate::builtins::int::as_bigint(a).is_some() && crate::builtins::int::as_bigint(b).is_some()
}

pub fn true_divide(vm: &Vm, a: &Value, b: &Value) -> PyResult<Value> {
    if both_int_like(a, b) {
        crate::builtins::int::true_divide(a, b, vm)
    } else if crate::builtins::float_::accepts(a) && crate::builtins::float_::accepts(b) {
        crate::builtins::float_::true_divide(a, b, vm)
    } else {
        Err(unsupported_binop("/", a, b))
    }
}

pub fn floor_divide(vm: &Vm, a: &Value, b: &Value) -> PyResult<Value> {
    if both_int_like(a, b) {
        crate::builtins::int::floor_divide(a, b, vm)
    } else if crate::builtins::float_::accepts(a) && crate::builtins::float_::accepts(b) {
        crate::builtins::float_::floor_divide(a, b, vm)
    } else {
        Err(unsupported_binop("//", a, b))
    }
}

pub fn modulo(vm: &Vm, a: &Value, b: &Value) -> PyResult<Value> {
    if both_int_like(a, b) {
        crate::builtins::int::modulo(a, b, vm)
    } else if crate::builtins::float_::accepts(a) && crate::builtins::float_::accepts(b) {
        crate::builtins::float_::modulo(a, b, vm)
    } else {
        Err(unsupported_binop("%", a, b))
    }
}

/// `callable(args, kwargs)`, spec §4.D/§4.H entry point: every callable
/// Value (function, builtin function, type) exposes `tp_call`.
pub fn call(vm: &Vm, callable: &Value, args: &[Value], kwargs: Option<&Value>) -> PyResult<Value> {
    let ty = type_of(vm, callable);
    match ty.slots.call {
        Some(f) => f(callable, args, kwargs, vm),
        None => Err(PyException::TypeError(format!(
            "'{}' object is not callable",
            callable.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_op_falls_back_to_reflected_operand() {
        let vm = Vm::new();
        let r = binary_op(&vm, BinOp::Add, &Value::int(1), &Value::int(2)).unwrap();
        assert!(matches!(r, Value::Int(n) if n == malachite_bigint::BigInt::from(3)));
    }

    #[test]
    fn binary_op_mismatched_types_raises_type_error() {
        let vm = Vm::new();
        let err = binary_op(&vm, BinOp::Add, &Value::int(1), &Value::str("x")).unwrap_err();
        assert!(matches!(err, PyException::TypeError(_)));
    }

    #[test]
    fn mul_falls_back_to_sequence_repeat() {
        let vm = Vm::new();
        let r = binary_op(&vm, BinOp::Mul, &Value::str("ab"), &Value::int(2)).unwrap();
        assert!(matches!(r, Value::Str(s) if &*s == "abab"));
    }

    #[test]
    fn equality_of_unrelated_types_is_false_not_an_error() {
        let vm = Vm::new();
        assert!(!equal(&vm, &Value::int(1), &Value::str("1")).unwrap());
    }
}
