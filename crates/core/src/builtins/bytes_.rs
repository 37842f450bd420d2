//! `bytes`: an immutable sequence of 0..255 integers, spec §4.E. Mirrors
//! `str_`'s slot set but indexes by byte and yields `int` elements.

use crate::error::{PyException, PyResult};
use crate::types::{CompareOp, PyTypeSlots};
use crate::value::Value;
use crate::vm::Vm;

fn as_bytes(v: &Value) -> Option<&[u8]> {
    match v {
        Value::Bytes(b) => Some(b),
        _ => None,
    }
}

fn self_bytes(zelf: &Value) -> &[u8] {
    as_bytes(zelf).expect("bytes slot invoked on non-bytes")
}

fn repr_(zelf: &Value, _vm: &Vm) -> PyResult<Value> {
    let mut out = String::from("b'");
    for &byte in self_bytes(zelf) {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(byte as char),
            _ => out.push_str(&format!("\\x{byte:02x}")),
        }
    }
    out.push('\'');
    Ok(Value::str(out))
}

fn hash_(zelf: &Value, _vm: &Vm) -> PyResult<i64> {
    Ok(picovm_common::hash::hash_bytes(self_bytes(zelf)))
}

fn add(a: &Value, b: &Value, _vm: &Vm) -> PyResult<Value> {
    let x = self_bytes(a);
    match as_bytes(b) {
        Some(y) => {
            let mut combined = Vec::with_capacity(x.len() + y.len());
            combined.extend_from_slice(x);
            combined.extend_from_slice(y);
            Ok(Value::bytes(combined))
        }
        None => Ok(Value::NotImplemented),
    }
}

fn richcompare(a: &Value, b: &Value, op: CompareOp, _vm: &Vm) -> PyResult<Value> {
    use CompareOp::*;
    let x = self_bytes(a);
    let Some(y) = as_bytes(b) else {
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
    Ok(self_bytes(zelf).len())
}

fn sq_item(zelf: &Value, index: i64, _vm: &Vm) -> PyResult<Value> {
    let b = self_bytes(zelf);
    let len = b.len() as i64;
    let idx = if index < 0 { index + len } else { index };
    if idx < 0 || idx >= len {
        return Err(PyException::IndexError("index out of range".to_owned()));
    }
    Ok(Value::int(b[idx as usize] as i64))
}

fn sq_repeat(zelf: &Value, n: i64, _vm: &Vm) -> PyResult<Value> {
    let b = self_bytes(zelf);
    if n <= 0 {
        return Ok(Value::bytes(Vec::new()));
    }
    Ok(Value::bytes(b.repeat(n as usize)))
}

fn new(
    _cls: &crate::types::PyTypeRef,
    args: &[Value],
    _kwargs: Option<&Value>,
    vm: &Vm,
) -> PyResult<Value> {
    match args {
        [] => Ok(Value::bytes(Vec::new())),
        [Value::Int(n)] => {
            use num_traits::ToPrimitive;
            let n = n
                .to_usize()
                .ok_or_else(|| vm.new_value_error("negative count"))?;
            Ok(Value::bytes(vec![0u8; n]))
        }
        [Value::Bytes(b)] => Ok(Value::Bytes(b.clone())),
        [other] => Err(vm.new_type_error(format!(
            "cannot convert '{}' object to bytes",
            other.type_name()
        ))),
        _ => Err(vm.new_type_error("bytes() takes at most 1 argument")),
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
    fn repr_escapes_non_printable_bytes() {
        let vm = Vm::new();
        let v = Value::bytes(vec![0x41, 0x00, 0x27]);
        let r = repr_(&v, &vm).unwrap();
        assert!(matches!(r, Value::Str(s) if &*s == "b'A\\x00\\''"));
    }

    #[test]
    fn negative_index_wraps() {
        let vm = Vm::new();
        let v = Value::bytes(vec![1, 2, 3]);
        let r = sq_item(&v, -1, &vm).unwrap();
        assert!(matches!(r, Value::Int(n) if n == malachite_bigint::BigInt::from(3)));
    }
}
