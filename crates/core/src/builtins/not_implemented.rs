//! `NotImplementedType`: the sentinel a rich-compare/binary slot returns
//! to signal "I don't know how to do this; try the reflected operand",
//! spec §4.D. Always truthy, like CPython's (a deprecation warning in
//! real CPython for `bool(NotImplemented)` is out of scope here).

use crate::error::PyResult;
use crate::types::PyTypeSlots;
use crate::value::Value;
use crate::vm::Vm;

fn repr_(_zelf: &Value, _vm: &Vm) -> PyResult<Value> {
    Ok(Value::str("NotImplemented"))
}

fn bool_(_zelf: &Value, _vm: &Vm) -> PyResult<bool> {
    Ok(true)
}

pub fn extend_slots(slots: &mut PyTypeSlots) {
    slots.repr = Some(repr_);
    slots.str_ = Some(repr_);
    slots.as_number.bool_ = Some(bool_);
}
