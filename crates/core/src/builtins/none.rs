//! `NoneType`: one singleton value, `Value::None`. No numeric/sequence
//! slots; only `repr`/`bool` per spec §4.E.

use crate::error::PyResult;
use crate::types::PyTypeSlots;
use crate::value::Value;
use crate::vm::Vm;

fn repr_(_zelf: &Value, _vm: &Vm) -> PyResult<Value> {
    Ok(Value::str("None"))
}

fn bool_(_zelf: &Value, _vm: &Vm) -> PyResult<bool> {
    Ok(false)
}

pub fn extend_slots(slots: &mut PyTypeSlots) {
    slots.repr = Some(repr_);
    slots.str_ = Some(repr_);
    slots.as_number.bool_ = Some(bool_);
}
