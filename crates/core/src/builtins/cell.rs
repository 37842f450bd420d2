//! `cell`: the closure-variable box of spec §4.G's free/cell variable
//! model. No Python-visible slots are needed for CORE's scope (cells
//! aren't indexable, comparable, or callable) — `LOAD_DEREF`/`STORE_DEREF`
//! read and write it directly via [`read`]/[`write`], mirroring the
//! teacher's `PyCell::get`/`set`.

use crate::error::PyResult;
use crate::value::Value;
use crate::vm::Vm;

pub fn read(cell: &Value, vm: &Vm, name: &str) -> PyResult<Value> {
    match cell {
        Value::Cell(c) => c.borrow().clone().ok_or_else(|| {
            crate::error::PyException::UnboundLocalError(format!(
                "free variable '{name}' referenced before assignment in enclosing scope"
            ))
        }),
        other => Err(vm.new_type_error(format!("expected cell, got '{}'", other.type_name()))),
    }
}

pub fn write(cell: &Value, value: Value, vm: &Vm) -> PyResult<()> {
    match cell {
        Value::Cell(c) => {
            *c.borrow_mut() = Some(value);
            Ok(())
        }
        other => Err(vm.new_type_error(format!("expected cell, got '{}'", other.type_name()))),
    }
}

pub fn clear(cell: &Value, vm: &Vm) -> PyResult<()> {
    match cell {
        Value::Cell(c) => {
            *c.borrow_mut() = None;
            Ok(())
        }
        other => Err(vm.new_type_error(format!("expected cell, got '{}'", other.type_name()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbound_cell_read_raises_unbound_local_error() {
        let vm = Vm::new();
        let cell = Value::new_cell(None);
        let err = read(&cell, &vm, "x").unwrap_err();
        assert!(matches!(err, crate::error::PyException::UnboundLocalError(_)));
    }

    #[test]
    fn write_then_read_roundtrips() {
        let vm = Vm::new();
        let cell = Value::new_cell(None);
        write(&cell, Value::int(5), &vm).unwrap();
        let v = read(&cell, &vm, "x").unwrap();
        assert!(matches!(v, Value::Int(n) if n == malachite_bigint::BigInt::from(5)));
    }
}
