//! `module`: a namespace backed by a dict, spec §4.E. `init()` populates
//! the backing dict with the module's exported names; attribute access
//! goes straight to that dict rather than through a separate descriptor
//! protocol (out of scope for this CORE).

use std::cell::RefCell;
use std::rc::Rc;

use crate::builtins::dict::PyDict;
use crate::error::PyResult;
use crate::types::PyTypeSlots;
use crate::value::Value;
use crate::vm::Vm;

#[derive(Debug)]
pub struct PyModule {
    pub name: String,
    pub dict: Rc<RefCell<PyDict>>,
}

impl PyModule {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut dict = PyDict::new();
        dict.insert_str("__name__", Value::str(name.clone()));
        Self {
            name,
            dict: Rc::new(RefCell::new(dict)),
        }
    }

    /// Populate `dict` with the module's exported names, spec §4.E.
    pub fn init(&self, exports: Vec<(&str, Value)>) {
        let mut dict = self.dict.borrow_mut();
        for (name, value) in exports {
            dict.insert_str(name, value);
        }
    }
}

fn self_module(zelf: &Value) -> &Rc<RefCell<PyModule>> {
    match zelf {
        Value::Module(m) => m,
        _ => panic!("module slot invoked on non-module"),
    }
}

fn getattribute(zelf: &Value, name: &str, _vm: &Vm) -> PyResult<Value> {
    let module = self_module(zelf);
    let found = module.borrow().dict.borrow().get(&Value::str(name))?;
    found.ok_or_else(|| {
        crate::error::PyException::AttributeError(format!(
            "module '{}' has no attribute '{name}'",
            module.borrow().name
        ))
    })
}

fn setattr(zelf: &Value, name: &str, value: Value, _vm: &Vm) -> PyResult<()> {
    let module = self_module(zelf);
    module.borrow().dict.borrow_mut().insert_str(name, value);
    Ok(())
}

fn delattr(zelf: &Value, name: &str, vm: &Vm) -> PyResult<()> {
    let module = self_module(zelf);
    let removed = module.borrow().dict.borrow_mut().remove(&Value::str(name))?;
    if removed.is_none() {
        return Err(crate::error::PyException::AttributeError(format!(
            "module '{}' has no attribute '{name}'",
            module.borrow().name
        )));
    }
    let _ = vm;
    Ok(())
}

fn repr_(zelf: &Value, _vm: &Vm) -> PyResult<Value> {
    let module = self_module(zelf);
    Ok(Value::str(format!("<module '{}'>", module.borrow().name)))
}

pub fn extend_slots(slots: &mut PyTypeSlots) {
    slots.getattribute = Some(getattribute);
    slots.setattr = Some(setattr);
    slots.delattr = Some(delattr);
    slots.repr = Some(repr_);
    slots.str_ = Some(repr_);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_populates_backing_dict() {
        let module = PyModule::new("demo");
        module.init(vec![("answer", Value::int(42))]);
        let v = module.dict.borrow().get(&Value::str("answer")).unwrap();
        assert!(matches!(v, Some(Value::Int(n)) if n == malachite_bigint::BigInt::from(42)));
    }

    #[test]
    fn getattribute_reads_through_dict() {
        let vm = Vm::new();
        let module = PyModule::new("demo");
        module.init(vec![("x", Value::int(1))]);
        let value = Value::Module(Rc::new(RefCell::new(module)));
        let v = getattribute(&value, "x", &vm).unwrap();
        assert!(matches!(v, Value::Int(n) if n == malachite_bigint::BigInt::from(1)));
    }
}
