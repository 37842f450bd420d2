//! `type` as a callable value, spec §4.E/§4.H: "when a type is itself
//! called as `type(v)`, return the type of v; otherwise... invoke the
//! type's `new` then, if the resulting value is an instance of the
//! type, `init`." This is the one call-slot shape that dispatches on
//! the *callable itself* being a type rather than on an ordinary
//! instance, so it lives in its own module rather than under a
//! particular built-in type.

use crate::error::PyResult;
use crate::types::PyTypeSlots;
use crate::value::Value;
use crate::vm::Vm;

/// Spec §9 "Type enquiry carve-out": recognized by "callable is the
/// type-type, len(args)==1, no kwargs" — checked by the caller before
/// even reaching this slot (`call` below), since the carve-out applies
/// to `type` itself being called, not to every type's `new`/`init` path.
fn call(zelf: &Value, args: &[Value], kwargs: Option<&Value>, vm: &Vm) -> PyResult<Value> {
    let Value::Type(cls) = zelf else {
        return Err(vm.new_type_error("expected type"));
    };

    let kwargs_empty = kwargs.is_none_or(|k| matches!(k, Value::Dict(d) if d.borrow().is_empty()));

    // `type(x)` type-enquiry shortcut: exactly one positional, no
    // keywords, and the callable is literally `type` itself.
    if std::rc::Rc::ptr_eq(cls, &vm.types.type_type) && args.len() == 1 && kwargs_empty {
        return Ok(Value::Type(vm.types.type_of(&args[0])));
    }

    let new_fn = cls.slots.new.ok_or_else(|| {
        vm.new_type_error(format!("cannot create '{}' instances", cls.name))
    })?;
    let obj = new_fn(cls, args, kwargs, vm)?;

    let obj_type = vm.types.type_of(&obj);
    if obj_type.is_subtype_of(cls) {
        if let Some(init_fn) = obj_type.slots.init {
            init_fn(&obj, args, kwargs, vm)?;
        }
    }
    Ok(obj)
}

pub fn extend_slots(slots: &mut PyTypeSlots) {
    slots.call = Some(call);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_enquiry_does_not_invoke_new() {
        let vm = Vm::new();
        let type_value = Value::Type(vm.types.type_type.clone());
        let r = call(&type_value, &[Value::int(42)], None, &vm).unwrap();
        assert!(matches!(r, Value::Type(t) if std::rc::Rc::ptr_eq(&t, &vm.types.int_type)));
    }

    #[test]
    fn construction_goes_through_new() {
        let vm = Vm::new();
        let int_value = Value::Type(vm.types.int_type.clone());
        let r = call(&int_value, &[Value::str("10")], None, &vm).unwrap();
        assert!(matches!(r, Value::Int(n) if n == malachite_bigint::BigInt::from(10)));
    }
}
