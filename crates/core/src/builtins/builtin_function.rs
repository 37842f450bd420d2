//! `builtin_function_or_method`: a host-implemented callable, spec §3/§6.
//! Registration classifies a natural Rust implementation into one of the
//! three calling-convention shapes of §4.H/§6 by a `PyMethodFlags` bit
//! pair, the hand-written stand-in for the teacher's `#[pyfunction]`
//! macro (which the spec puts out of scope per §1 except for its output
//! contract).

use bitflags::bitflags;
use std::rc::Rc;

use crate::error::{PyException, PyResult};
use crate::value::Value;
use crate::vm::Vm;

bitflags! {
    /// Subset of spec §3's built-in-function flags that affect call
    /// shape. `FASTCALL`/`STATIC`/`CLASS` are accepted for parity with
    /// the spec's flag set but are not load-bearing in this CORE (no
    /// fast-positional entry point, no bound-method descriptors).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PyMethodFlags: u8 {
        const VARARGS  = 1 << 0;
        const KEYWORDS = 1 << 1;
        const FASTCALL = 1 << 2;
        const STATIC   = 1 << 3;
        const CLASS    = 1 << 4;
    }
}

/// The classic calling convention of spec §6: `(tuple args, dict|null
/// kwargs) → value`.
pub type NativeFn = fn(&[Value], Option<&crate::builtins::dict::PyDict>, &Vm) -> PyResult<Value>;

#[derive(Debug)]
pub struct BuiltinFunctionDef {
    pub name: String,
    pub doc: Option<String>,
    pub flags: PyMethodFlags,
    /// Only meaningful when neither `VARARGS` nor `KEYWORDS` is set
    /// (spec §4.H "Fixed arity N").
    pub arity: usize,
    pub func: NativeFn,
}

impl BuiltinFunctionDef {
    pub fn fixed(name: impl Into<String>, arity: usize, func: NativeFn) -> Self {
        Self {
            name: name.into(),
            doc: None,
            flags: PyMethodFlags::empty(),
            arity,
            func,
        }
    }

    pub fn varargs(name: impl Into<String>, func: NativeFn) -> Self {
        Self {
            name: name.into(),
            doc: None,
            flags: PyMethodFlags::VARARGS,
            arity: 0,
            func,
        }
    }

    pub fn varargs_keywords(name: impl Into<String>, func: NativeFn) -> Self {
        Self {
            name: name.into(),
            doc: None,
            flags: PyMethodFlags::VARARGS | PyMethodFlags::KEYWORDS,
            arity: 0,
            func,
        }
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

/// The one-time "signature lifting" of spec §4.H/§6: applies the guard
/// each flag combination implies, then spreads/forwards to the natural
/// implementation.
fn invoke(def: &BuiltinFunctionDef, args: &[Value], kwargs: Option<&Value>, vm: &Vm) -> PyResult<Value> {
    let kwargs_dict = match kwargs {
        None => None,
        Some(Value::Dict(d)) => {
            if d.borrow().is_empty() {
                None
            } else {
                Some(d.clone())
            }
        }
        Some(_) => return Err(vm.new_type_error("kwargs must be a dict")),
    };

    if def.flags.contains(PyMethodFlags::KEYWORDS) {
        let borrow = kwargs_dict.as_ref().map(|d| d.borrow());
        return (def.func)(args, borrow.as_deref(), vm);
    }

    if kwargs_dict.is_some() {
        return Err(PyException::TypeError(format!(
            "{}() takes no keyword arguments",
            def.name
        )));
    }

    if def.flags.contains(PyMethodFlags::VARARGS) {
        return (def.func)(args, None, vm);
    }

    // Fixed arity N: guard len(args) == N.
    if args.len() != def.arity {
        return Err(PyException::TypeError(format!(
            "{}() takes exactly {} argument{} ({} given)",
            def.name,
            def.arity,
            if def.arity == 1 { "" } else { "s" },
            args.len()
        )));
    }
    (def.func)(args, None, vm)
}

fn call(zelf: &Value, args: &[Value], kwargs: Option<&Value>, vm: &Vm) -> PyResult<Value> {
    let Value::BuiltinFunction(def) = zelf else {
        return Err(vm.new_type_error("expected builtin_function_or_method"));
    };
    invoke(def, args, kwargs, vm)
}

pub fn extend_slots(slots: &mut crate::types::PyTypeSlots) {
    slots.call = Some(call);
}

fn len_impl(args: &[Value], _kwargs: Option<&crate::builtins::dict::PyDict>, vm: &Vm) -> PyResult<Value> {
    Ok(Value::int(crate::ops::size(vm, &args[0])? as i64))
}

/// `len`, seeded into default builtins (spec §4.G's "Builtins inference"
/// fallback dict needs at least one callable builtin for the §8
/// scenarios to resolve names against).
pub fn len_def() -> BuiltinFunctionDef {
    BuiltinFunctionDef::fixed("len", 1, len_impl).doc("Return the number of items in a container.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_arity_rejects_wrong_argument_count() {
        let vm = Vm::new();
        let def = len_def();
        let err = invoke(&def, &[], None, &vm).unwrap_err();
        assert!(matches!(err, PyException::TypeError(_)));
    }

    #[test]
    fn fixed_arity_rejects_keywords() {
        let vm = Vm::new();
        let def = len_def();
        let kwargs = Value::Dict(Rc::new(std::cell::RefCell::new({
            let mut d = crate::builtins::dict::PyDict::new();
            d.insert(Value::str("x"), Value::int(1)).unwrap();
            d
        })));
        let err = invoke(&def, &[Value::list(vec![])], Some(&kwargs), &vm).unwrap_err();
        assert!(matches!(err, PyException::TypeError(_)));
    }
}
