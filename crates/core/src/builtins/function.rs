//! `function`: a Python function value, spec §3/§4.E. Owns its `Code`,
//! the `globals` dict it closes over, a name, and a closure (cells
//! matching `code.freevars`). Calling one binds arguments (§4.F),
//! builds a frame, and runs the interpreter loop (§4.G) — ported from
//! the teacher's `PyFunction::_invoke`/`bind_args`, trimmed to this
//! CORE's scope (no `__wrapped__`, no coroutine/generator path).

use std::cell::RefCell;
use std::rc::Rc;

use itertools::Itertools;

use crate::builtins::code::CodeObject;
use crate::builtins::dict::PyDict;
use crate::error::{PyException, PyResult};
use crate::frame::Frame;
use crate::value::Value;
use crate::vm::Vm;

#[derive(Debug)]
pub struct PyFunction {
    pub code: Rc<CodeObject>,
    pub globals: Rc<RefCell<PyDict>>,
    pub name: String,
    /// Cells matching `code.freevars`, captured at definition time
    /// (spec §3 "Function"/"Cell").
    pub closure: Vec<Value>,
    pub defaults: Option<Rc<[Value]>>,
    pub kwdefaults: Option<Rc<RefCell<PyDict>>>,
    pub annotations: Option<Rc<RefCell<PyDict>>>,
}

/// Join missing-argument names the way CPython's `TypeError` messages
/// do: `'a'`, `'a' and 'b'`, `'a', 'b', and 'c'` (spec §4.F step 6,
/// "joined by ', ' and ' and '").
fn join_missing(mut names: Vec<&str>) -> String {
    let last = if names.len() > 1 { names.pop() } else { None };
    match last {
        None => names.iter().map(|n| format!("'{n}'")).join(", "),
        Some(last) => {
            let sep = if names.len() == 1 { " and " } else { ", and " };
            format!(
                "{}{}'{}'",
                names.iter().map(|n| format!("'{n}'")).join(", "),
                sep,
                last
            )
        }
    }
}

/// The argument binder, spec §4.F: maps `args`/`kwargs` plus `defaults`/
/// `kwdefaults` onto a frame's fast-locals array, in the exact order the
/// spec lays out (this ordering is observable through which exception
/// kind/message a caller sees first).
pub fn bind_arguments(
    func_name: &str,
    code: &CodeObject,
    args: &[Value],
    kwargs: Option<&PyDict>,
    defaults: Option<&[Value]>,
    kwdefaults: Option<&PyDict>,
) -> PyResult<Vec<Option<Value>>> {
    let argcount = code.argcount;
    let posonlyargcount = code.posonlyargcount;
    let kwonlyargcount = code.kwonlyargcount;
    let total_args = argcount + kwonlyargcount;

    let mut fastlocals: Vec<Option<Value>> = vec![None; code.nlocals];

    // 1. Copy min(len(args), argcount) positional values.
    let nargs = args.len();
    let n_copy = nargs.min(argcount);
    for (slot, value) in fastlocals.iter_mut().zip(args[..n_copy].iter()) {
        *slot = Some(value.clone());
    }

    // 2. Excess positional arguments: pack into *args, or defer the error.
    if let Some(idx) = code.vararg_index() {
        fastlocals[idx] = Some(Value::tuple(args[n_copy..].to_vec()));
    }

    // 3. Keyword arguments.
    let mut posonly_passed_as_kwarg = Vec::new();
    if let Some(kwargs) = kwargs {
        for (key, value) in kwargs.iter() {
            let Value::Str(name) = key else {
                return Err(PyException::TypeError(
                    "keywords must be strings".to_owned(),
                ));
            };
            let pos = code.varnames[posonlyargcount..total_args]
                .iter()
                .position(|v| &**v == &**name)
                .map(|p| p + posonlyargcount);
            if let Some(pos) = pos {
                if fastlocals[pos].is_some() {
                    return Err(PyException::TypeError(format!(
                        "{func_name}() got multiple values for argument '{name}'"
                    )));
                }
                fastlocals[pos] = Some(value.clone());
            } else if let Some(idx) = code.varkw_index() {
                match &mut fastlocals[idx] {
                    Some(Value::Dict(d)) => {
                        d.borrow_mut().insert(key.clone(), value.clone())?;
                    }
                    slot => {
                        let mut d = PyDict::new();
                        d.insert(key.clone(), value.clone())?;
                        *slot = Some(Value::Dict(Rc::new(RefCell::new(d))));
                    }
                }
            } else if code.varnames[..posonlyargcount].iter().any(|v| &**v == &**name) {
                posonly_passed_as_kwarg.push(name.to_string());
            } else {
                return Err(PyException::TypeError(format!(
                    "{func_name}() got an unexpected keyword argument '{name}'"
                )));
            }
        }
    }
    if !posonly_passed_as_kwarg.is_empty() {
        let names: Vec<&str> = posonly_passed_as_kwarg.iter().map(String::as_str).collect();
        return Err(PyException::TypeError(format!(
            "{func_name}() positional-only arguments passed by keyword: {}",
            names.join(", ")
        )));
    }

    // 4. Too-many-positional check.
    if nargs > argcount && code.vararg_index().is_none() {
        let n_defaults = defaults.map_or(0, |d| d.len());
        let n_required = argcount - n_defaults;
        let takes_text = if n_defaults > 0 {
            format!("from {n_required} to {argcount}")
        } else {
            argcount.to_string()
        };
        return Err(PyException::TypeError(format!(
            "{func_name}() takes {takes_text} positional argument{} but {nargs} {} given",
            if argcount == 1 { "" } else { "s" },
            if nargs == 1 { "was" } else { "were" },
        )));
    }

    // 5. Fill defaults.
    if let Some(defaults) = defaults {
        let n_required = argcount.saturating_sub(defaults.len());
        for (i, value) in defaults.iter().enumerate() {
            let pos = n_required + i;
            if pos < argcount && fastlocals[pos].is_none() {
                fastlocals[pos] = Some(value.clone());
            }
        }
    }
    if let Some(kwdefaults) = kwdefaults {
        for pos in argcount..total_args {
            if fastlocals[pos].is_none() {
                let name = Value::Str(code.varnames[pos].clone());
                if let Some(value) = kwdefaults.get(&name)? {
                    fastlocals[pos] = Some(value);
                }
            }
        }
    }

    // 6. Missing-argument check, positional and keyword-only grouped
    // separately.
    let missing_positional: Vec<&str> = (0..argcount)
        .filter(|&i| fastlocals[i].is_none())
        .map(|i| &*code.varnames[i])
        .collect();
    let missing_kwonly: Vec<&str> = (argcount..total_args)
        .filter(|&i| fastlocals[i].is_none())
        .map(|i| &*code.varnames[i])
        .collect();
    if !missing_positional.is_empty() || !missing_kwonly.is_empty() {
        let mut parts = Vec::new();
        if !missing_positional.is_empty() {
            parts.push(format!(
                "missing {} required positional argument{}: {}",
                missing_positional.len(),
                if missing_positional.len() == 1 { "" } else { "s" },
                join_missing(missing_positional),
            ));
        }
        if !missing_kwonly.is_empty() {
            parts.push(format!(
                "missing {} required keyword-only argument{}: {}",
                missing_kwonly.len(),
                if missing_kwonly.len() == 1 { "" } else { "s" },
                join_missing(missing_kwonly),
            ));
        }
        return Err(PyException::TypeError(format!(
            "{func_name}() {}",
            parts.join("; ")
        )));
    }

    Ok(fastlocals)
}

fn call(zelf: &Value, args: &[Value], kwargs: Option<&Value>, vm: &Vm) -> PyResult<Value> {
    let Value::Function(func) = zelf else {
        return Err(vm.new_type_error("expected function"));
    };
    let kwargs_dict = match kwargs {
        None => None,
        Some(Value::Dict(d)) => Some(d.clone()),
        Some(_) => return Err(vm.new_type_error("kwargs must be a dict")),
    };
    let kwargs_borrow = kwargs_dict.as_ref().map(|d| d.borrow());
    let kwdefaults_borrow = func.kwdefaults.as_ref().map(|d| d.borrow());
    let fastlocals = bind_arguments(
        &func.name,
        &func.code,
        args,
        kwargs_borrow.as_deref(),
        func.defaults.as_deref(),
        kwdefaults_borrow.as_deref(),
    )?;
    let frame = Frame::new(func.code.clone(), func.globals.clone(), &func.closure, fastlocals, vm)?;
    crate::frame::run(vm, &Rc::new(RefCell::new(frame)))
}

pub fn extend_slots(slots: &mut crate::types::PyTypeSlots) {
    slots.call = Some(call);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_missing_formats_and_clauses() {
        assert_eq!(join_missing(vec!["a"]), "'a'");
        assert_eq!(join_missing(vec!["a", "b"]), "'a' and 'b'");
        assert_eq!(join_missing(vec!["a", "b", "c"]), "'a', 'b', and 'c'");
    }
}
