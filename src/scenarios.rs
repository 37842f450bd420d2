//! Hand-assembled demo code objects, standing in for the bytecode
//! compiler this CORE excludes (spec §1): each `build_*` function wires
//! together a [`CodeObject`] with [`CodeBuilder`] the way a compiler's
//! back end would, and [`run`] drives it through a top-level module
//! frame the way `exec(code, globals)` does in CPython.

use std::cell::RefCell;
use std::rc::Rc;

use picovm_core::builtins::code::{CodeBuilder, CodeFlags};
use picovm_core::builtins::dict::PyDict;
use picovm_core::bytecode::{emit, emit_extended, Opcode};
use picovm_core::frame::Frame;
use picovm_core::{PyResult, Value, Vm};

fn module_globals(vm: &Vm) -> Rc<RefCell<PyDict>> {
    let mut dict = PyDict::new();
    dict.insert_str("__builtins__", Value::Dict(vm.builtins.clone()));
    Rc::new(RefCell::new(dict))
}

/// Run a module-level code object to completion and hand back its
/// globals dict, the way a driver inspects `exec`'d names afterwards.
fn run_module(vm: &Vm, code: Rc<picovm_core::builtins::code::CodeObject>) -> PyResult<Rc<RefCell<PyDict>>> {
    let globals = module_globals(vm);
    let frame = Frame::new(code, globals.clone(), &[], Vec::new(), vm)?;
    picovm_core::frame::run(vm, &Rc::new(RefCell::new(frame)))?;
    Ok(globals)
}

fn flatten(chunks: &[&[u8]]) -> Vec<u8> {
    chunks.iter().flat_map(|c| c.iter().copied()).collect()
}

/// Scenario 1: `f(x, y) = (x*x - 2) * (x + y)`, called as `f(3, 3)` and
/// `f(6, 7)`. Exercises `MAKE_FUNCTION`, `CALL_FUNCTION`, `LOAD_FAST`,
/// and the arithmetic binary ops.
pub fn int_compute(vm: &Vm) -> PyResult<(Value, Value)> {
    let f_body = flatten(&[
        &emit(Opcode::LoadFast, 0),
        &emit(Opcode::LoadFast, 0),
        &emit(Opcode::BinaryMultiply, 0),
        &emit(Opcode::LoadConst, 0),
        &emit(Opcode::BinarySubtract, 0),
        &emit(Opcode::LoadFast, 0),
        &emit(Opcode::LoadFast, 1),
        &emit(Opcode::BinaryAdd, 0),
        &emit(Opcode::BinaryMultiply, 0),
        &emit(Opcode::ReturnValue, 0),
    ]);
    let f_code = CodeBuilder::new("f")
        .argcount(2)
        .nlocals(2)
        .flags(CodeFlags::OPTIMIZED | CodeFlags::NEWLOCALS)
        .varnames(vec!["x", "y"])
        .consts(vec![Value::int(2)])
        .bytecode(f_body)
        .build()?;

    let module_body = flatten(&[
        &emit(Opcode::LoadConst, 0),
        &emit(Opcode::LoadConst, 1),
        &emit(Opcode::MakeFunction, 0),
        &emit(Opcode::StoreName, 0),
        &emit(Opcode::LoadName, 0),
        &emit(Opcode::LoadConst, 2),
        &emit(Opcode::LoadConst, 2),
        &emit(Opcode::CallFunction, 2),
        &emit(Opcode::StoreName, 1),
        &emit(Opcode::LoadName, 0),
        &emit(Opcode::LoadConst, 3),
        &emit(Opcode::LoadConst, 4),
        &emit(Opcode::CallFunction, 2),
        &emit(Opcode::StoreName, 2),
        &emit(Opcode::LoadConst, 5),
        &emit(Opcode::ReturnValue, 0),
    ]);
    let module_code = CodeBuilder::new("<module>")
        .flags(CodeFlags::empty())
        .consts(vec![
            Value::Code(f_code),
            Value::str("f"),
            Value::int(3),
            Value::int(6),
            Value::int(7),
            Value::None,
        ])
        .names(vec!["f", "result1", "result2"])
        .bytecode(module_body)
        .build()?;

    let globals = run_module(vm, module_code)?;
    let g = globals.borrow();
    let result1 = g.get(&Value::str("result1"))?.expect("result1 bound");
    let result2 = g.get(&Value::str("result2"))?.expect("result2 bound");
    Ok((result1, result2))
}

/// Scenario 7: `x = 1; x += 1` at module scope. `INPLACE_ADD` on an
/// `int` has no `inplace_add` slot, so it falls back to `BINARY_ADD`
/// semantics (spec §4.G "in-place operators").
pub fn inplace_fallback(vm: &Vm) -> PyResult<Value> {
    let body = flatten(&[
        &emit(Opcode::LoadConst, 0),
        &emit(Opcode::StoreName, 0),
        &emit(Opcode::LoadName, 0),
        &emit(Opcode::LoadConst, 0),
        &emit(Opcode::InplaceAdd, 0),
        &emit(Opcode::StoreName, 0),
        &emit(Opcode::LoadName, 0),
        &emit(Opcode::ReturnValue, 0),
    ]);
    let code = CodeBuilder::new("<module>")
        .flags(CodeFlags::empty())
        .consts(vec![Value::int(1)])
        .names(vec!["x"])
        .bytecode(body)
        .build()?;
    let globals = module_globals(vm);
    let frame = Frame::new(code, globals, &[], Vec::new(), vm)?;
    picovm_core::frame::run(vm, &Rc::new(RefCell::new(frame)))
}

/// Scenario 8: a `LOAD_CONST` whose oparg is 300, requiring one
/// `EXTENDED_ARG` prefix to reach past the single byte's 0..255 range.
pub fn extended_oparg(vm: &Vm) -> PyResult<Value> {
    let mut consts: Vec<Value> = (0..300).map(Value::int).collect();
    consts.push(Value::int(42));
    let mut body = emit_extended(Opcode::LoadConst, 300);
    body.extend_from_slice(&emit(Opcode::ReturnValue, 0));
    let code = CodeBuilder::new("<module>")
        .flags(CodeFlags::empty())
        .consts(consts)
        .bytecode(body)
        .build()?;
    let globals = module_globals(vm);
    let frame = Frame::new(code, globals, &[], Vec::new(), vm)?;
    picovm_core::frame::run(vm, &Rc::new(RefCell::new(frame)))
}

/// Scenario 9: a function with no base case recurses until the
/// interpreter's recursion limit (not the host stack) raises
/// `RecursionError`.
pub fn recursion_limit(vm: &Vm) -> PyResult<Value> {
    let boom_body = flatten(&[
        &emit(Opcode::LoadGlobal, 0),
        &emit(Opcode::CallFunction, 0),
        &emit(Opcode::ReturnValue, 0),
    ]);
    let boom_code = CodeBuilder::new("boom")
        .flags(CodeFlags::OPTIMIZED | CodeFlags::NEWLOCALS)
        .names(vec!["boom"])
        .bytecode(boom_body)
        .build()?;

    let module_body = flatten(&[
        &emit(Opcode::LoadConst, 0),
        &emit(Opcode::LoadConst, 1),
        &emit(Opcode::MakeFunction, 0),
        &emit(Opcode::StoreName, 0),
        &emit(Opcode::LoadName, 0),
        &emit(Opcode::CallFunction, 0),
        &emit(Opcode::ReturnValue, 0),
    ]);
    let module_code = CodeBuilder::new("<module>")
        .flags(CodeFlags::empty())
        .consts(vec![Value::Code(boom_code), Value::str("boom")])
        .names(vec!["boom"])
        .bytecode(module_body)
        .build()?;
    let globals = module_globals(vm);
    let frame = Frame::new(module_code, globals, &[], Vec::new(), vm)?;
    picovm_core::frame::run(vm, &Rc::new(RefCell::new(frame)))
}
