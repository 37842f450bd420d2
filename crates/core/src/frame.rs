//! Frame & interpreter loop, spec §4.G: the stack machine that executes
//! a code object's bytecode. Each call builds a fresh `Frame`, the
//! argument binder (§4.F, `builtins::function::bind_arguments`) fills
//! its fast-locals, and [`run`] drives the fetch-decode-execute loop
//! until `RETURN_VALUE`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::builtins::code::{CodeFlags, CodeObject};
use crate::builtins::dict::{MergeMode, PyDict};
use crate::builtins::function::PyFunction;
use crate::bytecode::{make_function_flags, CompareArg, Opcode, CALL_FUNCTION_EX_HAS_KWARGS};
use crate::error::{PyException, PyResult};
use crate::ops::{self, BinOp};
use crate::types::CompareOp;
use crate::value::Value;
use crate::vm::Vm;

/// A per-call activation record, spec §3. `fastlocals`/`cellvars`/
/// `freevars`/`locals` realize the "frame locals duality" design note:
/// OPTIMIZED code uses only `fastlocals`; non-OPTIMIZED code (this
/// CORE's stand-in for module-level execution) uses only `locals`,
/// which for a top-level frame is the same dict object as `globals`
/// (matching CPython's module frame).
#[derive(Debug)]
pub struct Frame {
    pub code: Rc<CodeObject>,
    pub globals: Rc<RefCell<PyDict>>,
    pub builtins: Rc<RefCell<PyDict>>,
    /// Back-pointer to the calling frame, spec §3 "the calling frame
    /// (linked stack)". Captured at construction time, i.e. before this
    /// frame is pushed as `Vm`'s current frame.
    pub parent: Option<Rc<RefCell<Frame>>>,
    pub fastlocals: Vec<Option<Value>>,
    pub cellvars: Vec<Value>,
    pub freevars: Vec<Value>,
    pub locals: Option<Rc<RefCell<PyDict>>>,
}

/// Spec §4.G "Builtins inference": inherit the calling frame's builtins
/// if it shares the same `globals`; otherwise resolve `__builtins__`
/// from `globals` (module → its dict, dict → itself, anything else →
/// TypeError); if absent, a minimal dict with at least `None`.
fn infer_builtins(
    globals: &Rc<RefCell<PyDict>>,
    caller: Option<&Rc<RefCell<Frame>>>,
) -> PyResult<Rc<RefCell<PyDict>>> {
    if let Some(caller) = caller {
        let caller = caller.borrow();
        if Rc::ptr_eq(&caller.globals, globals) {
            return Ok(caller.builtins.clone());
        }
    }
    let found = globals.borrow().get(&Value::str("__builtins__"))?;
    match found {
        Some(Value::Module(m)) => Ok(m.borrow().dict.clone()),
        Some(Value::Dict(d)) => Ok(d),
        Some(other) => Err(PyException::TypeError(format!(
            "__builtins__ must be a module or a dict, not '{}'",
            other.type_name()
        ))),
        None => {
            let mut minimal = PyDict::new();
            minimal.insert_str("None", Value::None);
            Ok(Rc::new(RefCell::new(minimal)))
        }
    }
}

impl Frame {
    /// Spec §4.F's final paragraph: cells for parameters captured by
    /// nested scopes are created here and the matching fast-local is
    /// moved into the cell and nulled; remaining `cellvars` are
    /// allocated empty. `closure` supplies `freevars` (one cell per
    /// entry, shared with the defining scope — spec's "closure sharing"
    /// invariant).
    pub fn new(
        code: Rc<CodeObject>,
        globals: Rc<RefCell<PyDict>>,
        closure: &[Value],
        mut fastlocals: Vec<Option<Value>>,
        vm: &Vm,
    ) -> PyResult<Self> {
        let caller = vm.current_frame();
        let builtins = infer_builtins(&globals, caller.as_ref())?;

        let mut cellvars: Vec<Value> = (0..code.cellvars.len())
            .map(|_| Value::new_cell(None))
            .collect();
        if let Some(map) = &code.cell2arg {
            for (cell_idx, varname_idx) in map.iter().enumerate() {
                if let Some(varname_idx) = varname_idx {
                    if let Value::Cell(c) = &cellvars[cell_idx] {
                        *c.borrow_mut() = fastlocals[*varname_idx].take();
                    }
                }
            }
        }
        let freevars = closure.to_vec();

        let locals = if code.flags.contains(CodeFlags::OPTIMIZED) {
            None
        } else {
            Some(globals.clone())
        };

        Ok(Self {
            code,
            globals,
            builtins,
            parent: caller,
            fastlocals,
            cellvars,
            freevars,
            locals,
        })
    }
}

/// Entry point: push `frame` as the current frame (enforcing the
/// recursion limit, SPEC_FULL §7/§8 scenario 9), run its bytecode to
/// `RETURN_VALUE`, pop it on any exit path.
pub fn run(vm: &Vm, frame: &Rc<RefCell<Frame>>) -> PyResult<Value> {
    vm.with_frame(frame.clone(), |frame| execute(vm, frame))
}

fn pop_n(stack: &mut Vec<Value>, n: usize) -> Vec<Value> {
    let at = stack.len() - n;
    stack.split_off(at)
}

/// Materialize any sequence-shaped value into a `Vec<Value>`, used by
/// `UNPACK_SEQUENCE` and the `*_UNPACK` build opcodes.
fn iter_values(vm: &Vm, v: &Value) -> PyResult<Vec<Value>> {
    match v {
        Value::Tuple(items) => Ok(items.to_vec()),
        Value::List(items) => Ok(items.borrow().clone()),
        other => {
            let n = ops::size(vm, other)?;
            let mut out = Vec::with_capacity(n);
            for i in 0..n {
                out.push(ops::get_item(vm, other, &Value::int(i as i64))?);
            }
            Ok(out)
        }
    }
}

/// `in`/`not in`, spec §4.G's `COMPARE_OP` note marks containment "out
/// of scope here unless required"; implemented anyway since it costs
/// little and several realistic fixtures want it.
fn contains(vm: &Vm, container: &Value, item: &Value) -> PyResult<bool> {
    match container {
        Value::Str(s) => match item {
            Value::Str(sub) => Ok(s.contains(&**sub)),
            _ => Err(vm.new_type_error("'in <string>' requires string as left operand")),
        },
        Value::Dict(d) => d.borrow().contains_key(item),
        Value::Tuple(_) | Value::List(_) => {
            for candidate in iter_values(vm, container)? {
                if ops::equal(vm, &candidate, item)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        other => Err(PyException::TypeError(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

/// No `invert`/`pos` slot exists in this CORE's slot table (spec §4.B
/// enumerates unary `neg`/`abs`/`int`/`index`/`repr`/`str`/`hash`/`bool`
/// only), even though `UNARY_INVERT`/`UNARY_POSITIVE` are in §4.G's
/// opcode list. Documented simplification (DESIGN.md): both operate
/// directly on `int`/`bool` without going through the slot system.
fn unary_invert(v: &Value, vm: &Vm) -> PyResult<Value> {
    crate::builtins::int::as_bigint(v)
        .map(|i| Value::Int(-(i) - 1))
        .ok_or_else(|| vm.new_type_error(format!("bad operand type for unary ~: '{}'", v.type_name())))
}

fn unary_positive(v: &Value, vm: &Vm) -> PyResult<Value> {
    match v {
        Value::Int(_) | Value::Float(_) => Ok(v.clone()),
        Value::Bool(b) => Ok(Value::int(*b as i64)),
        other => Err(vm.new_type_error(format!("bad operand type for unary +: '{}'", other.type_name()))),
    }
}

fn deref_name<'a>(code: &'a CodeObject, idx: usize) -> &'a str {
    if idx < code.cellvars.len() {
        &code.cellvars[idx]
    } else {
        &code.freevars[idx - code.cellvars.len()]
    }
}

fn deref_cell<'a>(cellvars: &'a [Value], freevars: &'a [Value], idx: usize) -> &'a Value {
    if idx < cellvars.len() {
        &cellvars[idx]
    } else {
        &freevars[idx - cellvars.len()]
    }
}

fn load_deref(
    code: &CodeObject,
    cellvars: &[Value],
    freevars: &[Value],
    idx: usize,
    vm: &Vm,
) -> PyResult<Value> {
    let is_cellvar = idx < cellvars.len();
    let cell = deref_cell(cellvars, freevars, idx);
    let name = deref_name(code, idx);
    let Value::Cell(c) = cell else {
        return Err(vm.new_type_error("expected cell"));
    };
    c.borrow().clone().ok_or_else(|| {
        if is_cellvar {
            PyException::UnboundLocalError(format!(
                "local variable '{name}' referenced before assignment"
            ))
        } else {
            PyException::NameError(format!(
                "free variable '{name}' referenced before assignment in enclosing scope"
            ))
        }
    })
}

/// The fetch-decode-execute loop proper. State that lives in `Frame`
/// (fastlocals) is pulled out into a local for the duration of the loop
/// so that no `RefCell` borrow of *this* frame is held while dispatching
/// a nested call — a nested call always operates on a different
/// `Rc<RefCell<Frame>>`, so this is purely a clarity choice, not a
/// soundness requirement.
fn execute(vm: &Vm, frame: &Rc<RefCell<Frame>>) -> PyResult<Value> {
    let (code, globals, builtins, cellvars, freevars, locals) = {
        let f = frame.borrow();
        (
            f.code.clone(),
            f.globals.clone(),
            f.builtins.clone(),
            f.cellvars.clone(),
            f.freevars.clone(),
            f.locals.clone(),
        )
    };
    let mut fastlocals = std::mem::take(&mut frame.borrow_mut().fastlocals);

    let bytecode = &code.bytecode;
    let mut valuestack: Vec<Value> = Vec::with_capacity(code.stacksize);
    let mut ip: usize = 0;
    let mut extended_oparg: u32 = 0;

    loop {
        if ip + 1 >= bytecode.len() {
            return Err(PyException::Internal(
                "instruction pointer ran past the end of bytecode".to_owned(),
            ));
        }
        let opcode_byte = bytecode[ip];
        let oparg_byte = bytecode[ip + 1];
        ip += 2;
        let opcode = Opcode::try_from(opcode_byte)
            .map_err(|b| PyException::Internal(format!("unknown opcode {b}")))?;
        let oparg = (extended_oparg << 8) | oparg_byte as u32;
        extended_oparg = 0;

        match opcode {
            Opcode::ExtendedArg => {
                extended_oparg = oparg;
            }

            Opcode::PopTop => {
                valuestack.pop();
            }
            Opcode::RotTwo => {
                let b = valuestack.pop().unwrap();
                let a = valuestack.pop().unwrap();
                valuestack.push(b);
                valuestack.push(a);
            }
            Opcode::RotThree => {
                let c = valuestack.pop().unwrap();
                let b = valuestack.pop().unwrap();
                let a = valuestack.pop().unwrap();
                valuestack.push(c);
                valuestack.push(a);
                valuestack.push(b);
            }
            Opcode::DupTop => {
                let top = valuestack.last().unwrap().clone();
                valuestack.push(top);
            }

            Opcode::UnaryNegative => {
                let v = valuestack.pop().unwrap();
                let ty = vm.types.type_of(&v);
                let result = match ty.slots.as_number.neg {
                    Some(f) => f(&v, vm)?,
                    None => return Err(vm.new_type_error(format!("bad operand type for unary -: '{}'", v.type_name()))),
                };
                valuestack.push(result);
            }
            Opcode::UnaryPositive => {
                let v = valuestack.pop().unwrap();
                valuestack.push(unary_positive(&v, vm)?);
            }
            Opcode::UnaryNot => {
                let v = valuestack.pop().unwrap();
                valuestack.push(Value::Bool(!ops::is_true(vm, &v)?));
            }
            Opcode::UnaryInvert => {
                let v = valuestack.pop().unwrap();
                valuestack.push(unary_invert(&v, vm)?);
            }

            Opcode::BinaryAdd
            | Opcode::BinarySubtract
            | Opcode::BinaryMultiply
            | Opcode::BinaryAnd
            | Opcode::BinaryOr
            | Opcode::BinaryXor => {
                let b = valuestack.pop().unwrap();
                let a = valuestack.pop().unwrap();
                let op = match opcode {
                    Opcode::BinaryAdd => BinOp::Add,
                    Opcode::BinarySubtract => BinOp::Sub,
                    Opcode::BinaryMultiply => BinOp::Mul,
                    Opcode::BinaryAnd => BinOp::And,
                    Opcode::BinaryOr => BinOp::Or,
                    Opcode::BinaryXor => BinOp::Xor,
                    _ => unreachable!(),
                };
                valuestack.push(ops::binary_op(vm, op, &a, &b)?);
            }
            Opcode::BinaryTrueDivide => {
                let b = valuestack.pop().unwrap();
                let a = valuestack.pop().unwrap();
                valuestack.push(ops::true_divide(vm, &a, &b)?);
            }
            Opcode::BinaryFloorDivide => {
                let b = valuestack.pop().unwrap();
                let a = valuestack.pop().unwrap();
                valuestack.push(ops::floor_divide(vm, &a, &b)?);
            }
            Opcode::BinaryModulo => {
                let b = valuestack.pop().unwrap();
                let a = valuestack.pop().unwrap();
                valuestack.push(ops::modulo(vm, &a, &b)?);
            }
            Opcode::BinarySubscr => {
                let key = valuestack.pop().unwrap();
                let container = valuestack.pop().unwrap();
                valuestack.push(ops::get_item(vm, &container, &key)?);
            }

            Opcode::InplaceAdd
            | Opcode::InplaceSubtract
            | Opcode::InplaceMultiply
            | Opcode::InplaceAnd
            | Opcode::InplaceOr
            | Opcode::InplaceXor => {
                let b = valuestack.pop().unwrap();
                let a = valuestack.pop().unwrap();
                let op = match opcode {
                    Opcode::InplaceAdd => BinOp::Add,
                    Opcode::InplaceSubtract => BinOp::Sub,
                    Opcode::InplaceMultiply => BinOp::Mul,
                    Opcode::InplaceAnd => BinOp::And,
                    Opcode::InplaceOr => BinOp::Or,
                    Opcode::InplaceXor => BinOp::Xor,
                    _ => unreachable!(),
                };
                valuestack.push(ops::inplace_binary_op(vm, op, &a, &b)?);
            }

            Opcode::StoreSubscr => {
                let key = valuestack.pop().unwrap();
                let container = valuestack.pop().unwrap();
                let value = valuestack.pop().unwrap();
                ops::set_item(vm, &container, &key, value)?;
            }

            Opcode::StoreName => {
                let value = valuestack.pop().unwrap();
                let name = code.names[oparg as usize].clone();
                match &locals {
                    Some(d) => d.borrow_mut().insert(Value::Str(name), value)?,
                    None => {
                        return Err(PyException::SystemError(format!(
                            "no locals found when storing '{name}'"
                        )))
                    }
                }
            }
            Opcode::DeleteName => {
                let name = code.names[oparg as usize].clone();
                match &locals {
                    Some(d) => {
                        if d.borrow_mut().remove(&Value::Str(name.clone()))?.is_none() {
                            return Err(PyException::NameError(format!("name '{name}' is not defined")));
                        }
                    }
                    None => {
                        return Err(PyException::SystemError(format!(
                            "no locals found when deleting '{name}'"
                        )))
                    }
                }
            }
            Opcode::StoreGlobal => {
                let value = valuestack.pop().unwrap();
                let name = code.names[oparg as usize].clone();
                globals.borrow_mut().insert(Value::Str(name), value)?;
            }
            Opcode::DeleteGlobal => {
                let name = code.names[oparg as usize].clone();
                if globals.borrow_mut().remove(&Value::Str(name.clone()))?.is_none() {
                    return Err(PyException::NameError(format!("name '{name}' is not defined")));
                }
            }
            Opcode::StoreFast => {
                let value = valuestack.pop().unwrap();
                fastlocals[oparg as usize] = Some(value);
            }
            Opcode::DeleteFast => {
                if fastlocals[oparg as usize].take().is_none() {
                    let name = &code.varnames[oparg as usize];
                    return Err(PyException::UnboundLocalError(format!(
                        "local variable '{name}' referenced before assignment"
                    )));
                }
            }
            Opcode::StoreDeref => {
                let value = valuestack.pop().unwrap();
                let cell = deref_cell(&cellvars, &freevars, oparg as usize);
                crate::builtins::cell::write(cell, value, vm)?;
            }
            Opcode::DeleteDeref => {
                let cell = deref_cell(&cellvars, &freevars, oparg as usize);
                crate::builtins::cell::clear(cell, vm)?;
            }

            Opcode::LoadConst => {
                valuestack.push(code.consts[oparg as usize].clone());
            }
            Opcode::LoadFast => {
                let value = fastlocals[oparg as usize].clone().ok_or_else(|| {
                    let name = &code.varnames[oparg as usize];
                    PyException::UnboundLocalError(format!(
                        "local variable '{name}' referenced before assignment"
                    ))
                })?;
                valuestack.push(value);
            }
            Opcode::LoadName => {
                let name = &code.names[oparg as usize];
                let found = match &locals {
                    Some(d) => d.borrow().get(&Value::str(name.as_ref()))?,
                    None => None,
                };
                let found = match found {
                    Some(v) => Some(v),
                    None => globals.borrow().get(&Value::str(name.as_ref()))?,
                };
                let found = match found {
                    Some(v) => Some(v),
                    None => builtins.borrow().get(&Value::str(name.as_ref()))?,
                };
                valuestack.push(
                    found.ok_or_else(|| PyException::NameError(format!("name '{name}' is not defined")))?,
                );
            }
            Opcode::LoadGlobal => {
                let name = &code.names[oparg as usize];
                let found = globals.borrow().get(&Value::str(name.as_ref()))?;
                let found = match found {
                    Some(v) => Some(v),
                    None => builtins.borrow().get(&Value::str(name.as_ref()))?,
                };
                valuestack.push(
                    found.ok_or_else(|| PyException::NameError(format!("name '{name}' is not defined")))?,
                );
            }
            Opcode::LoadDeref => {
                valuestack.push(load_deref(&code, &cellvars, &freevars, oparg as usize, vm)?);
            }
            Opcode::LoadClassderef => {
                let idx = oparg as usize;
                let name = deref_name(&code, idx);
                let from_locals = match &locals {
                    Some(d) => d.borrow().get(&Value::str(name))?,
                    None => None,
                };
                let value = match from_locals {
                    Some(v) => v,
                    None => load_deref(&code, &cellvars, &freevars, idx, vm)?,
                };
                valuestack.push(value);
            }
            Opcode::LoadClosure => {
                valuestack.push(deref_cell(&cellvars, &freevars, oparg as usize).clone());
            }

            Opcode::LoadAttr => {
                let obj = valuestack.pop().unwrap();
                let name = &code.names[oparg as usize];
                valuestack.push(ops::get_attr(vm, &obj, name)?);
            }
            Opcode::StoreAttr => {
                let obj = valuestack.pop().unwrap();
                let value = valuestack.pop().unwrap();
                let name = &code.names[oparg as usize];
                ops::set_attr(vm, &obj, name, value)?;
            }
            Opcode::DeleteAttr => {
                let obj = valuestack.pop().unwrap();
                let name = &code.names[oparg as usize];
                ops::del_attr(vm, &obj, name)?;
            }

            Opcode::CompareOp => {
                let w = valuestack.pop().unwrap();
                let v = valuestack.pop().unwrap();
                let arg = CompareArg::try_from(oparg as u8)
                    .map_err(|b| PyException::Internal(format!("unknown compare op {b}")))?;
                let result = match arg {
                    CompareArg::Is => Value::Bool(v.is_identical(&w)),
                    CompareArg::IsNot => Value::Bool(!v.is_identical(&w)),
                    CompareArg::In => Value::Bool(contains(vm, &w, &v)?),
                    CompareArg::NotIn => Value::Bool(!contains(vm, &w, &v)?),
                    CompareArg::ExcMatch => {
                        return Err(PyException::Internal(
                            "exception matching is out of scope".to_owned(),
                        ))
                    }
                    other => {
                        let op: Option<CompareOp> = other.into();
                        ops::rich_compare(vm, &v, &w, op.expect("Lt..Ge always map"))?
                    }
                };
                valuestack.push(result);
            }

            Opcode::JumpForward => {
                ip += oparg as usize;
            }
            Opcode::JumpAbsolute => {
                ip = oparg as usize;
            }
            Opcode::PopJumpIfFalse => {
                let v = valuestack.pop().unwrap();
                if !ops::is_true(vm, &v)? {
                    ip = oparg as usize;
                }
            }
            Opcode::PopJumpIfTrue => {
                let v = valuestack.pop().unwrap();
                if ops::is_true(vm, &v)? {
                    ip = oparg as usize;
                }
            }
            Opcode::JumpIfFalseOrPop => {
                let v = valuestack.last().unwrap().clone();
                if !ops::is_true(vm, &v)? {
                    ip = oparg as usize;
                } else {
                    valuestack.pop();
                }
            }
            Opcode::JumpIfTrueOrPop => {
                let v = valuestack.last().unwrap().clone();
                if ops::is_true(vm, &v)? {
                    ip = oparg as usize;
                } else {
                    valuestack.pop();
                }
            }

            Opcode::ReturnValue => {
                return Ok(valuestack.pop().unwrap());
            }

            Opcode::UnpackSequence => {
                let seq = valuestack.pop().unwrap();
                let items = iter_values(vm, &seq)?;
                let n = oparg as usize;
                if items.len() != n {
                    return Err(PyException::ValueError(if items.len() < n {
                        format!("not enough values to unpack (expected {n}, got {})", items.len())
                    } else {
                        format!("too many values to unpack (expected {n})")
                    }));
                }
                for item in items.into_iter().rev() {
                    valuestack.push(item);
                }
            }

            Opcode::BuildTuple => {
                let n = oparg as usize;
                valuestack.push(Value::tuple(pop_n(&mut valuestack, n)));
            }
            Opcode::BuildList => {
                let n = oparg as usize;
                valuestack.push(Value::list(pop_n(&mut valuestack, n)));
            }
            Opcode::BuildSet => {
                let n = oparg as usize;
                let items = pop_n(&mut valuestack, n);
                let mut deduped: Vec<Value> = Vec::with_capacity(items.len());
                for item in items {
                    let mut seen = false;
                    for existing in &deduped {
                        if ops::equal(vm, existing, &item)? {
                            seen = true;
                            break;
                        }
                    }
                    if !seen {
                        deduped.push(item);
                    }
                }
                // No dedicated `set` value variant in this CORE's scope
                // (DESIGN.md); a deduplicated list stands in for it.
                valuestack.push(Value::list(deduped));
            }
            Opcode::BuildMap => {
                let n = oparg as usize;
                let items = pop_n(&mut valuestack, 2 * n);
                let mut dict = PyDict::new();
                for pair in items.chunks(2) {
                    dict.insert(pair[0].clone(), pair[1].clone())?;
                }
                valuestack.push(Value::Dict(Rc::new(RefCell::new(dict))));
            }
            Opcode::BuildConstKeyMap => {
                let n = oparg as usize;
                let keys_tuple = valuestack.pop().unwrap();
                let Value::Tuple(keys) = keys_tuple else {
                    return Err(PyException::Internal(
                        "BUILD_CONST_KEY_MAP expects a tuple of keys".to_owned(),
                    ));
                };
                let values = pop_n(&mut valuestack, n);
                let mut dict = PyDict::new();
                for (key, value) in keys.iter().zip(values.into_iter()) {
                    dict.insert(key.clone(), value)?;
                }
                valuestack.push(Value::Dict(Rc::new(RefCell::new(dict))));
            }
            Opcode::BuildTupleUnpack | Opcode::BuildTupleUnpackWithCall => {
                let n = oparg as usize;
                let parts = pop_n(&mut valuestack, n);
                let mut flattened = Vec::new();
                for part in &parts {
                    flattened.extend(iter_values(vm, part)?);
                }
                valuestack.push(Value::tuple(flattened));
            }
            Opcode::BuildListUnpack => {
                let n = oparg as usize;
                let parts = pop_n(&mut valuestack, n);
                let mut flattened = Vec::new();
                for part in &parts {
                    flattened.extend(iter_values(vm, part)?);
                }
                valuestack.push(Value::list(flattened));
            }
            Opcode::BuildMapUnpackWithCall => {
                let n = oparg as usize;
                let parts = pop_n(&mut valuestack, n);
                let mut dict = PyDict::new();
                for part in &parts {
                    let Value::Dict(d) = part else {
                        return Err(PyException::Internal(
                            "BUILD_MAP_UNPACK_WITH_CALL expects dict operands".to_owned(),
                        ));
                    };
                    dict.merge(&d.borrow(), MergeMode::Unique)?;
                }
                valuestack.push(Value::Dict(Rc::new(RefCell::new(dict))));
            }

            Opcode::CallFunction => {
                let n = oparg as usize;
                let args = pop_n(&mut valuestack, n);
                let callable = valuestack.pop().unwrap();
                valuestack.push(ops::call(vm, &callable, &args, None)?);
            }
            Opcode::CallFunctionKw => {
                let kwnames = valuestack.pop().unwrap();
                let Value::Tuple(kwnames) = kwnames else {
                    return Err(PyException::Internal(
                        "CALL_FUNCTION_KW expects a tuple of keyword names".to_owned(),
                    ));
                };
                let total = oparg as usize;
                let n_kw = kwnames.len();
                let all_args = pop_n(&mut valuestack, total);
                let (positional, kwvalues) = all_args.split_at(total - n_kw);
                let mut kwargs = PyDict::new();
                for (name, value) in kwnames.iter().zip(kwvalues.iter()) {
                    kwargs.insert(name.clone(), value.clone())?;
                }
                let callable = valuestack.pop().unwrap();
                let kwargs_value = Value::Dict(Rc::new(RefCell::new(kwargs)));
                valuestack.push(ops::call(vm, &callable, positional, Some(&kwargs_value))?);
            }
            Opcode::CallFunctionEx => {
                let kwargs = if oparg as u8 & CALL_FUNCTION_EX_HAS_KWARGS != 0 {
                    Some(valuestack.pop().unwrap())
                } else {
                    None
                };
                let args_val = valuestack.pop().unwrap();
                let callable = valuestack.pop().unwrap();
                let args = iter_values(vm, &args_val)?;
                valuestack.push(ops::call(vm, &callable, &args, kwargs.as_ref())?);
            }

            Opcode::MakeFunction => {
                let qualname = valuestack.pop().unwrap();
                let Value::Str(name) = qualname else {
                    return Err(PyException::Internal("MAKE_FUNCTION expects a str qualname".to_owned()));
                };
                let code_val = valuestack.pop().unwrap();
                let Value::Code(func_code) = code_val else {
                    return Err(PyException::Internal("MAKE_FUNCTION expects a code object".to_owned()));
                };
                let bits = oparg as u8;
                let defaults = if bits & make_function_flags::DEFAULTS != 0 {
                    match valuestack.pop().unwrap() {
                        Value::Tuple(items) => Some(items),
                        _ => return Err(PyException::Internal("MAKE_FUNCTION defaults must be a tuple".to_owned())),
                    }
                } else {
                    None
                };
                let kwdefaults = if bits & make_function_flags::KWDEFAULTS != 0 {
                    match valuestack.pop().unwrap() {
                        Value::Dict(d) => Some(d),
                        _ => return Err(PyException::Internal("MAKE_FUNCTION kwdefaults must be a dict".to_owned())),
                    }
                } else {
                    None
                };
                let annotations = if bits & make_function_flags::ANNOTATIONS != 0 {
                    match valuestack.pop().unwrap() {
                        Value::Dict(d) => Some(d),
                        _ => return Err(PyException::Internal("MAKE_FUNCTION annotations must be a dict".to_owned())),
                    }
                } else {
                    None
                };
                let closure = if bits & make_function_flags::CLOSURE != 0 {
                    match valuestack.pop().unwrap() {
                        Value::Tuple(items) => items.to_vec(),
                        _ => return Err(PyException::Internal("MAKE_FUNCTION closure must be a tuple".to_owned())),
                    }
                } else {
                    Vec::new()
                };
                let func = PyFunction {
                    code: func_code,
                    globals: globals.clone(),
                    name: name.to_string(),
                    closure,
                    defaults,
                    kwdefaults,
                    annotations,
                };
                valuestack.push(Value::Function(Rc::new(func)));
            }
        }
    }
}
