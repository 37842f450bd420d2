//! End-to-end scenarios exercised through the public surface: the
//! frame interpreter for anything opcode-shaped, the argument binder
//! and abstract operations directly for anything that doesn't need a
//! full bytecode program to demonstrate. Code objects are hand
//! assembled with `CodeBuilder`, the way the compiler-less driver in
//! `src/scenarios.rs` does.

use std::cell::RefCell;
use std::rc::Rc;

use picovm_core::builtins::code::{CodeBuilder, CodeFlags};
use picovm_core::builtins::dict::PyDict;
use picovm_core::builtins::function::bind_arguments;
use picovm_core::bytecode::{emit, emit_extended, Opcode};
use picovm_core::error::PyException;
use picovm_core::frame::{run, Frame};
use picovm_core::ops;
use picovm_core::{Value, Vm};

fn flatten(chunks: &[&[u8]]) -> Vec<u8> {
    chunks.iter().flat_map(|c| c.iter().copied()).collect()
}

fn module_globals(vm: &Vm) -> Rc<RefCell<PyDict>> {
    let mut dict = PyDict::new();
    dict.insert_str("__builtins__", Value::Dict(vm.builtins.clone()));
    Rc::new(RefCell::new(dict))
}

fn run_module(vm: &Vm, code: Rc<picovm_core::builtins::code::CodeObject>) -> picovm_core::PyResult<Rc<RefCell<PyDict>>> {
    let globals = module_globals(vm);
    let frame = Frame::new(code, globals.clone(), &[], Vec::new(), vm)?;
    run(vm, &Rc::new(RefCell::new(frame)))?;
    Ok(globals)
}

fn as_i64(v: &Value) -> i64 {
    match v {
        Value::Int(n) => num_traits::ToPrimitive::to_i64(n).unwrap(),
        other => panic!("expected int, got {other:?}"),
    }
}

/// Scenario: `f(x, y) = (x*x - 2) * (x + y)`; `f(3, 3) == 42`,
/// `f(6, 7) == 442`.
#[test]
fn simple_integer_computation() {
    let vm = Vm::new();

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
        .build()
        .unwrap();

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
        .build()
        .unwrap();

    let globals = run_module(&vm, module_code).unwrap();
    let g = globals.borrow();
    assert_eq!(as_i64(&g.get(&Value::str("result1")).unwrap().unwrap()), 42);
    assert_eq!(as_i64(&g.get(&Value::str("result2")).unwrap().unwrap()), 442);
}

/// Scenario: a two-level closure. `make_adder(x)` returns `adder(y)`
/// which closes over `x`; `make_adder(5)(37) == 42`.
#[test]
fn nested_closures() {
    let vm = Vm::new();

    let adder_body = flatten(&[
        &emit(Opcode::LoadDeref, 0),
        &emit(Opcode::LoadFast, 0),
        &emit(Opcode::BinaryAdd, 0),
        &emit(Opcode::ReturnValue, 0),
    ]);
    let adder_code = CodeBuilder::new("adder")
        .argcount(1)
        .nlocals(1)
        .flags(CodeFlags::OPTIMIZED | CodeFlags::NEWLOCALS)
        .varnames(vec!["y"])
        .freevars(vec!["x"])
        .bytecode(adder_body)
        .build()
        .unwrap();

    let make_adder_body = flatten(&[
        &emit(Opcode::LoadClosure, 0),
        &emit(Opcode::BuildTuple, 1),
        &emit(Opcode::LoadConst, 0),
        &emit(Opcode::LoadConst, 1),
        &emit(Opcode::MakeFunction, picovm_core::bytecode::make_function_flags::CLOSURE),
        &emit(Opcode::ReturnValue, 0),
    ]);
    let make_adder_code = CodeBuilder::new("make_adder")
        .argcount(1)
        .nlocals(1)
        .flags(CodeFlags::OPTIMIZED | CodeFlags::NEWLOCALS)
        .varnames(vec!["x"])
        .cellvars(vec!["x"])
        .cell2arg(vec![Some(0)])
        .consts(vec![Value::Code(adder_code), Value::str("adder")])
        .bytecode(make_adder_body)
        .build()
        .unwrap();

    let module_body = flatten(&[
        &emit(Opcode::LoadConst, 0),
        &emit(Opcode::LoadConst, 1),
        &emit(Opcode::MakeFunction, 0),
        &emit(Opcode::StoreName, 0),
        &emit(Opcode::LoadName, 0),
        &emit(Opcode::LoadConst, 2),
        &emit(Opcode::CallFunction, 1),
        &emit(Opcode::LoadConst, 3),
        &emit(Opcode::CallFunction, 1),
        &emit(Opcode::StoreName, 1),
        &emit(Opcode::LoadConst, 4),
        &emit(Opcode::ReturnValue, 0),
    ]);
    let module_code = CodeBuilder::new("<module>")
        .flags(CodeFlags::empty())
        .consts(vec![
            Value::Code(make_adder_code),
            Value::str("make_adder"),
            Value::int(5),
            Value::int(37),
            Value::None,
        ])
        .names(vec!["make_adder", "result"])
        .bytecode(module_body)
        .build()
        .unwrap();

    let globals = run_module(&vm, module_code).unwrap();
    let g = globals.borrow();
    assert_eq!(as_i64(&g.get(&Value::str("result")).unwrap().unwrap()), 42);
}

/// Scenario: two module-level functions sharing globals, one writing
/// a name via `STORE_GLOBAL`, the other reading it back via
/// `LOAD_GLOBAL` — what a `global` declaration compiles down to.
#[test]
fn global_writes_are_visible_across_functions() {
    let vm = Vm::new();

    let f_body = flatten(&[
        &emit(Opcode::LoadConst, 0),
        &emit(Opcode::StoreGlobal, 0),
        &emit(Opcode::LoadConst, 1),
        &emit(Opcode::ReturnValue, 0),
    ]);
    let f_code = CodeBuilder::new("f")
        .flags(CodeFlags::OPTIMIZED | CodeFlags::NEWLOCALS)
        .consts(vec![Value::int(42), Value::None])
        .names(vec!["result"])
        .bytecode(f_body)
        .build()
        .unwrap();

    let g_body = flatten(&[&emit(Opcode::LoadGlobal, 0), &emit(Opcode::ReturnValue, 0)]);
    let g_code = CodeBuilder::new("g")
        .flags(CodeFlags::OPTIMIZED | CodeFlags::NEWLOCALS)
        .names(vec!["result"])
        .bytecode(g_body)
        .build()
        .unwrap();

    let module_body = flatten(&[
        &emit(Opcode::LoadConst, 0),
        &emit(Opcode::LoadConst, 1),
        &emit(Opcode::MakeFunction, 0),
        &emit(Opcode::StoreName, 0),
        &emit(Opcode::LoadConst, 2),
        &emit(Opcode::LoadConst, 3),
        &emit(Opcode::MakeFunction, 0),
        &emit(Opcode::StoreName, 1),
        &emit(Opcode::LoadName, 0),
        &emit(Opcode::CallFunction, 0),
        &emit(Opcode::PopTop, 0),
        &emit(Opcode::LoadName, 1),
        &emit(Opcode::CallFunction, 0),
        &emit(Opcode::StoreName, 2),
        &emit(Opcode::LoadConst, 4),
        &emit(Opcode::ReturnValue, 0),
    ]);
    let module_code = CodeBuilder::new("<module>")
        .flags(CodeFlags::empty())
        .consts(vec![
            Value::Code(f_code),
            Value::str("f"),
            Value::Code(g_code),
            Value::str("g"),
            Value::None,
        ])
        .names(vec!["f", "g", "final"])
        .bytecode(module_body)
        .build()
        .unwrap();

    let globals = run_module(&vm, module_code).unwrap();
    let g = globals.borrow();
    assert_eq!(as_i64(&g.get(&Value::str("final")).unwrap().unwrap()), 42);
}

/// Scenario: keyword/default argument binding, `f(a, b=10, *, c, d=4)`.
#[test]
fn keyword_and_default_binding() {
    let code = CodeBuilder::new("f")
        .argcount(2)
        .kwonlyargcount(2)
        .nlocals(4)
        .flags(CodeFlags::OPTIMIZED | CodeFlags::NEWLOCALS)
        .varnames(vec!["a", "b", "c", "d"])
        .build()
        .unwrap();
    let defaults = [Value::int(10)];
    let mut kwdefaults = PyDict::new();
    kwdefaults.insert_str("d", Value::int(4));

    let mut kwargs = PyDict::new();
    kwargs.insert_str("c", Value::int(7));
    let bound = bind_arguments(
        "f",
        &code,
        &[Value::int(1)],
        Some(&kwargs),
        Some(&defaults),
        Some(&kwdefaults),
    )
    .unwrap();
    assert_eq!(as_i64(bound[0].as_ref().unwrap()), 1);
    assert_eq!(as_i64(bound[1].as_ref().unwrap()), 10);
    assert_eq!(as_i64(bound[2].as_ref().unwrap()), 7);
    assert_eq!(as_i64(bound[3].as_ref().unwrap()), 4);

    let too_many = bind_arguments(
        "f",
        &code,
        &[Value::int(1), Value::int(2), Value::int(3)],
        Some(&kwargs),
        Some(&defaults),
        Some(&kwdefaults),
    );
    assert!(matches!(too_many, Err(PyException::TypeError(msg)) if msg.contains("positional argument")));

    let missing_c = bind_arguments("f", &code, &[Value::int(1)], None, Some(&defaults), None);
    assert!(matches!(missing_c, Err(PyException::TypeError(msg)) if msg.contains("'c'")));
}

/// Scenario: subscript dispatch on a list, spec §4.D's sequence
/// protocol fallback for `as_index`.
#[test]
fn subscript_dispatch_on_a_list() {
    let vm = Vm::new();
    let list = Value::list(vec![Value::int(10), Value::int(20), Value::int(30)]);

    assert_eq!(as_i64(&ops::get_item(&vm, &list, &Value::int(1)).unwrap()), 20);
    assert_eq!(as_i64(&ops::get_item(&vm, &list, &Value::int(-1)).unwrap()), 30);
    assert!(matches!(
        ops::get_item(&vm, &list, &Value::int(3)),
        Err(PyException::IndexError(_))
    ));
    assert!(matches!(
        ops::get_item(&vm, &list, &Value::str("x")),
        Err(PyException::TypeError(_))
    ));
}

/// Scenario: `type(v)` type-enquiry does not invoke `__new__`;
/// otherwise a type call constructs an instance.
#[test]
fn type_enquiry_vs_construction() {
    let vm = Vm::new();

    let answer = ops::call(&vm, &Value::Type(vm.types.type_type.clone()), &[Value::int(42)], None).unwrap();
    assert!(matches!(answer, Value::Type(t) if Rc::ptr_eq(&t, &vm.types.int_type)));

    let n = ops::call(
        &vm,
        &Value::Type(vm.types.int_type.clone()),
        &[Value::str("10"), Value::int(2)],
        None,
    )
    .unwrap();
    assert_eq!(as_i64(&n), 2);

    let bad_base = ops::call(
        &vm,
        &Value::Type(vm.types.int_type.clone()),
        &[Value::str("10"), Value::int(37)],
        None,
    );
    assert!(matches!(bad_base, Err(PyException::ValueError(_))));

    let bad_type = ops::call(&vm, &Value::Type(vm.types.int_type.clone()), &[Value::list(vec![])], None);
    assert!(matches!(bad_type, Err(PyException::TypeError(_))));
}

/// Scenario: `INPLACE_ADD` on an `int` has no in-place slot, so it
/// falls back to `BINARY_ADD` semantics (spec §4.G).
#[test]
fn inplace_operator_falls_back_to_binary() {
    let vm = Vm::new();
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
        .build()
        .unwrap();
    let globals = module_globals(&vm);
    let frame = Frame::new(code, globals, &[], Vec::new(), &vm).unwrap();
    let result = run(&vm, &Rc::new(RefCell::new(frame))).unwrap();
    assert_eq!(as_i64(&result), 2);
}

/// Scenario: a `LOAD_CONST` whose oparg is 300, which needs one
/// `EXTENDED_ARG` prefix to encode (spec §4.G, SPEC_FULL §4.G).
#[test]
fn extended_arg_widens_the_oparg() {
    let vm = Vm::new();
    let mut consts: Vec<Value> = (0..300).map(Value::int).collect();
    consts.push(Value::int(42));
    let mut body = emit_extended(Opcode::LoadConst, 300);
    body.extend_from_slice(&emit(Opcode::ReturnValue, 0));
    let code = CodeBuilder::new("<module>")
        .flags(CodeFlags::empty())
        .consts(consts)
        .bytecode(body)
        .build()
        .unwrap();
    let globals = module_globals(&vm);
    let frame = Frame::new(code, globals, &[], Vec::new(), &vm).unwrap();
    let result = run(&vm, &Rc::new(RefCell::new(frame))).unwrap();
    assert_eq!(as_i64(&result), 42);
}

/// Scenario: a function with no base case recurses past the
/// interpreter's recursion limit and raises `RecursionError` rather
/// than overflowing the host stack.
#[test]
fn recursion_limit_is_enforced() {
    let mut settings = picovm_core::Settings::default();
    settings.recursion_limit = 50;
    let vm = Vm::with_settings(settings);

    let boom_body = flatten(&[
        &emit(Opcode::LoadGlobal, 0),
        &emit(Opcode::CallFunction, 0),
        &emit(Opcode::ReturnValue, 0),
    ]);
    let boom_code = CodeBuilder::new("boom")
        .flags(CodeFlags::OPTIMIZED | CodeFlags::NEWLOCALS)
        .names(vec!["boom"])
        .bytecode(boom_body)
        .build()
        .unwrap();

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
        .build()
        .unwrap();

    let result = run_module(&vm, module_code);
    assert!(matches!(result, Err(PyException::RecursionError(_))));
}
