//! The uniform value representation of spec §3/§4.A.
//!
//! The spec explicitly permits a "tagged sum of primitive variants...
//! provided the type discriminator is stable" in place of the teacher's
//! extensible `dyn PyObjectPayload` object model (class creation from
//! Python source is out of scope here, so there is no need for an open
//! set of payload types). `Value` is that tagged sum; [`crate::types`]
//! maps each discriminant to a pre-registered [`crate::types::PyTypeRef`].
//!
//! Heap-shaped variants (`Str`, `Bytes`, `Tuple`, `List`, `Dict`, `Cell`,
//! ...) are `Rc`-boxed so that `is`/`is not` can use pointer identity and
//! mutation (list append, dict insert, cell write) is visible to every
//! holder of a clone, matching §5's single-threaded `Rc`/`RefCell` model.

use malachite_bigint::BigInt;
use num_traits::ToPrimitive;
use std::cell::RefCell;
use std::rc::Rc;

use crate::builtins::builtin_function::BuiltinFunctionDef;
use crate::builtins::code::CodeObject;
use crate::builtins::dict::PyDict;
use crate::builtins::function::PyFunction;
use crate::builtins::module::PyModule;
use crate::error::{PyException, PyResult};
use crate::frame::Frame;
use crate::types::PyTypeRef;

#[derive(Debug, Clone)]
pub enum Value {
    Int(BigInt),
    Float(f64),
    Bool(bool),
    Str(Rc<str>),
    Bytes(Rc<[u8]>),
    Tuple(Rc<[Value]>),
    List(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<PyDict>>),
    None,
    NotImplemented,
    Cell(Rc<RefCell<Option<Value>>>),
    Code(Rc<CodeObject>),
    Function(Rc<PyFunction>),
    BuiltinFunction(Rc<BuiltinFunctionDef>),
    Module(Rc<RefCell<PyModule>>),
    Frame(Rc<RefCell<Frame>>),
    Type(PyTypeRef),
}

impl Value {
    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn bytes(b: impl Into<Rc<[u8]>>) -> Self {
        Value::Bytes(b.into())
    }

    pub fn int(i: impl Into<BigInt>) -> Self {
        Value::Int(i.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(items.into())
    }

    pub fn new_cell(initial: Option<Value>) -> Self {
        Value::Cell(Rc::new(RefCell::new(initial)))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Value::NotImplemented)
    }

    /// `x is y`: pointer identity for heap variants, the singleton
    /// discriminant itself for `None`/`NotImplemented`/`bool`.
    pub fn is_identical(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (None, None) | (NotImplemented, NotImplemented) => true,
            (Bool(a), Bool(b)) => a == b,
            (Str(a), Str(b)) => Rc::ptr_eq(a, b),
            (Bytes(a), Bytes(b)) => Rc::ptr_eq(a, b),
            (Tuple(a), Tuple(b)) => Rc::ptr_eq(a, b),
            (List(a), List(b)) => Rc::ptr_eq(a, b),
            (Dict(a), Dict(b)) => Rc::ptr_eq(a, b),
            (Cell(a), Cell(b)) => Rc::ptr_eq(a, b),
            (Code(a), Code(b)) => Rc::ptr_eq(a, b),
            (Function(a), Function(b)) => Rc::ptr_eq(a, b),
            (BuiltinFunction(a), BuiltinFunction(b)) => Rc::ptr_eq(a, b),
            (Module(a), Module(b)) => Rc::ptr_eq(a, b),
            (Frame(a), Frame(b)) => Rc::ptr_eq(a, b),
            (Type(a), Type(b)) => Rc::ptr_eq(a, b),
            // int/float have no separate heap identity in this
            // representation; `is` degrades to value equality for them,
            // recorded as a deliberate simplification in DESIGN.md.
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }

    /// A short discriminant name, used for error messages
    /// ("unsupported operand type(s) for +: 'int' and 'str'").
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::None => "NoneType",
            Value::NotImplemented => "NotImplementedType",
            Value::Cell(_) => "cell",
            Value::Code(_) => "code",
            Value::Function(_) => "function",
            Value::BuiltinFunction(_) => "builtin_function_or_method",
            Value::Module(_) => "module",
            Value::Frame(_) => "frame",
            Value::Type(_) => "type",
        }
    }
}

/// Numeric cross-type equality (`1 == 1.0 == True`), compared as `f64`.
/// This loses exactness for integers outside `f64`'s 53-bit mantissa
/// compared against a float; acceptable for this CORE's scope (DESIGN.md).
fn numeric_value(v: &Value) -> Option<f64> {
    match v {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Int(i) => i.to_f64(),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

/// Structural equality used for dict keys and `is`-independent equality
/// checks that don't need full slot dispatch (no user classes are
/// reachable here; every hashable type is built in).
pub fn value_eq(a: &Value, b: &Value) -> bool {
    use Value::*;
    match (a, b) {
        (Str(x), Str(y)) => x == y,
        (Bytes(x), Bytes(y)) => x == y,
        (Tuple(x), Tuple(y)) => x.len() == y.len() && x.iter().zip(y.iter()).all(|(p, q)| value_eq(p, q)),
        (None, None) => true,
        (NotImplemented, NotImplemented) => true,
        _ => match (numeric_value(a), numeric_value(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

/// Structural hash used for dict keys; consistent with [`value_eq`].
/// Returns `Err` for types that aren't hashable (`list`, `dict`).
pub fn value_hash(v: &Value) -> PyResult<picovm_common::hash::PyHash> {
    use picovm_common::hash::{hash_bytes, hash_f64, hash_iter, hash_str};
    match v {
        Value::Bool(b) => Ok(hash_f64(if *b { 1.0 } else { 0.0 })),
        Value::Int(i) => Ok(picovm_common::hash::hash_bigint(i)),
        Value::Float(f) => Ok(hash_f64(*f)),
        Value::Str(s) => Ok(hash_str(s)),
        Value::Bytes(b) => Ok(hash_bytes(b)),
        Value::None => Ok(0),
        Value::NotImplemented => Ok(picovm_common::hash::fix_sentinel(1)),
        Value::Tuple(items) => hash_iter(items.iter().map(|i| value_hash(i))),
        other => Err(PyException::TypeError(format!(
            "unhashable type: '{}'",
            other.type_name()
        ))),
    }
}

/// A dict key wrapper implementing `Hash`/`Eq` structurally, so `PyDict`
/// can be backed by a plain `indexmap::IndexMap`. Only ever constructed
/// for values [`value_hash`] accepts; callers check hashability first.
#[derive(Debug, Clone)]
pub struct DictKey(pub Value);

impl PartialEq for DictKey {
    fn eq(&self, other: &Self) -> bool {
        value_eq(&self.0, &other.0)
    }
}
impl Eq for DictKey {}

impl std::hash::Hash for DictKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_i64(value_hash(&self.0).unwrap_or(0));
    }
}
