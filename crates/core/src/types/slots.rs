//! Slot signatures, spec §4.B.
//!
//! Each slot is a typed function pointer field on [`super::PyTypeSlots`].
//! `None` stands for the spec's "empty operation": a field left unset on
//! a type's `PyTypeSlots` is the CORE's representation of "invoking the
//! empty slot raises `EmptyOp`" — the abstract-operations layer
//! (`crate::ops`) is the only place allowed to observe that and must
//! convert it before it can be observed by a caller.

use crate::error::PyResult;
use crate::value::Value;
use crate::vm::Vm;

/// The comparison operator tag `richcompare` dispatches on (spec §4.B).
/// A strict subset of the 11-way `COMPARE_OP` oparg (`crate::bytecode`
/// also has `IN`/`NOT_IN`/`IS`/`IS_NOT`/`EXC_MATCH`, which never reach a
/// `richcompare` slot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    Ne,
    Gt,
    Ge,
}

impl CompareOp {
    pub const fn swapped(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            Self::Eq => Self::Eq,
            Self::Ne => Self::Ne,
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

pub type UnaryFn = fn(&Value, &Vm) -> PyResult<Value>;
pub type HashFn = fn(&Value, &Vm) -> PyResult<i64>;
pub type BoolFn = fn(&Value, &Vm) -> PyResult<bool>;
pub type BinaryFn = fn(&Value, &Value, &Vm) -> PyResult<Value>;
pub type RichCompareFn = fn(&Value, &Value, CompareOp, &Vm) -> PyResult<Value>;

pub type SeqLengthFn = fn(&Value, &Vm) -> PyResult<usize>;
pub type SeqItemFn = fn(&Value, i64, &Vm) -> PyResult<Value>;
pub type SeqAssItemFn = fn(&Value, i64, Value, &Vm) -> PyResult<()>;
pub type SeqRepeatFn = fn(&Value, i64, &Vm) -> PyResult<Value>;

pub type MapLengthFn = fn(&Value, &Vm) -> PyResult<usize>;
pub type MapSubscriptFn = fn(&Value, &Value, &Vm) -> PyResult<Value>;
pub type MapAssSubscriptFn = fn(&Value, &Value, Value, &Vm) -> PyResult<()>;
pub type MapDelItemFn = fn(&Value, &Value, &Vm) -> PyResult<()>;

pub type GetAttributeFn = fn(&Value, &str, &Vm) -> PyResult<Value>;
pub type SetAttrFn = fn(&Value, &str, Value, &Vm) -> PyResult<()>;
pub type DelAttrFn = fn(&Value, &str, &Vm) -> PyResult<()>;

pub type CallFn = fn(&Value, &[Value], Option<&Value>, &Vm) -> PyResult<Value>;
pub type NewFn = fn(&super::PyTypeRef, &[Value], Option<&Value>, &Vm) -> PyResult<Value>;
pub type InitFn = fn(&Value, &[Value], Option<&Value>, &Vm) -> PyResult<()>;
