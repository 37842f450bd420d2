//! The exception taxonomy of spec §7, represented as a plain Rust enum
//! rather than a Python object graph: building `__traceback__`/`__cause__`
//! chains is out of scope (spec §1), so each variant just carries the
//! formatted message CPython would show.
//!
//! `EmptyOp` and `Internal` are marked `internal` and must never reach a
//! caller of [`crate::vm::Vm::call`] or [`crate::frame::Frame::run`]
//! intact — the abstract-operations layer (`ops`) converts `EmptyOp`
//! into the appropriate user-visible kind before it can escape.

use thiserror::Error;

pub type PyResult<T> = Result<T, PyException>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PyException {
    #[error("TypeError: {0}")]
    TypeError(String),
    #[error("ValueError: {0}")]
    ValueError(String),
    #[error("AttributeError: {0}")]
    AttributeError(String),
    #[error("NameError: {0}")]
    NameError(String),
    /// Subtype of `NameError` per §7; kept as its own variant so callers
    /// can distinguish it (`LOAD_FAST` of a null local) without string
    /// matching.
    #[error("UnboundLocalError: {0}")]
    UnboundLocalError(String),
    #[error("IndexError: {0}")]
    IndexError(String),
    #[error("KeyError: {0}")]
    KeyError(String),
    #[error("OverflowError: {0}")]
    OverflowError(String),
    /// Sibling of `ValueError`/`TypeError`, added by SPEC_FULL §7: CPython
    /// raises this (not a `ValueError`) for division/modulo by zero.
    #[error("ZeroDivisionError: {0}")]
    ZeroDivisionError(String),
    /// Added by SPEC_FULL §7: the frame interpreter's recursion guard.
    #[error("RecursionError: {0}")]
    RecursionError(String),
    #[error("SystemError: {0}")]
    SystemError(String),
    #[error("NotImplementedError: {0}")]
    NotImplementedError(String),
    /// Internal-only per §7. Invoking an empty slot signals this; the
    /// abstract-operations layer must catch it before it is observable.
    #[error("internal: empty slot invoked ({0})")]
    EmptyOp(&'static str),
    /// Internal-only per §7: interpreter bugs (bad slot signature, wrong
    /// internal call shape). Fatal to the current call.
    #[error("internal interpreter error: {0}")]
    Internal(String),
}

impl PyException {
    /// True for the two internal-only kinds that must never be surfaced
    /// to a user of the CORE's public entry points.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::EmptyOp(_) | Self::Internal(_))
    }

    /// The message a `repr()`/`str()` of the exception would show,
    /// without the `KindError: ` prefix `Display` adds.
    pub fn message(&self) -> String {
        self.to_string()
            .split_once(": ")
            .map(|(_, msg)| msg.to_owned())
            .unwrap_or_else(|| self.to_string())
    }
}
