//! The ambient interpreter context: spec §3's "thread state" (a pointer
//! to the current top frame) plus the process-wide type registry and the
//! SPEC_FULL "Settings & CLI" ambient component (recursion limit, debug
//! flag), mirroring the teacher's `vm::Settings`/`vm::Context` split but
//! collapsed into one struct since this CORE runs one interpreter on one
//! thread (§5).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::builtins::dict::PyDict;
use crate::error::{PyException, PyResult};
use crate::frame::Frame;
use crate::types::zoo::TypeZoo;
use crate::value::Value;

/// User-configurable interpreter settings, SPEC_FULL "Settings & CLI".
/// Intentionally small: a full `PyConfig` (isolation flags, `sys.path`,
/// hash seed, warnings filters, ...) is out of scope for a CORE that
/// doesn't have modules/imports to configure.
#[derive(Debug, Clone)]
pub struct Settings {
    /// CPython's default `sys.getrecursionlimit()`.
    pub recursion_limit: usize,
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            recursion_limit: 1000,
            debug: false,
        }
    }
}

/// A single interpreter. Owns the type registry and the current frame
/// stack (spec §3 "Thread state", §5 "exactly one per-thread 'current
/// frame' pointer"). Frames link back to their caller themselves
/// (`Frame::parent`); `Vm` just remembers the top.
pub struct Vm {
    pub types: TypeZoo,
    pub settings: Settings,
    pub builtins: Rc<RefCell<PyDict>>,
    current_frame: RefCell<Option<Rc<RefCell<Frame>>>>,
    depth: Cell<usize>,
}

impl Vm {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let types = TypeZoo::new();
        let builtins = Rc::new(RefCell::new(default_builtins(&types)));
        Self {
            types,
            settings,
            builtins,
            current_frame: RefCell::new(None),
            depth: Cell::new(0),
        }
    }

    pub fn current_frame(&self) -> Option<Rc<RefCell<Frame>>> {
        self.current_frame.borrow().clone()
    }

    pub fn call_depth(&self) -> usize {
        self.depth.get()
    }

    /// Scoped acquisition, spec §5: push onto the thread's frame stack
    /// for the duration of `body`, guaranteeing pop on every exit path
    /// (normal return or propagated error) and enforcing the recursion
    /// limit the way CPython's `ceval.c` does (SPEC_FULL §7).
    pub fn with_frame<R>(
        &self,
        frame: Rc<RefCell<Frame>>,
        body: impl FnOnce(&Rc<RefCell<Frame>>) -> PyResult<R>,
    ) -> PyResult<R> {
        if self.depth.get() >= self.settings.recursion_limit {
            return Err(PyException::RecursionError(
                "maximum recursion depth exceeded".to_owned(),
            ));
        }
        let previous = self.current_frame.replace(Some(frame.clone()));
        self.depth.set(self.depth.get() + 1);
        log::trace!(
            "frame push: depth={} code={:?}",
            self.depth.get(),
            frame.borrow().code.name
        );
        let result = body(&frame);
        self.depth.set(self.depth.get() - 1);
        *self.current_frame.borrow_mut() = previous;
        log::trace!("frame pop: depth={}", self.depth.get());
        result
    }

    pub fn new_type_error(&self, msg: impl Into<String>) -> PyException {
        PyException::TypeError(msg.into())
    }

    pub fn new_value_error(&self, msg: impl Into<String>) -> PyException {
        PyException::ValueError(msg.into())
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

/// Spec §4.G "Builtins inference": "If absent, install a minimal dict
/// containing at least `None`." The CORE's default builtins additionally
/// carries `type`/`int`/`float`/`bool`/`str`/`len` so the §8 end-to-end
/// scenarios (which call `type(...)`/`int(...)`) resolve without a
/// hand-assembled globals dict having to redeclare them.
fn default_builtins(types: &TypeZoo) -> PyDict {
    let mut dict = PyDict::new();
    dict.insert_str("None", Value::None);
    dict.insert_str("True", Value::Bool(true));
    dict.insert_str("False", Value::Bool(false));
    dict.insert_str("NotImplemented", Value::NotImplemented);
    dict.insert_str("type", Value::Type(types.type_type.clone()));
    dict.insert_str("int", Value::Type(types.int_type.clone()));
    dict.insert_str("float", Value::Type(types.float_type.clone()));
    dict.insert_str("bool", Value::Type(types.bool_type.clone()));
    dict.insert_str("str", Value::Type(types.str_type.clone()));
    dict.insert_str("bytes", Value::Type(types.bytes_type.clone()));
    dict.insert_str("tuple", Value::Type(types.tuple_type.clone()));
    dict.insert_str("list", Value::Type(types.list_type.clone()));
    dict.insert_str("dict", Value::Type(types.dict_type.clone()));
    dict.insert_str(
        "len",
        Value::BuiltinFunction(Rc::new(crate::builtins::builtin_function::len_def())),
    );
    dict
}
