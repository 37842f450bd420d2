//! `code`: an immutable compiled-code object, spec §3. Opaque to the
//! interpreter except through the fields enumerated here; construction
//! validates the two invariants the spec calls out
//! ("argcount + kwonlyargcount ≤ nlocals" and "the VARARGS/VARKEYWORDS
//! index positions fit") and raises `SystemError` otherwise, the way the
//! teacher's `CodeObject::new` rejects a malformed compiler output.

use std::rc::Rc;

use bitflags::bitflags;

use crate::error::{PyException, PyResult};
use crate::value::Value;

bitflags! {
    /// Spec §3's `traits` set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CodeFlags: u8 {
        const OPTIMIZED   = 1 << 0;
        const NEWLOCALS   = 1 << 1;
        const VARARGS     = 1 << 2;
        const VARKEYWORDS = 1 << 3;
        const NESTED      = 1 << 4;
        const GENERATOR   = 1 << 5;
        const COROUTINE   = 1 << 6;
    }
}

#[derive(Debug)]
pub struct CodeObject {
    pub name: String,
    pub argcount: usize,
    pub posonlyargcount: usize,
    pub kwonlyargcount: usize,
    pub nlocals: usize,
    pub stacksize: usize,
    pub flags: CodeFlags,
    /// Each instruction is two bytes, `(opcode, oparg)`, per spec §3/§6.
    pub bytecode: Vec<u8>,
    pub consts: Vec<Value>,
    pub names: Vec<Rc<str>>,
    pub varnames: Vec<Rc<str>>,
    pub cellvars: Vec<Rc<str>>,
    pub freevars: Vec<Rc<str>>,
    /// Cell index → varname index, for parameters that are also cells
    /// (SPEC_FULL §3 clarification: the map direction is cell-to-varname,
    /// not the reverse).
    pub cell2arg: Option<Vec<Option<usize>>>,
}

impl CodeObject {
    /// Spec §4.E: "construction validates that
    /// `argcount + kwonlyargcount ≤ nlocals` and the VARARGS/VARKEYWORDS
    /// index positions fit."
    pub fn validate(self) -> PyResult<Rc<Self>> {
        if self.argcount + self.kwonlyargcount > self.nlocals {
            return Err(PyException::SystemError(format!(
                "code '{}': argcount + kwonlyargcount ({}) exceeds nlocals ({})",
                self.name,
                self.argcount + self.kwonlyargcount,
                self.nlocals
            )));
        }
        let mut offset = self.argcount + self.kwonlyargcount;
        if self.flags.contains(CodeFlags::VARARGS) {
            if offset >= self.nlocals {
                return Err(PyException::SystemError(format!(
                    "code '{}': *args slot {offset} does not fit in nlocals ({})",
                    self.name, self.nlocals
                )));
            }
            offset += 1;
        }
        if self.flags.contains(CodeFlags::VARKEYWORDS) && offset >= self.nlocals {
            return Err(PyException::SystemError(format!(
                "code '{}': **kwargs slot {offset} does not fit in nlocals ({})",
                self.name, self.nlocals
            )));
        }
        if let Some(map) = &self.cell2arg {
            if map.len() != self.cellvars.len() {
                return Err(PyException::SystemError(format!(
                    "code '{}': cell2arg length {} does not match cellvars length {}",
                    self.name,
                    map.len(),
                    self.cellvars.len()
                )));
            }
        }
        Ok(Rc::new(self))
    }

    /// The varname index of the `*args` tuple slot, if this code accepts
    /// varargs.
    pub fn vararg_index(&self) -> Option<usize> {
        self.flags
            .contains(CodeFlags::VARARGS)
            .then_some(self.argcount + self.kwonlyargcount)
    }

    /// The varname index of the `**kwargs` dict slot, if this code
    /// accepts varkeywords.
    pub fn varkw_index(&self) -> Option<usize> {
        if !self.flags.contains(CodeFlags::VARKEYWORDS) {
            return None;
        }
        let mut idx = self.argcount + self.kwonlyargcount;
        if self.flags.contains(CodeFlags::VARARGS) {
            idx += 1;
        }
        Some(idx)
    }
}

/// Builder used by SPEC_FULL's hand-assembled demo code objects and by
/// tests, standing in for the excluded bytecode compiler (spec §1).
pub struct CodeBuilder {
    obj: CodeObject,
}

impl CodeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            obj: CodeObject {
                name: name.into(),
                argcount: 0,
                posonlyargcount: 0,
                kwonlyargcount: 0,
                nlocals: 0,
                stacksize: 16,
                flags: CodeFlags::OPTIMIZED | CodeFlags::NEWLOCALS,
                bytecode: Vec::new(),
                consts: Vec::new(),
                names: Vec::new(),
                varnames: Vec::new(),
                cellvars: Vec::new(),
                freevars: Vec::new(),
                cell2arg: None,
            },
        }
    }

    pub fn argcount(mut self, n: usize) -> Self {
        self.obj.argcount = n;
        self
    }

    pub fn posonlyargcount(mut self, n: usize) -> Self {
        self.obj.posonlyargcount = n;
        self
    }

    pub fn kwonlyargcount(mut self, n: usize) -> Self {
        self.obj.kwonlyargcount = n;
        self
    }

    pub fn nlocals(mut self, n: usize) -> Self {
        self.obj.nlocals = n;
        self
    }

    pub fn stacksize(mut self, n: usize) -> Self {
        self.obj.stacksize = n;
        self
    }

    pub fn flags(mut self, flags: CodeFlags) -> Self {
        self.obj.flags = flags;
        self
    }

    pub fn bytecode(mut self, bytecode: Vec<u8>) -> Self {
        self.obj.bytecode = bytecode;
        self
    }

    pub fn consts(mut self, consts: Vec<Value>) -> Self {
        self.obj.consts = consts;
        self
    }

    pub fn names(mut self, names: Vec<&str>) -> Self {
        self.obj.names = names.into_iter().map(Rc::from).collect();
        self
    }

    pub fn varnames(mut self, varnames: Vec<&str>) -> Self {
        self.obj.varnames = varnames.into_iter().map(Rc::from).collect();
        self
    }

    pub fn cellvars(mut self, cellvars: Vec<&str>) -> Self {
        self.obj.cellvars = cellvars.into_iter().map(Rc::from).collect();
        self
    }

    pub fn freevars(mut self, freevars: Vec<&str>) -> Self {
        self.obj.freevars = freevars.into_iter().map(Rc::from).collect();
        self
    }

    pub fn cell2arg(mut self, map: Vec<Option<usize>>) -> Self {
        self.obj.cell2arg = Some(map);
        self
    }

    pub fn build(self) -> PyResult<Rc<CodeObject>> {
        self.obj.validate()
    }
}
