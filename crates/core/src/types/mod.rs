//! Type descriptor, spec §4.C: per-type slot array, MRO, name and flags.
//!
//! Slot *signatures* are enforced by Rust's type system (each slot field
//! is a concrete `fn` pointer type from [`slots`]) rather than at runtime,
//! which is the natural translation of "rejects ops whose signature does
//! not match the slot's" into a statically typed host language — recorded
//! in DESIGN.md as a deliberate simplification of §4.C's construction
//! algorithm.

pub mod slots;
pub mod zoo;

pub use slots::CompareOp;

use bitflags::bitflags;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use slots::*;

pub type PyTypeRef = Rc<PyType>;

bitflags! {
    /// Spec §3: `{BASETYPE, MUTABLE, REMOVABLE}`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PyTypeFlags: u8 {
        /// Other types may declare this one as a base.
        const BASETYPE = 1 << 0;
        /// Slots may be redefined after construction (unused by
        /// built-ins; kept for parity with the spec's flag set).
        const MUTABLE  = 1 << 1;
        /// Type may be removed from the registry (unused by built-ins;
        /// kept for parity with the spec's flag set).
        const REMOVABLE = 1 << 2;
    }
}

/// Number-protocol slots: arithmetic/bitwise binary ops plus their
/// in-place counterparts (SPEC_FULL §4.D).
#[derive(Default)]
pub struct NumberSlots {
    pub neg: Option<UnaryFn>,
    pub abs: Option<UnaryFn>,
    pub int: Option<UnaryFn>,
    pub index: Option<UnaryFn>,
    pub bool_: Option<BoolFn>,
    pub add: Option<BinaryFn>,
    pub sub: Option<BinaryFn>,
    pub mul: Option<BinaryFn>,
    pub and: Option<BinaryFn>,
    pub or: Option<BinaryFn>,
    pub xor: Option<BinaryFn>,
    pub inplace_add: Option<BinaryFn>,
    pub inplace_sub: Option<BinaryFn>,
    pub inplace_mul: Option<BinaryFn>,
    pub inplace_and: Option<BinaryFn>,
    pub inplace_or: Option<BinaryFn>,
    pub inplace_xor: Option<BinaryFn>,
}

#[derive(Default)]
pub struct SequenceSlots {
    pub length: Option<SeqLengthFn>,
    pub item: Option<SeqItemFn>,
    pub ass_item: Option<SeqAssItemFn>,
    pub repeat: Option<SeqRepeatFn>,
}

#[derive(Default)]
pub struct MappingSlots {
    pub length: Option<MapLengthFn>,
    pub subscript: Option<MapSubscriptFn>,
    pub ass_subscript: Option<MapAssSubscriptFn>,
    pub del_item: Option<MapDelItemFn>,
}

/// The fixed-width slot array of spec §3/§4.B, grouped the way the
/// teacher's `PyTypeSlots` groups number/sequence/mapping sub-protocols.
#[derive(Default)]
pub struct PyTypeSlots {
    pub as_number: NumberSlots,
    pub as_sequence: SequenceSlots,
    pub as_mapping: MappingSlots,

    pub repr: Option<UnaryFn>,
    pub str_: Option<UnaryFn>,
    pub hash: Option<HashFn>,
    pub richcompare: Option<RichCompareFn>,

    pub getattribute: Option<GetAttributeFn>,
    pub getattr: Option<GetAttributeFn>,
    pub setattr: Option<SetAttrFn>,
    pub delattr: Option<DelAttrFn>,

    pub call: Option<CallFn>,
    pub new: Option<NewFn>,
    pub init: Option<InitFn>,
}

pub struct PyType {
    pub name: String,
    pub flags: PyTypeFlags,
    pub base: Option<PyTypeRef>,
    pub bases: Vec<PyTypeRef>,
    /// Ordered list starting with `self`, per spec §3. Single inheritance
    /// only (multiple inheritance is out of scope per §3). `RefCell`
    /// only to let `TypeBuilder::build` thread `self` into its own list
    /// after the `Rc` exists; never mutated again afterwards.
    mro: RefCell<Vec<PyTypeRef>>,
    pub slots: PyTypeSlots,
}

impl fmt::Debug for PyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PyType").field("name", &self.name).finish()
    }
}

impl PyType {
    pub fn mro(&self) -> Ref<'_, Vec<PyTypeRef>> {
        self.mro.borrow()
    }

    /// `isSubTypeOf`, spec §4.C: true iff `other` appears in this type's
    /// MRO (reflexive: every type is a subtype of itself).
    pub fn is_subtype_of(self: &PyTypeRef, other: &PyTypeRef) -> bool {
        self.mro.borrow().iter().any(|t| Rc::ptr_eq(t, other))
    }

}

/// A builder used by each built-in type's `extend_slots` function (the
/// hand-written stand-in for the teacher's `#[pyclass]` macro expansion,
/// per SPEC_FULL §4.B/§4.C) and by [`zoo`] to finish construction:
/// resolves `base`/`bases`/`mro` and inherits any slot left unset from
/// the first base (in MRO order) that defines it.
pub struct TypeBuilder {
    pub name: String,
    pub flags: PyTypeFlags,
    pub base: Option<PyTypeRef>,
    pub slots: PyTypeSlots,
}

impl TypeBuilder {
    pub fn new(name: impl Into<String>, flags: PyTypeFlags) -> Self {
        Self {
            name: name.into(),
            flags,
            base: None,
            slots: PyTypeSlots::default(),
        }
    }

    pub fn base(mut self, base: PyTypeRef) -> Self {
        self.base = Some(base);
        self
    }

    pub fn build(self) -> PyTypeRef {
        let bases: Vec<PyTypeRef> = self.base.iter().cloned().collect();
        let mut mro = Vec::new();
        let mut slots = self.slots;
        if let Some(base) = &self.base {
            mro.extend(base.mro.iter().cloned());
            inherit_number(&mut slots.as_number, &base.slots.as_number);
            inherit_sequence(&mut slots.as_sequence, &base.slots.as_sequence);
            inherit_mapping(&mut slots.as_mapping, &base.slots.as_mapping);
            slots.repr = slots.repr.or(base.slots.repr);
            slots.str_ = slots.str_.or(base.slots.str_);
            slots.hash = slots.hash.or(base.slots.hash);
            slots.richcompare = slots.richcompare.or(base.slots.richcompare);
            slots.getattribute = slots.getattribute.or(base.slots.getattribute);
            slots.getattr = slots.getattr.or(base.slots.getattr);
            slots.setattr = slots.setattr.or(base.slots.setattr);
            slots.delattr = slots.delattr.or(base.slots.delattr);
            slots.call = slots.call.or(base.slots.call);
            slots.new = slots.new.or(base.slots.new);
            slots.init = slots.init.or(base.slots.init);
        }
        let ty = Rc::new(PyType {
            name: self.name,
            flags: self.flags,
            base: self.base,
            bases,
            mro: RefCell::new(mro),
            slots,
        });
        // self must be first in its own MRO; `mro` is a `RefCell` for
        // exactly this one self-referential insert.
        ty.mro.borrow_mut().insert(0, ty.clone());
        ty
    }
}

fn inherit_number(slots: &mut NumberSlots, base: &NumberSlots) {
    slots.neg = slots.neg.or(base.neg);
    slots.abs = slots.abs.or(base.abs);
    slots.int = slots.int.or(base.int);
    slots.index = slots.index.or(base.index);
    slots.bool_ = slots.bool_.or(base.bool_);
    slots.add = slots.add.or(base.add);
    slots.sub = slots.sub.or(base.sub);
    slots.mul = slots.mul.or(base.mul);
    slots.and = slots.and.or(base.and);
    slots.or = slots.or.or(base.or);
    slots.xor = slots.xor.or(base.xor);
    slots.inplace_add = slots.inplace_add.or(base.inplace_add);
    slots.inplace_sub = slots.inplace_sub.or(base.inplace_sub);
    slots.inplace_mul = slots.inplace_mul.or(base.inplace_mul);
    slots.inplace_and = slots.inplace_and.or(base.inplace_and);
    slots.inplace_or = slots.inplace_or.or(base.inplace_or);
    slots.inplace_xor = slots.inplace_xor.or(base.inplace_xor);
}

fn inherit_sequence(slots: &mut SequenceSlots, base: &SequenceSlots) {
    slots.length = slots.length.or(base.length);
    slots.item = slots.item.or(base.item);
    slots.ass_item = slots.ass_item.or(base.ass_item);
    slots.repeat = slots.repeat.or(base.repeat);
}

fn inherit_mapping(slots: &mut MappingSlots, base: &MappingSlots) {
    slots.length = slots.length.or(base.length);
    slots.subscript = slots.subscript.or(base.subscript);
    slots.ass_subscript = slots.ass_subscript.or(base.ass_subscript);
    slots.del_item = slots.del_item.or(base.del_item);
}
