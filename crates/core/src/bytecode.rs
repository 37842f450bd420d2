//! CPython 3.8 wordcode layer, spec §3/§6: "each instruction is two
//! bytes (opcode, oparg in 0..255)"; `EXTENDED_ARG` is a prefix opcode
//! that shifts the next oparg left by 8 bits (SPEC_FULL §4.G). Opcode
//! numeric values match CPython 3.8's `Lib/opcode.py` exactly, trimmed
//! to the subset §4.G's interpreter actually executes — ported from the
//! teacher's `compiler_core::bytecode` opcode table, reduced the same
//! way the rest of this crate reduces the teacher's generic IR to this
//! CORE's fixed instruction set.

use std::convert::TryFrom;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    PopTop = 1,
    RotTwo = 2,
    RotThree = 3,
    DupTop = 4,
    UnaryPositive = 10,
    UnaryNegative = 11,
    UnaryNot = 12,
    UnaryInvert = 15,
    BinaryMultiply = 20,
    BinaryModulo = 22,
    BinaryAdd = 23,
    BinarySubtract = 24,
    BinarySubscr = 25,
    BinaryFloorDivide = 26,
    BinaryTrueDivide = 27,
    InplaceAdd = 55,
    InplaceSubtract = 56,
    InplaceMultiply = 57,
    StoreSubscr = 60,
    BinaryAnd = 64,
    BinaryXor = 65,
    BinaryOr = 66,
    InplaceAnd = 77,
    InplaceXor = 78,
    InplaceOr = 79,
    ReturnValue = 83,
    StoreName = 90,
    DeleteName = 91,
    UnpackSequence = 92,
    StoreAttr = 95,
    DeleteAttr = 96,
    StoreGlobal = 97,
    DeleteGlobal = 98,
    LoadConst = 100,
    LoadName = 101,
    BuildTuple = 102,
    BuildList = 103,
    BuildSet = 104,
    BuildMap = 105,
    LoadAttr = 106,
    CompareOp = 107,
    JumpForward = 110,
    JumpIfFalseOrPop = 111,
    JumpIfTrueOrPop = 112,
    JumpAbsolute = 113,
    PopJumpIfFalse = 114,
    PopJumpIfTrue = 115,
    LoadGlobal = 116,
    LoadFast = 124,
    StoreFast = 125,
    DeleteFast = 126,
    CallFunction = 131,
    MakeFunction = 132,
    LoadClosure = 135,
    LoadDeref = 136,
    StoreDeref = 137,
    DeleteDeref = 138,
    CallFunctionKw = 141,
    CallFunctionEx = 142,
    ExtendedArg = 144,
    LoadClassderef = 148,
    BuildListUnpack = 149,
    BuildMapUnpackWithCall = 151,
    BuildTupleUnpack = 152,
    BuildTupleUnpackWithCall = 158,
    BuildConstKeyMap = 156,
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        use Opcode::*;
        Ok(match byte {
            1 => PopTop,
            2 => RotTwo,
            3 => RotThree,
            4 => DupTop,
            10 => UnaryPositive,
            11 => UnaryNegative,
            12 => UnaryNot,
            15 => UnaryInvert,
            20 => BinaryMultiply,
            22 => BinaryModulo,
            23 => BinaryAdd,
            24 => BinarySubtract,
            25 => BinarySubscr,
            26 => BinaryFloorDivide,
            27 => BinaryTrueDivide,
            55 => InplaceAdd,
            56 => InplaceSubtract,
            57 => InplaceMultiply,
            60 => StoreSubscr,
            64 => BinaryAnd,
            65 => BinaryXor,
            66 => BinaryOr,
            77 => InplaceAnd,
            78 => InplaceXor,
            79 => InplaceOr,
            83 => ReturnValue,
            90 => StoreName,
            91 => DeleteName,
            92 => UnpackSequence,
            95 => StoreAttr,
            96 => DeleteAttr,
            97 => StoreGlobal,
            98 => DeleteGlobal,
            100 => LoadConst,
            101 => LoadName,
            102 => BuildTuple,
            103 => BuildList,
            104 => BuildSet,
            105 => BuildMap,
            106 => LoadAttr,
            107 => CompareOp,
            110 => JumpForward,
            111 => JumpIfFalseOrPop,
            112 => JumpIfTrueOrPop,
            113 => JumpAbsolute,
            114 => PopJumpIfFalse,
            115 => PopJumpIfTrue,
            116 => LoadGlobal,
            124 => LoadFast,
            125 => StoreFast,
            126 => DeleteFast,
            131 => CallFunction,
            132 => MakeFunction,
            135 => LoadClosure,
            136 => LoadDeref,
            137 => StoreDeref,
            138 => DeleteDeref,
            141 => CallFunctionKw,
            142 => CallFunctionEx,
            144 => ExtendedArg,
            148 => LoadClassderef,
            149 => BuildListUnpack,
            151 => BuildMapUnpackWithCall,
            152 => BuildTupleUnpack,
            158 => BuildTupleUnpackWithCall,
            156 => BuildConstKeyMap,
            other => return Err(other),
        })
    }
}

/// The 11-way `COMPARE_OP` oparg, spec §4.G. Only `Lt..Ge` reach a
/// `richcompare` slot (`crate::types::CompareOp`); `Is`/`IsNot` use
/// identity and `In`/`NotIn` use containment directly in the loop.
/// `ExcMatch` is accepted for decoding completeness but is unreachable in
/// this CORE (exception handlers are out of scope per spec §1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareArg {
    Lt,
    Le,
    Eq,
    Ne,
    Gt,
    Ge,
    In,
    NotIn,
    Is,
    IsNot,
    ExcMatch,
}

impl TryFrom<u8> for CompareArg {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        use CompareArg::*;
        Ok(match byte {
            0 => Lt,
            1 => Le,
            2 => Eq,
            3 => Ne,
            4 => Gt,
            5 => Ge,
            6 => In,
            7 => NotIn,
            8 => Is,
            9 => IsNot,
            10 => ExcMatch,
            other => return Err(other),
        })
    }
}

impl From<CompareArg> for Option<crate::types::CompareOp> {
    fn from(arg: CompareArg) -> Self {
        use crate::types::CompareOp as C;
        match arg {
            CompareArg::Lt => Some(C::Lt),
            CompareArg::Le => Some(C::Le),
            CompareArg::Eq => Some(C::Eq),
            CompareArg::Ne => Some(C::Ne),
            CompareArg::Gt => Some(C::Gt),
            CompareArg::Ge => Some(C::Ge),
            _ => None,
        }
    }
}

/// `MAKE_FUNCTION`'s oparg bits, spec §4.G: which optional components
/// (defaults tuple, kwdefaults dict, annotations dict, closure tuple)
/// the compiler pushed below `(code, qualname)`. Values match CPython.
pub mod make_function_flags {
    pub const DEFAULTS: u8 = 0x01;
    pub const KWDEFAULTS: u8 = 0x02;
    pub const ANNOTATIONS: u8 = 0x04;
    pub const CLOSURE: u8 = 0x08;
}

/// `CALL_FUNCTION_EX`'s oparg bit: bit 0 set means a keyword-arguments
/// dict was also pushed (below the positional-args tuple, above the
/// callable).
pub const CALL_FUNCTION_EX_HAS_KWARGS: u8 = 0x01;

/// Encode `(opcode, oparg)` into the two-byte wordcode instruction the
/// spec's `bytecode` field is a sequence of. Used by hand-assembled demo
/// code objects (SPEC_FULL "Demo code objects") and by tests.
pub fn emit(opcode: Opcode, oparg: u8) -> [u8; 2] {
    [opcode as u8, oparg]
}

/// Emit `EXTENDED_ARG` prefixes plus a final instruction so that
/// `oparg_full` (which may exceed 255) round-trips through the `u8`
/// oparg/`EXTENDED_ARG` scheme exactly as CPython's compiler does.
pub fn emit_extended(opcode: Opcode, oparg_full: u32) -> Vec<u8> {
    let bytes = oparg_full.to_be_bytes();
    let mut out = Vec::new();
    let mut started = false;
    for &b in &bytes[..3] {
        if b != 0 {
            started = true;
        }
        if started {
            out.extend_from_slice(&emit(Opcode::ExtendedArg, b));
        }
    }
    out.extend_from_slice(&emit(opcode, bytes[3]));
    out
}
