//! The process-wide type registry, spec §4.A/§5: "population must be
//! complete before concurrent interpreter use... after initialization,
//! types are read-only unless flagged MUTABLE." Built once, exposed as
//! a plain struct of `PyTypeRef`s (the teacher uses `OnceLock`-backed
//! statics for the same purpose; a single-threaded `OnceCell` would add
//! nothing here since [`crate::vm::Vm`] already owns the registry for
//! the process's one interpreter).

use super::{PyTypeFlags, PyTypeRef, TypeBuilder};
use crate::builtins::{
    bool_, builtin_function, bytes_, cell, code, dict, float_, function, int, list, module, none,
    not_implemented, str_, tuple, type_obj,
};

pub struct TypeZoo {
    pub int_type: PyTypeRef,
    pub float_type: PyTypeRef,
    pub bool_type: PyTypeRef,
    pub str_type: PyTypeRef,
    pub bytes_type: PyTypeRef,
    pub tuple_type: PyTypeRef,
    pub list_type: PyTypeRef,
    pub dict_type: PyTypeRef,
    pub none_type: PyTypeRef,
    pub not_implemented_type: PyTypeRef,
    pub cell_type: PyTypeRef,
    pub code_type: PyTypeRef,
    pub function_type: PyTypeRef,
    pub builtin_function_type: PyTypeRef,
    pub module_type: PyTypeRef,
    pub frame_type: PyTypeRef,
    pub type_type: PyTypeRef,
}

impl TypeZoo {
    pub fn new() -> Self {
        let int_type = {
            let mut b = TypeBuilder::new("int", PyTypeFlags::BASETYPE);
            int::extend_slots(&mut b.slots);
            b.build()
        };
        let bool_type = {
            let mut b = TypeBuilder::new("bool", PyTypeFlags::empty()).base(int_type.clone());
            bool_::extend_slots(&mut b.slots);
            b.build()
        };
        let float_type = {
            let mut b = TypeBuilder::new("float", PyTypeFlags::BASETYPE);
            float_::extend_slots(&mut b.slots);
            b.build()
        };
        let str_type = {
            let mut b = TypeBuilder::new("str", PyTypeFlags::BASETYPE);
            str_::extend_slots(&mut b.slots);
            b.build()
        };
        let bytes_type = {
            let mut b = TypeBuilder::new("bytes", PyTypeFlags::BASETYPE);
            bytes_::extend_slots(&mut b.slots);
            b.build()
        };
        let tuple_type = {
            let mut b = TypeBuilder::new("tuple", PyTypeFlags::BASETYPE);
            tuple::extend_slots(&mut b.slots);
            b.build()
        };
        let list_type = {
            let mut b = TypeBuilder::new("list", PyTypeFlags::BASETYPE);
            list::extend_slots(&mut b.slots);
            b.build()
        };
        let dict_type = {
            let mut b = TypeBuilder::new("dict", PyTypeFlags::BASETYPE);
            dict::extend_slots(&mut b.slots);
            b.build()
        };
        let none_type = {
            let mut b = TypeBuilder::new("NoneType", PyTypeFlags::empty());
            none::extend_slots(&mut b.slots);
            b.build()
        };
        let not_implemented_type = {
            let mut b = TypeBuilder::new("NotImplementedType", PyTypeFlags::empty());
            not_implemented::extend_slots(&mut b.slots);
            b.build()
        };
        let cell_type = TypeBuilder::new("cell", PyTypeFlags::empty()).build();
        let code_type = TypeBuilder::new("code", PyTypeFlags::empty()).build();
        let function_type = {
            let mut b = TypeBuilder::new("function", PyTypeFlags::empty());
            function::extend_slots(&mut b.slots);
            b.build()
        };
        let builtin_function_type = {
            let mut b = TypeBuilder::new("builtin_function_or_method", PyTypeFlags::empty());
            builtin_function::extend_slots(&mut b.slots);
            b.build()
        };
        let module_type = {
            let mut b = TypeBuilder::new("module", PyTypeFlags::empty());
            module::extend_slots(&mut b.slots);
            b.build()
        };
        let frame_type = TypeBuilder::new("frame", PyTypeFlags::empty()).build();
        let type_type = {
            let mut b = TypeBuilder::new("type", PyTypeFlags::BASETYPE);
            type_obj::extend_slots(&mut b.slots);
            b.build()
        };

        Self {
            int_type,
            float_type,
            bool_type,
            str_type,
            bytes_type,
            tuple_type,
            list_type,
            dict_type,
            none_type,
            not_implemented_type,
            cell_type,
            code_type,
            function_type,
            builtin_function_type,
            module_type,
            frame_type,
            type_type,
        }
    }

    /// `typeOf(value)`, spec §4.A: map a value's discriminant to its
    /// pre-registered `Type`.
    pub fn type_of(&self, value: &crate::value::Value) -> PyTypeRef {
        use crate::value::Value::*;
        match value {
            Int(_) => self.int_type.clone(),
            Float(_) => self.float_type.clone(),
            Bool(_) => self.bool_type.clone(),
            Str(_) => self.str_type.clone(),
            Bytes(_) => self.bytes_type.clone(),
            Tuple(_) => self.tuple_type.clone(),
            List(_) => self.list_type.clone(),
            Dict(_) => self.dict_type.clone(),
            None => self.none_type.clone(),
            NotImplemented => self.not_implemented_type.clone(),
            Cell(_) => self.cell_type.clone(),
            Code(_) => self.code_type.clone(),
            Function(_) => self.function_type.clone(),
            BuiltinFunction(_) => self.builtin_function_type.clone(),
            Module(_) => self.module_type.clone(),
            Frame(_) => self.frame_type.clone(),
            Type(_) => self.type_type.clone(),
        }
    }
}

impl Default for TypeZoo {
    fn default() -> Self {
        Self::new()
    }
}

/// Used by tests and by [`PyType::is_subtype_of`] callers who need a
/// throwaway leaf type without wiring a builtin.
#[cfg(test)]
pub fn test_leaf_type(name: &str, base: PyTypeRef) -> PyTypeRef {
    TypeBuilder::new(name.to_owned(), PyTypeFlags::empty())
        .base(base)
        .build()
}
