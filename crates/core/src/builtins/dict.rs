//! `dict`: an ordered mapping, key-insertion ordered (spec §4.E/§8
//! "Dict ordering"), backed by `indexmap::IndexMap` so iteration order
//! equals insertion order and `shift_remove` keeps it that way after a
//! deletion.

use indexmap::IndexMap;

use crate::error::{PyException, PyResult};
use crate::types::PyTypeSlots;
use crate::value::{value_hash, DictKey, Value};
use crate::vm::Vm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// New keys overwrite existing ones (`dict.update`-style).
    Put,
    /// New keys are only inserted if absent.
    IfAbsent,
    /// A duplicate key is an error (`BUILD_MAP_UNPACK_WITH_CALL`/
    /// `CALL_FUNCTION_EX`'s duplicate-keyword-argument check).
    Unique,
}

#[derive(Debug, Clone, Default)]
pub struct PyDict {
    entries: IndexMap<DictKey, Value>,
}

impl PyDict {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> PyResult<Option<Value>> {
        value_hash(key)?;
        Ok(self.entries.get(&DictKey(key.clone())).cloned())
    }

    pub fn insert(&mut self, key: Value, value: Value) -> PyResult<()> {
        value_hash(&key)?;
        self.entries.insert(DictKey(key), value);
        Ok(())
    }

    /// Convenience used by the VM to seed builtins/globals with
    /// identifier keys without threading a `PyResult` through call sites
    /// that know, statically, that `&str` is always hashable.
    pub fn insert_str(&mut self, key: &str, value: Value) {
        self.entries.insert(DictKey(Value::str(key)), value);
    }

    pub fn remove(&mut self, key: &Value) -> PyResult<Option<Value>> {
        value_hash(key)?;
        Ok(self.entries.shift_remove(&DictKey(key.clone())))
    }

    pub fn contains_key(&self, key: &Value) -> PyResult<bool> {
        value_hash(key)?;
        Ok(self.entries.contains_key(&DictKey(key.clone())))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (&k.0, v))
    }

    /// `merge(src, mode)`, spec §4.E: order-preserving on new keys;
    /// `Unique` raises `KeyError` on the first duplicate, leaving
    /// entries inserted before the duplicate in place (matches CPython's
    /// `dict_merge` partial-effect-on-error behavior).
    pub fn merge(&mut self, src: &PyDict, mode: MergeMode) -> PyResult<()> {
        for (key, value) in src.iter() {
            let present = self.entries.contains_key(&DictKey(key.clone()));
            match mode {
                MergeMode::Put => {
                    self.entries.insert(DictKey(key.clone()), value.clone());
                }
                MergeMode::IfAbsent => {
                    if !present {
                        self.entries.insert(DictKey(key.clone()), value.clone());
                    }
                }
                MergeMode::Unique => {
                    if present {
                        return Err(PyException::KeyError(format!("{key:?}")));
                    }
                    self.entries.insert(DictKey(key.clone()), value.clone());
                }
            }
        }
        Ok(())
    }
}

fn mp_length(zelf: &Value, _vm: &Vm) -> PyResult<usize> {
    match zelf {
        Value::Dict(d) => Ok(d.borrow().len()),
        other => Err(PyException::TypeError(format!(
            "expected dict, got '{}'",
            other.type_name()
        ))),
    }
}

fn mp_subscript(zelf: &Value, key: &Value, vm: &Vm) -> PyResult<Value> {
    match zelf {
        Value::Dict(d) => d
            .borrow()
            .get(key)?
            .ok_or_else(|| PyException::KeyError(vm_repr(key, vm))),
        other => Err(PyException::TypeError(format!(
            "expected dict, got '{}'",
            other.type_name()
        ))),
    }
}

fn mp_ass_subscript(zelf: &Value, key: &Value, value: Value, _vm: &Vm) -> PyResult<()> {
    match zelf {
        Value::Dict(d) => d.borrow_mut().insert(key.clone(), value),
        other => Err(PyException::TypeError(format!(
            "expected dict, got '{}'",
            other.type_name()
        ))),
    }
}

fn mp_delitem(zelf: &Value, key: &Value, vm: &Vm) -> PyResult<()> {
    match zelf {
        Value::Dict(d) => {
            let removed = d.borrow_mut().remove(key)?;
            if removed.is_none() {
                return Err(PyException::KeyError(vm_repr(key, vm)));
            }
            Ok(())
        }
        other => Err(PyException::TypeError(format!(
            "expected dict, got '{}'",
            other.type_name()
        ))),
    }
}

fn vm_repr(key: &Value, vm: &Vm) -> String {
    crate::ops::repr(vm, key).unwrap_or_else(|_| "?".to_owned())
}

pub fn extend_slots(slots: &mut PyTypeSlots) {
    slots.as_mapping.length = Some(mp_length);
    slots.as_mapping.subscript = Some(mp_subscript);
    slots.as_mapping.ass_subscript = Some(mp_ass_subscript);
    slots.as_mapping.del_item = Some(mp_delitem);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let mut d = PyDict::new();
        d.insert(Value::str("b"), Value::int(2)).unwrap();
        d.insert(Value::str("a"), Value::int(1)).unwrap();
        let keys: Vec<_> = d.iter().map(|(k, _)| k.clone()).collect();
        assert!(matches!(&keys[0], Value::Str(s) if &**s == "b"));
        assert!(matches!(&keys[1], Value::Str(s) if &**s == "a"));
    }

    #[test]
    fn merge_unique_rejects_duplicate() {
        let mut a = PyDict::new();
        a.insert(Value::str("x"), Value::int(1)).unwrap();
        let mut b = PyDict::new();
        b.insert(Value::str("x"), Value::int(2)).unwrap();
        let err = a.merge(&b, MergeMode::Unique).unwrap_err();
        assert!(matches!(err, PyException::KeyError(_)));
    }

    #[test]
    fn merge_if_absent_keeps_existing() {
        let mut a = PyDict::new();
        a.insert(Value::str("x"), Value::int(1)).unwrap();
        let mut b = PyDict::new();
        b.insert(Value::str("x"), Value::int(2)).unwrap();
        a.merge(&b, MergeMode::IfAbsent).unwrap();
        assert!(matches!(a.get(&Value::str("x")).unwrap(), Some(Value::Int(n)) if n == malachite_bigint::BigInt::from(1)));
    }
}
