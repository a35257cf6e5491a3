//! Per-simulant dynamic attribute store with typed defaults.
//!
//! Dispatchers and facets attach new typed fields to a simulant without
//! modifying a closed schema: each declares [`FieldDefault`]s that are merged
//! into the owning simulant's xtension at creation. Reads fall back from the
//! instance map to the nearest default; writes are checked against the
//! default's declared kind.
//!
//! # Invariants
//! - A failed `set` leaves the store unchanged.
//! - Defaults are only ever merged, never written through by `set`.

use crate::error::KernelError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tableau_common::{Address, Value};
use glam::Vec2;

/// A default field declared by a dispatcher or facet's static schema.
///
/// The default's value doubles as its declared kind for type checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefault {
    pub name: String,
    pub value: Value,
}

impl FieldDefault {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Dynamic field bag: instance fields over declared defaults.
///
/// BTreeMap at both levels for deterministic iteration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Xtension {
    fields: BTreeMap<String, Value>,
    defaults: BTreeMap<String, Value>,
}

impl Xtension {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with declared defaults. Later declarations win,
    /// which lets a facet specialize a dispatcher-declared default.
    pub fn with_defaults<I>(defaults: I) -> Self
    where
        I: IntoIterator<Item = FieldDefault>,
    {
        let mut xtension = Self::new();
        xtension.merge_defaults(defaults);
        xtension
    }

    /// Merge additional declared defaults (later declarations win).
    pub fn merge_defaults<I>(&mut self, defaults: I)
    where
        I: IntoIterator<Item = FieldDefault>,
    {
        for default in defaults {
            self.defaults.insert(default.name, default.value);
        }
    }

    /// Read a field: instance value, else declared default, else an error.
    pub fn get(&self, name: &str) -> Result<&Value, KernelError> {
        self.fields
            .get(name)
            .or_else(|| self.defaults.get(name))
            .ok_or_else(|| KernelError::FieldNotFound(name.to_string()))
    }

    /// Write a field.
    ///
    /// When a default declares the field, the value's kind must agree with
    /// the declared kind. A brand-new field not backed by any default is
    /// permitted and simply inserted (keeps the store usable for
    /// editor-defined ad hoc data).
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Result<(), KernelError> {
        let name = name.into();
        if let Some(default) = self.defaults.get(&name) {
            if default.kind() != value.kind() {
                return Err(KernelError::TypeMismatch {
                    field: name,
                    expected: default.kind(),
                    actual: value.kind(),
                });
            }
        }
        self.fields.insert(name, value);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name) || self.defaults.contains_key(name)
    }

    /// Names visible through this store (instance fields and defaults).
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.defaults
            .keys()
            .chain(self.fields.keys())
            .map(String::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, KernelError> {
        let value = self.get(name)?;
        value.as_bool().ok_or_else(|| KernelError::TypeMismatch {
            field: name.to_string(),
            expected: tableau_common::ValueKind::Bool,
            actual: value.kind(),
        })
    }

    pub fn get_int(&self, name: &str) -> Result<i64, KernelError> {
        let value = self.get(name)?;
        value.as_int().ok_or_else(|| KernelError::TypeMismatch {
            field: name.to_string(),
            expected: tableau_common::ValueKind::Int,
            actual: value.kind(),
        })
    }

    pub fn get_float(&self, name: &str) -> Result<f32, KernelError> {
        let value = self.get(name)?;
        value.as_float().ok_or_else(|| KernelError::TypeMismatch {
            field: name.to_string(),
            expected: tableau_common::ValueKind::Float,
            actual: value.kind(),
        })
    }

    pub fn get_string(&self, name: &str) -> Result<&str, KernelError> {
        let value = self.get(name)?;
        value.as_str().ok_or_else(|| KernelError::TypeMismatch {
            field: name.to_string(),
            expected: tableau_common::ValueKind::String,
            actual: value.kind(),
        })
    }

    pub fn get_vector2(&self, name: &str) -> Result<Vec2, KernelError> {
        let value = self.get(name)?;
        value.as_vector2().ok_or_else(|| KernelError::TypeMismatch {
            field: name.to_string(),
            expected: tableau_common::ValueKind::Vector2,
            actual: value.kind(),
        })
    }

    pub fn get_address(&self, name: &str) -> Result<&Address, KernelError> {
        let value = self.get(name)?;
        value.as_address().ok_or_else(|| KernelError::TypeMismatch {
            field: name.to_string(),
            expected: tableau_common::ValueKind::Address,
            actual: value.kind(),
        })
    }
}
