use crate::address::Address;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dynamically-typed attribute value stored in a simulant's xtension.
///
/// A closed tagged variant rather than an open `Any`: dispatchers and facets
/// declare defaults in these kinds, and writes are checked against the
/// declared kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f32),
    String(String),
    Vector2(Vec2),
    Address(Address),
    /// Opaque payload for editor-defined ad hoc data.
    Json(serde_json::Value),
}

/// The runtime tag of a [`Value`], used for type-mismatch checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    String,
    Vector2,
    Address,
    Json,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Vector2(_) => ValueKind::Vector2,
            Value::Address(_) => ValueKind::Address,
            Value::Json(_) => ValueKind::Json,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_vector2(&self) -> Option<Vec2> {
        match self {
            Value::Vector2(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<&Address> {
        match self {
            Value::Address(a) => Some(a),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Vector2 => "vector2",
            ValueKind::Address => "address",
            ValueKind::Json => "json",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => f.write_str(s),
            Value::Vector2(v) => write!(f, "({}, {})", v.x, v.y),
            Value::Address(a) => write!(f, "{a}"),
            Value::Json(j) => write!(f, "{j}"),
        }
    }
}
