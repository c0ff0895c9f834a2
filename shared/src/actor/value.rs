use std::fmt;

use crate::math::{Color, Quat, Vec3};

/// The kinds a field can hold
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Float,
    Vec3,
    Quat,
    Str,
    Color,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Bool => "bool",
            ValueKind::Float => "float",
            ValueKind::Vec3 => "vector3",
            ValueKind::Quat => "quaternion",
            ValueKind::Str => "string",
            ValueKind::Color => "color",
        };
        f.write_str(name)
    }
}

/// An owned field value
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Float(f32),
    Vec3(Vec3),
    Quat(Quat),
    Str(String),
    Color(Color),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Float(_) => ValueKind::Float,
            Value::Vec3(_) => ValueKind::Vec3,
            Value::Quat(_) => ValueKind::Quat,
            Value::Str(_) => ValueKind::Str,
            Value::Color(_) => ValueKind::Color,
        }
    }

    /// False for NaN or infinite components, which the structured encoding
    /// cannot represent
    pub fn is_finite(&self) -> bool {
        match self {
            Value::Bool(_) | Value::Str(_) => true,
            Value::Float(value) => value.is_finite(),
            Value::Vec3(value) => value.is_finite(),
            Value::Quat(value) => value.is_finite(),
            Value::Color(value) => value.is_finite(),
        }
    }

    /// The value handed back when a lookup fails. Identity for rotations,
    /// transparent black for colors.
    pub fn zero(kind: ValueKind) -> Value {
        match kind {
            ValueKind::Bool => Value::Bool(false),
            ValueKind::Float => Value::Float(0.0),
            ValueKind::Vec3 => Value::Vec3(Vec3::ZERO),
            ValueKind::Quat => Value::Quat(Quat::IDENTITY),
            ValueKind::Str => Value::Str(String::new()),
            ValueKind::Color => Value::Color(Color::CLEAR),
        }
    }
}

/// Borrowed view of one field, produced by the field table without copying
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldRef<'a> {
    Bool(&'a bool),
    Float(&'a f32),
    Vec3(&'a Vec3),
    Quat(&'a Quat),
    Str(&'a str),
    Color(&'a Color),
}

impl<'a> FieldRef<'a> {
    pub fn kind(&self) -> ValueKind {
        match self {
            FieldRef::Bool(_) => ValueKind::Bool,
            FieldRef::Float(_) => ValueKind::Float,
            FieldRef::Vec3(_) => ValueKind::Vec3,
            FieldRef::Quat(_) => ValueKind::Quat,
            FieldRef::Str(_) => ValueKind::Str,
            FieldRef::Color(_) => ValueKind::Color,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            FieldRef::Bool(value) => Value::Bool(**value),
            FieldRef::Float(value) => Value::Float(**value),
            FieldRef::Vec3(value) => Value::Vec3(**value),
            FieldRef::Quat(value) => Value::Quat(**value),
            FieldRef::Str(value) => Value::Str((*value).to_string()),
            FieldRef::Color(value) => Value::Color(**value),
        }
    }
}

/// Mutable view of one field
pub enum FieldMut<'a> {
    Bool(&'a mut bool),
    Float(&'a mut f32),
    Vec3(&'a mut Vec3),
    Quat(&'a mut Quat),
    Str(&'a mut String),
    Color(&'a mut Color),
}

impl<'a> FieldMut<'a> {
    pub fn kind(&self) -> ValueKind {
        match self {
            FieldMut::Bool(_) => ValueKind::Bool,
            FieldMut::Float(_) => ValueKind::Float,
            FieldMut::Vec3(_) => ValueKind::Vec3,
            FieldMut::Quat(_) => ValueKind::Quat,
            FieldMut::Str(_) => ValueKind::Str,
            FieldMut::Color(_) => ValueKind::Color,
        }
    }
}
