//! Value: runtime instances carried between sockets.
//! All floating point data uses f32; integers use i64.

use serde::{Deserialize, Serialize};

/// Declared kind of a socket or property. A socket of kind `K` stores values whose
/// [`Value::kind`] is `K`; `Any` accepts every value unchanged.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Float,
    Int,
    Bool,
    Vec2,
    Vec3,
    Vec4,
    Size,
    Thickness,
    Rect,
    ColorRgba,
    Matrix,
    Vector,
    Text,
    List,
    Any,
}

impl ValueKind {
    /// Lowercase name used in logs and documents.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Float => "float",
            ValueKind::Int => "int",
            ValueKind::Bool => "bool",
            ValueKind::Vec2 => "vec2",
            ValueKind::Vec3 => "vec3",
            ValueKind::Vec4 => "vec4",
            ValueKind::Size => "size",
            ValueKind::Thickness => "thickness",
            ValueKind::Rect => "rect",
            ValueKind::ColorRgba => "colorrgba",
            ValueKind::Matrix => "matrix",
            ValueKind::Vector => "vector",
            ValueKind::Text => "text",
            ValueKind::List => "list",
            ValueKind::Any => "any",
        }
    }

    /// True when a value of `other` can be stored without conversion.
    #[inline]
    pub fn accepts(self, other: ValueKind) -> bool {
        self == ValueKind::Any || self == other
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Value {
    /// Scalar float
    Float(f32),

    /// Signed integer
    Int(i64),

    /// Boolean (step)
    Bool(bool),

    /// 2D vector / point
    Vec2([f32; 2]),

    /// 3D vector
    Vec3([f32; 3]),

    /// 4D vector
    Vec4([f32; 4]),

    /// Width and height
    Size([f32; 2]),

    /// Left, top, right, bottom
    Thickness([f32; 4]),

    /// X, y, width, height
    Rect([f32; 4]),

    /// RGBA color (linear by convention)
    ColorRgba([f32; 4]),

    /// 2D affine matrix (m11, m12, m21, m22, dx, dy)
    Matrix([f32; 6]),

    /// Generic, variable-length numeric vector
    Vector(Vec<f32>),

    /// Text / string; step-only for interpolation
    Text(String),

    /// Ordered heterogeneous values, produced by list inputs
    List(Vec<Value>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Float(0.0)
    }
}

impl Value {
    /// Return the coarse kind of this value.
    #[inline]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Float(_) => ValueKind::Float,
            Value::Int(_) => ValueKind::Int,
            Value::Bool(_) => ValueKind::Bool,
            Value::Vec2(_) => ValueKind::Vec2,
            Value::Vec3(_) => ValueKind::Vec3,
            Value::Vec4(_) => ValueKind::Vec4,
            Value::Size(_) => ValueKind::Size,
            Value::Thickness(_) => ValueKind::Thickness,
            Value::Rect(_) => ValueKind::Rect,
            Value::ColorRgba(_) => ValueKind::ColorRgba,
            Value::Matrix(_) => ValueKind::Matrix,
            Value::Vector(_) => ValueKind::Vector,
            Value::Text(_) => ValueKind::Text,
            Value::List(_) => ValueKind::List,
        }
    }

    /// Neutral value of `kind`: zeros, false, empty text/list, identity matrix.
    pub fn default_for(kind: ValueKind) -> Value {
        match kind {
            ValueKind::Float | ValueKind::Any => Value::Float(0.0),
            ValueKind::Int => Value::Int(0),
            ValueKind::Bool => Value::Bool(false),
            ValueKind::Vec2 => Value::Vec2([0.0; 2]),
            ValueKind::Vec3 => Value::Vec3([0.0; 3]),
            ValueKind::Vec4 => Value::Vec4([0.0; 4]),
            ValueKind::Size => Value::Size([0.0; 2]),
            ValueKind::Thickness => Value::Thickness([0.0; 4]),
            ValueKind::Rect => Value::Rect([0.0; 4]),
            ValueKind::ColorRgba => Value::ColorRgba([0.0, 0.0, 0.0, 1.0]),
            ValueKind::Matrix => Value::Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]),
            ValueKind::Vector => Value::Vector(Vec::new()),
            ValueKind::Text => Value::Text(String::new()),
            ValueKind::List => Value::List(Vec::new()),
        }
    }

    /// Convenience constructors
    pub fn vec2(x: f32, y: f32) -> Self {
        Value::Vec2([x, y])
    }

    pub fn size(width: f32, height: f32) -> Self {
        Value::Size([width, height])
    }

    pub fn rect(x: f32, y: f32, width: f32, height: f32) -> Self {
        Value::Rect([x, y, width, height])
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Borrow the elements of a `List` value.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}
