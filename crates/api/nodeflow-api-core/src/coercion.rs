//! Coercion helpers between Value kinds.
//!
//! Sockets only store values of their declared kind. When an upstream producer
//! emits something else, the receiving socket asks a receiver to convert it;
//! [`accept_number`] is the default receiver: numeric conversion between
//! `Float`/`Int`, scalar broadcasting into geometry kinds, reinterpretation
//! between same-arity geometry kinds, and text parsing (`"1, 2"`).

use crate::{Value, ValueKind};

/// Extract a plain number from numeric values. Bool and text are not numbers.
pub fn to_number(v: &Value) -> Option<f64> {
    match v {
        Value::Float(f) => Some(*f as f64),
        Value::Int(i) => Some(*i as f64),
        _ => None,
    }
}

/// Convert a Value into a Vec<f32> (generic vector).
/// - fixed-size kinds -> their components
/// - Float/Int -> single-element vec
/// - Bool -> single 0/1
/// - List -> flattened elements
pub fn to_vector(v: &Value) -> Vec<f32> {
    match v {
        Value::Float(f) => vec![*f],
        Value::Int(i) => vec![*i as f32],
        Value::Bool(b) => vec![if *b { 1.0 } else { 0.0 }],
        Value::Vec2(a) | Value::Size(a) => a.to_vec(),
        Value::Vec3(a) => a.to_vec(),
        Value::Vec4(a) | Value::Thickness(a) | Value::Rect(a) | Value::ColorRgba(a) => a.to_vec(),
        Value::Matrix(m) => m.to_vec(),
        Value::Vector(vec) => vec.clone(),
        Value::List(items) => items.iter().flat_map(to_vector).collect(),
        Value::Text(_) => vec![],
    }
}

/// Parse comma or whitespace separated components, e.g. `"10, 20"`.
fn parse_components<const N: usize>(text: &str) -> Option<[f32; N]> {
    let mut out = [0.0f32; N];
    let mut parts = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty());
    for slot in out.iter_mut() {
        *slot = parts.next()?.trim().parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

/// Default receiver: try to turn `value` into a value of `target`.
/// Returns `None` when the value is rejected.
pub fn accept_number(target: ValueKind, value: &Value) -> Option<Value> {
    if target.accepts(value.kind()) {
        return Some(value.clone());
    }
    let number = to_number(value).map(|n| n as f32);
    match target {
        ValueKind::Float => number.map(Value::Float),
        ValueKind::Int => to_number(value).map(|n| Value::Int(n.trunc() as i64)),
        ValueKind::Vec2 | ValueKind::Size => {
            let pair = match value {
                Value::Vec2(a) | Value::Size(a) => Some(*a),
                Value::Text(s) => parse_components::<2>(s),
                _ => number.map(|n| [n, n]),
            }?;
            Some(if target == ValueKind::Vec2 {
                Value::Vec2(pair)
            } else {
                Value::Size(pair)
            })
        }
        ValueKind::Thickness => match value {
            Value::Text(s) => parse_components::<4>(s)
                .or_else(|| parse_components::<2>(s).map(|[h, v]| [h, v, h, v]))
                .map(Value::Thickness),
            _ => number.map(|n| Value::Thickness([n; 4])),
        },
        ValueKind::Rect => match value {
            Value::Size([w, h]) => Some(Value::Rect([0.0, 0.0, *w, *h])),
            Value::Text(s) => parse_components::<4>(s).map(Value::Rect),
            _ => number.map(|n| Value::Rect([n; 4])),
        },
        ValueKind::Vec3 => number.map(|n| Value::Vec3([n; 3])),
        ValueKind::Vec4 => number.map(|n| Value::Vec4([n; 4])),
        ValueKind::ColorRgba => number.map(|n| Value::ColorRgba([n, n, n, 1.0])),
        ValueKind::Matrix => number.map(|n| Value::Matrix([n, 0.0, 0.0, n, 0.0, 0.0])),
        ValueKind::Vector => match value {
            Value::Text(_) => None,
            other => Some(Value::Vector(to_vector(other))),
        },
        ValueKind::Text => number.map(|n| Value::Text(n.to_string())),
        ValueKind::Bool | ValueKind::List | ValueKind::Any => None,
    }
}

/// Whether [`accept_number`] can turn some value of kind `source` into `target`.
/// Text counts for the kinds that parse it even though a given string may not.
pub fn can_coerce(target: ValueKind, source: ValueKind) -> bool {
    use ValueKind::*;
    if target.accepts(source) || source == Any {
        return true;
    }
    let numeric = matches!(source, Float | Int);
    match target {
        Float | Int | Vec3 | Vec4 | ColorRgba | Matrix | Text => numeric,
        Vec2 | Size => numeric || matches!(source, Vec2 | Size | Text),
        Thickness => numeric || source == Text,
        Rect => numeric || matches!(source, Size | Text),
        Vector => source != Text,
        Bool | List | Any => false,
    }
}
