//! Keyframe animation data model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use nodeflow_api_core::{Value, ValueKind};

/// 2D vector used for transition control points (normalized 0..1 domain).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

/// Per-keyframe transitions: control points for cubic-bezier timing.
/// Use `in` (arrival to this point) and `out` (departure from this point).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Transitions {
    #[serde(default)]
    #[serde(rename = "in")]
    pub r#in: Option<Vec2>,
    #[serde(default)]
    #[serde(rename = "out")]
    pub r#out: Option<Vec2>,
}

impl Transitions {
    /// Straight-line timing on both sides.
    pub fn linear() -> Self {
        Transitions {
            r#in: Some(Vec2 { x: 1.0, y: 1.0 }),
            r#out: Some(Vec2 { x: 0.0, y: 0.0 }),
        }
    }
}

/// A single keyframe, stamped in seconds.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Keyframe {
    pub time: f32,
    pub value: Value,
    #[serde(default)]
    pub transitions: Option<Transitions>,
}

impl Keyframe {
    pub fn new(time: f32, value: Value) -> Self {
        Keyframe {
            time,
            value,
            transitions: None,
        }
    }

    pub fn linear(time: f32, value: Value) -> Self {
        Keyframe {
            time,
            value,
            transitions: Some(Transitions::linear()),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum AnimationError {
    #[error("keyframe time must be finite and non-negative, got {0}")]
    InvalidTime(f32),
    #[error("keyframe times must be non-decreasing ({prev} then {next})")]
    Unordered { prev: f32, next: f32 },
    #[error("keyframe value kind {found:?} does not match animation kind {expected:?}")]
    KindMismatch { expected: ValueKind, found: ValueKind },
}

/// An animation curve bound to a property.
///
/// When `use_global_clock` is false the curve is sampled on the owner's local
/// clock (`time - start`), otherwise on the frame clock directly.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct KeyframeAnimation {
    pub keyframes: Vec<Keyframe>,
    #[serde(default)]
    pub use_global_clock: bool,
}

impl KeyframeAnimation {
    pub fn new(keyframes: Vec<Keyframe>) -> Self {
        KeyframeAnimation {
            keyframes,
            use_global_clock: false,
        }
    }

    pub fn global(mut self) -> Self {
        self.use_global_clock = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Time of the last keyframe, or zero for an empty curve.
    pub fn duration(&self) -> f32 {
        self.keyframes.last().map(|k| k.time).unwrap_or(0.0)
    }

    /// Validate ordering and kind homogeneity.
    pub fn validate(&self) -> Result<(), AnimationError> {
        let mut last = 0.0f32;
        let kind = self.keyframes.first().map(|k| k.value.kind());
        for key in &self.keyframes {
            if !key.time.is_finite() || key.time < 0.0 {
                return Err(AnimationError::InvalidTime(key.time));
            }
            if key.time < last {
                return Err(AnimationError::Unordered {
                    prev: last,
                    next: key.time,
                });
            }
            last = key.time;
            if let Some(expected) = kind {
                let found = key.value.kind();
                if found != expected {
                    return Err(AnimationError::KindMismatch { expected, found });
                }
            }
        }
        Ok(())
    }
}
