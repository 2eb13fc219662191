//! Keyframe sampling.
//!
//! Model:
//! - Keyframes are ordered by `time` (seconds).
//! - Segment [Ki -> K(i+1)] timing is a cubic-bezier determined by:
//!   cp0 = Ki.transitions.out or default {x:0.42, y:0.0}
//!   cp1 = K(i+1).transitions.in or default {x:0.58, y:1.0}
//! - Bool/Text kinds hold the left keyframe (step).
//! - Before the first keyframe the first value holds, after the last the last value holds.

use crate::data::{Keyframe, KeyframeAnimation};
use crate::interp::functions::{bezier_value, step_value};
use nodeflow_api_core::{Value, ValueKind};

const DEFAULT_OUT_X: f32 = 0.42;
const DEFAULT_OUT_Y: f32 = 0.0;
const DEFAULT_IN_X: f32 = 0.58;
const DEFAULT_IN_Y: f32 = 1.0;

/// Find the segment [i, i+1] containing `time`, returning (i, i+1, local_t) with
/// local_t normalized to [0, 1]. Outside the keyed range both indices are equal.
fn find_segment(keys: &[Keyframe], time: f32) -> (usize, usize, f32) {
    let n = keys.len();
    if n <= 1 || time <= keys[0].time {
        return (0, 0, 0.0);
    }
    if time >= keys[n - 1].time {
        return (n - 1, n - 1, 0.0);
    }
    // First keyframe strictly after `time`; the range checks above keep it in 1..n.
    let next = keys.partition_point(|k| k.time <= time);
    let (i0, i1) = (next - 1, next);
    let t0 = keys[i0].time;
    let t1 = keys[i1].time;
    let denom = (t1 - t0).max(f32::EPSILON);
    (i0, i1, ((time - t0) / denom).clamp(0.0, 1.0))
}

/// Sample an animation at `time` seconds. Returns `None` for an empty curve so
/// callers can fall back to a static value.
pub fn sample(animation: &KeyframeAnimation, time: f32) -> Option<Value> {
    let keys = &animation.keyframes;
    match keys.len() {
        0 => None,
        1 => Some(keys[0].value.clone()),
        _ => {
            let (i0, i1, lt) = find_segment(keys, time);
            if i0 == i1 {
                return Some(keys[i0].value.clone());
            }
            let left = &keys[i0];
            let right = &keys[i1];

            if matches!(left.value.kind(), ValueKind::Bool | ValueKind::Text) {
                return Some(step_value(&left.value));
            }

            let (x1, y1) = left
                .transitions
                .as_ref()
                .and_then(|t| t.r#out.as_ref())
                .map(|v| (v.x, v.y))
                .unwrap_or((DEFAULT_OUT_X, DEFAULT_OUT_Y));

            let (x2, y2) = right
                .transitions
                .as_ref()
                .and_then(|t| t.r#in.as_ref())
                .map(|v| (v.x, v.y))
                .unwrap_or((DEFAULT_IN_X, DEFAULT_IN_Y));

            Some(bezier_value(&left.value, &right.value, lt, [x1, y1, x2, y2]))
        }
    }
}

/// Sample on the right clock: global `time` or local `time - start`.
pub fn sample_at_clock(animation: &KeyframeAnimation, time: f32, start: f32) -> Option<Value> {
    if animation.use_global_clock {
        sample(animation, time)
    } else {
        sample(animation, time - start)
    }
}
