//! nodeflow-animation-core (engine-agnostic)
//!
//! Keyframe curves that drive node properties. The graph engine samples a
//! property's [`KeyframeAnimation`] at the frame clock during PreEvaluate.

pub mod data;
pub mod interp;
pub mod sampling;

pub use data::{AnimationError, Keyframe, KeyframeAnimation, Transitions, Vec2};
pub use sampling::{sample, sample_at_clock};
