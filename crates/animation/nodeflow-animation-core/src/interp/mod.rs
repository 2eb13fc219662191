//! Interpolation helpers used by keyframe sampling.

pub mod functions;
