use nodeflow_animation_core::{
    sample, sample_at_clock, AnimationError, Keyframe, KeyframeAnimation, Transitions, Vec2,
};
use nodeflow_api_core::Value;

fn approx(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

fn scalar(v: Option<Value>) -> f32 {
    match v {
        Some(Value::Float(f)) => f,
        other => panic!("expected float sample, got {other:?}"),
    }
}

fn linear_ramp() -> KeyframeAnimation {
    KeyframeAnimation::new(vec![
        Keyframe::linear(0.0, Value::Float(0.0)),
        Keyframe::linear(2.0, Value::Float(10.0)),
    ])
}

#[test]
fn empty_animation_yields_nothing() {
    let anim = KeyframeAnimation::default();
    assert!(sample(&anim, 1.0).is_none());
}

#[test]
fn linear_ramp_interpolates_and_clamps() {
    let anim = linear_ramp();
    approx(scalar(sample(&anim, -1.0)), 0.0, 1e-6);
    approx(scalar(sample(&anim, 1.0)), 5.0, 1e-4);
    approx(scalar(sample(&anim, 0.5)), 2.5, 1e-4);
    approx(scalar(sample(&anim, 5.0)), 10.0, 1e-6);
}

#[test]
fn default_easing_is_symmetric_ease_in_out() {
    let anim = KeyframeAnimation::new(vec![
        Keyframe::new(0.0, Value::Float(0.0)),
        Keyframe::new(1.0, Value::Float(1.0)),
    ]);
    approx(scalar(sample(&anim, 0.5)), 0.5, 1e-3);
    assert!(scalar(sample(&anim, 0.25)) < 0.25);
}

#[test]
fn custom_transitions_shape_the_segment() {
    let anim = KeyframeAnimation::new(vec![
        Keyframe {
            time: 0.0,
            value: Value::Float(0.0),
            transitions: Some(Transitions {
                r#in: None,
                r#out: Some(Vec2 { x: 0.0, y: 1.0 }),
            }),
        },
        Keyframe {
            time: 1.0,
            value: Value::Float(1.0),
            transitions: Some(Transitions {
                r#in: Some(Vec2 { x: 0.0, y: 1.0 }),
                r#out: None,
            }),
        },
    ]);
    assert!(scalar(sample(&anim, 0.25)) > 0.25);
}

#[test]
fn text_and_bool_step() {
    let anim = KeyframeAnimation::new(vec![
        Keyframe::linear(0.0, Value::Bool(false)),
        Keyframe::linear(1.0, Value::Bool(true)),
    ]);
    assert_eq!(sample(&anim, 0.99), Some(Value::Bool(false)));
    assert_eq!(sample(&anim, 1.0), Some(Value::Bool(true)));
}

#[test]
fn local_clock_subtracts_start() {
    let anim = linear_ramp();
    approx(scalar(sample_at_clock(&anim, 3.0, 2.0)), 5.0, 1e-4);

    let global = linear_ramp().global();
    approx(scalar(sample_at_clock(&global, 1.0, 2.0)), 5.0, 1e-4);
}

#[test]
fn validation_rejects_unordered_and_mixed_kinds() {
    let unordered = KeyframeAnimation::new(vec![
        Keyframe::new(1.0, Value::Float(0.0)),
        Keyframe::new(0.5, Value::Float(1.0)),
    ]);
    assert!(matches!(
        unordered.validate(),
        Err(AnimationError::Unordered { .. })
    ));

    let mixed = KeyframeAnimation::new(vec![
        Keyframe::new(0.0, Value::Float(0.0)),
        Keyframe::new(1.0, Value::Bool(true)),
    ]);
    assert!(matches!(
        mixed.validate(),
        Err(AnimationError::KindMismatch { .. })
    ));

    assert!(linear_ramp().validate().is_ok());
}

#[test]
fn animation_json_roundtrip() {
    let anim = linear_ramp().global();
    let json = serde_json::to_string(&anim).expect("serialize");
    let back: KeyframeAnimation = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(anim, back);
}
