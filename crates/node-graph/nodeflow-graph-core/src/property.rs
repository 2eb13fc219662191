//! Property adapters: the static-or-animated value source behind an item.

use nodeflow_animation_core::{sample_at_clock, KeyframeAnimation};
use nodeflow_api_core::coercion::accept_number;
use nodeflow_api_core::json::parse_value;
use nodeflow_api_core::{Value, ValueKind};
use serde::{de, Deserialize, Deserializer, Serialize};

/// Backing store for a property-bound item.
///
/// `value` is what a setter last wrote; when `animation` is present and non-empty it
/// takes precedence and is sampled at the frame clock instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyAdapter {
    #[serde(deserialize_with = "value_or_shorthand")]
    default: Value,
    #[serde(deserialize_with = "value_or_shorthand")]
    value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    animation: Option<KeyframeAnimation>,
}

/// Documents may spell values as `1.5`, `[1, 2]` or `{"size": [1, 2]}`.
fn value_or_shorthand<'de, D>(deserializer: D) -> Result<Value, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    parse_value(raw).map_err(de::Error::custom)
}

impl PropertyAdapter {
    pub fn new(default: Value) -> Self {
        PropertyAdapter {
            value: default.clone(),
            default,
            animation: None,
        }
    }

    pub fn default_value(&self) -> &Value {
        &self.default
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn set_value(&mut self, value: Value) {
        self.value = value;
    }

    pub fn animation(&self) -> Option<&KeyframeAnimation> {
        self.animation.as_ref()
    }

    pub fn set_animation(&mut self, animation: Option<KeyframeAnimation>) {
        self.animation = animation;
    }

    pub fn is_animated(&self) -> bool {
        self.animation.as_ref().is_some_and(|a| !a.is_empty())
    }

    /// Restore the setter value to the default and drop any animation.
    pub fn reset(&mut self) {
        self.value = self.default.clone();
        self.animation = None;
    }

    /// Current value at `time`, sampled on the owner's clock starting at `start`.
    /// Samples are coerced into `kind`; a sample that cannot be coerced yields the default.
    pub fn load(&self, kind: ValueKind, time: f32, start: f32) -> Value {
        let sampled = self
            .animation
            .as_ref()
            .and_then(|anim| sample_at_clock(anim, time, start));
        match sampled {
            Some(v) => accept_number(kind, &v).unwrap_or_else(|| self.default.clone()),
            None => self.value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodeflow_animation_core::Keyframe;

    #[test]
    fn static_value_without_animation() {
        let mut adapter = PropertyAdapter::new(Value::Float(1.0));
        adapter.set_value(Value::Float(3.0));
        assert_eq!(adapter.load(ValueKind::Float, 10.0, 0.0), Value::Float(3.0));
        adapter.reset();
        assert_eq!(adapter.value(), &Value::Float(1.0));
    }

    #[test]
    fn animation_overrides_setter_and_uses_local_clock() {
        let mut adapter = PropertyAdapter::new(Value::Float(0.0));
        adapter.set_value(Value::Float(99.0));
        adapter.set_animation(Some(KeyframeAnimation::new(vec![
            Keyframe::linear(0.0, Value::Float(0.0)),
            Keyframe::linear(1.0, Value::Float(10.0)),
        ])));
        assert!(adapter.is_animated());
        match adapter.load(ValueKind::Float, 1.5, 1.0) {
            Value::Float(v) => assert!((v - 5.0).abs() < 1e-4),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn shorthand_values_deserialize() {
        let adapter: PropertyAdapter =
            serde_json::from_str(r#"{ "default": { "size": [1, 2] }, "value": [3.0, 4.0] }"#)
                .unwrap();
        assert_eq!(adapter.default_value(), &Value::Size([1.0, 2.0]));
        assert_eq!(adapter.value(), &Value::Vec2([3.0, 4.0]));

        let canonical = serde_json::to_string(&adapter).unwrap();
        let back: PropertyAdapter = serde_json::from_str(&canonical).unwrap();
        assert_eq!(back, adapter);
    }

    #[test]
    fn animated_number_broadcasts_into_geometry() {
        let mut adapter = PropertyAdapter::new(Value::Size([1.0, 1.0]));
        adapter.set_animation(Some(KeyframeAnimation::new(vec![Keyframe::new(
            0.0,
            Value::Float(4.0),
        )])));
        assert_eq!(
            adapter.load(ValueKind::Size, 0.0, 0.0),
            Value::Size([4.0, 4.0])
        );
    }
}
