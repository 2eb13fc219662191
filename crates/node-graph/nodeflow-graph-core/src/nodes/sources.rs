use crate::context::{Frame, NodeScope};
use crate::node::NodeBehavior;
use crate::socket::{ItemBuilder, OutputSocket, PropertyItem};

pub(crate) const VALUE_TAG: &str = "value";
pub(crate) const TIME_TAG: &str = "time";

/// Constant (or animated) float source.
#[derive(Debug, Default)]
pub struct ValueNode {
    value: PropertyItem<f32>,
    out: OutputSocket<f32>,
}

impl NodeBehavior for ValueNode {
    fn type_tag(&self) -> &'static str {
        VALUE_TAG
    }

    fn build_items(&mut self, items: &mut ItemBuilder<'_>) {
        self.value = items.property("value", 0.0f32);
        self.out = items.output("out");
    }

    fn evaluate(&mut self, scope: &mut NodeScope<'_>, _frame: &mut Frame<'_>) -> anyhow::Result<()> {
        let value = scope.property(&self.value).unwrap_or_default();
        scope.set(&self.out, value);
        Ok(())
    }
}

/// Frame clock source, optionally on the owner's local clock.
#[derive(Debug, Default)]
pub struct TimeNode {
    local: PropertyItem<bool>,
    out: OutputSocket<f32>,
}

impl NodeBehavior for TimeNode {
    fn type_tag(&self) -> &'static str {
        TIME_TAG
    }

    fn build_items(&mut self, items: &mut ItemBuilder<'_>) {
        self.local = items.property("local", false);
        self.out = items.output("out");
    }

    fn evaluate(&mut self, scope: &mut NodeScope<'_>, frame: &mut Frame<'_>) -> anyhow::Result<()> {
        let t = if scope.property(&self.local).unwrap_or(false) {
            frame.time - frame.start
        } else {
            frame.time
        };
        scope.set(&self.out, t);
        Ok(())
    }
}
