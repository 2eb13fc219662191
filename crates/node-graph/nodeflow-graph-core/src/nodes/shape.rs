use anyhow::bail;
use nodeflow_api_core::{Value, ValueKind};

use crate::context::{Drawable, Frame, NodeScope};
use crate::node::NodeBehavior;
use crate::socket::{InputSocket, ItemBuilder, OutputSocket, PropertyItem};

pub(crate) const RECT_TAG: &str = "shape.rect";
pub(crate) const OUTPUT_TAG: &str = "output";

/// Rect anchored at the origin. The size input accepts bare numbers, which are
/// broadcast into a square.
#[derive(Debug, Default)]
pub struct RectShapeNode {
    size: InputSocket<Value>,
    out: OutputSocket<Value>,
}

impl NodeBehavior for RectShapeNode {
    fn type_tag(&self) -> &'static str {
        RECT_TAG
    }

    fn build_items(&mut self, items: &mut ItemBuilder<'_>) {
        self.size = items.input_of("size", ValueKind::Size, Value::size(100.0, 100.0));
        self.out = items.output_of("rect", ValueKind::Rect);
    }

    fn evaluate(&mut self, scope: &mut NodeScope<'_>, frame: &mut Frame<'_>) -> anyhow::Result<()> {
        let [w, h] = match scope.input(&self.size) {
            Some(Value::Size(size)) => size,
            other => bail!("size input holds {other:?}"),
        };
        if w < 0.0 || h < 0.0 {
            bail!("negative rect size {w}x{h}");
        }
        let rect = Value::rect(0.0, 0.0, w, h);
        scope.set(&self.out, rect.clone());
        frame.emit(Drawable {
            source: scope.node_id(),
            label: RECT_TAG.to_string(),
            value: rect,
        });
        Ok(())
    }
}

/// Sink handing whatever reaches it to the host.
#[derive(Debug, Default)]
pub struct OutputNode {
    input: InputSocket<Value>,
    label: PropertyItem<String>,
}

impl NodeBehavior for OutputNode {
    fn type_tag(&self) -> &'static str {
        OUTPUT_TAG
    }

    fn build_items(&mut self, items: &mut ItemBuilder<'_>) {
        self.input = items.input("in", Value::Float(0.0));
        self.label = items.property("label", String::new());
    }

    fn evaluate(&mut self, scope: &mut NodeScope<'_>, frame: &mut Frame<'_>) -> anyhow::Result<()> {
        let Some(value) = scope.input(&self.input) else {
            return Ok(());
        };
        let label = scope.property(&self.label).unwrap_or_default();
        frame.emit(Drawable {
            source: scope.node_id(),
            label,
            value,
        });
        Ok(())
    }
}
