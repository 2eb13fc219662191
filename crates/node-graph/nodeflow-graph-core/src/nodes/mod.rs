//! Builtin node types.
//!
//! - [`ValueNode`] (`value`) outputs its `value` property.
//! - [`AddNode`] (`add`) adds two floats.
//! - [`SumNode`] (`sum`) adds every value connected to its list input.
//! - [`TimeNode`] (`time`) outputs the frame clock.
//! - [`RectShapeNode`] (`shape.rect`) turns a size into a rect drawable.
//! - [`OutputNode`] (`output`) hands its input to the host as a drawable.

mod math;
mod shape;
mod sources;

pub use math::{AddNode, SumNode};
pub use shape::{OutputNode, RectShapeNode};
pub use sources::{TimeNode, ValueNode};

use crate::group::{GroupInputNode, GroupOutputNode, NodeGroup, GROUP_INPUT_TAG, GROUP_OUTPUT_TAG, GROUP_TAG};
use crate::registry::NodeRegistry;

pub fn register_builtins(registry: &mut NodeRegistry) {
    registry.register(sources::VALUE_TAG, || Box::new(ValueNode::default()));
    registry.register(sources::TIME_TAG, || Box::new(TimeNode::default()));
    registry.register(math::ADD_TAG, || Box::new(AddNode::default()));
    registry.register(math::SUM_TAG, || Box::new(SumNode::default()));
    registry.register(shape::RECT_TAG, || Box::new(RectShapeNode::default()));
    registry.register(shape::OUTPUT_TAG, || Box::new(OutputNode::default()));
    registry.register(GROUP_TAG, || Box::new(NodeGroup::new()));
    registry.register(GROUP_INPUT_TAG, || Box::new(GroupInputNode));
    registry.register(GROUP_OUTPUT_TAG, || Box::new(GroupOutputNode));
}
