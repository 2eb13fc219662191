//! Per-pass evaluation state.

use std::any::Any;
use std::fmt;

use nodeflow_api_core::Value;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::group::GroupState;
use crate::ids::{LocalId, NodeId, NodeKey};
use crate::socket::{
    InputSocket, ItemKind, ListInputSocket, NodeItem, OutputSocket, PropertyItem, SocketValue,
};

/// Host-side render target information. The evaluator only passes it through.
pub trait Renderer {
    /// Size of the frame being produced, in pixels.
    fn frame_size(&self) -> [f32; 2] {
        [0.0, 0.0]
    }
}

/// Renderer for hosts that have none, such as tests and headless evaluation.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {}

/// Something a node produced for the host to render.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Drawable {
    pub source: NodeId,
    pub label: String,
    pub value: Value,
}

/// Inputs from the frame driver for one evaluation pass.
pub struct Frame<'f> {
    /// Clock value for this frame, in seconds.
    pub time: f32,
    /// Start of the owner's local clock.
    pub start: f32,
    pub renderer: &'f dyn Renderer,
    pub sink: &'f mut Vec<Drawable>,
    pub(crate) depth: usize,
}

impl<'f> Frame<'f> {
    pub fn new(time: f32, renderer: &'f dyn Renderer, sink: &'f mut Vec<Drawable>) -> Self {
        Frame {
            time,
            start: 0.0,
            renderer,
            sink,
            depth: 0,
        }
    }

    pub fn with_start(mut self, start: f32) -> Self {
        self.start = start;
        self
    }

    /// Group nesting level of the graph currently being evaluated.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Frame for an inner graph, sharing clock, renderer and sink.
    pub(crate) fn nested(&mut self) -> Frame<'_> {
        Frame {
            time: self.time,
            start: self.start,
            renderer: self.renderer,
            sink: &mut *self.sink,
            depth: self.depth + 1,
        }
    }

    pub fn emit(&mut self, drawable: Drawable) {
        self.sink.push(drawable);
    }
}

/// State a node keeps between frames of one plan.
pub enum NodeState {
    Group(Box<GroupState>),
    Custom(Box<dyn Any>),
}

impl fmt::Debug for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Group(state) => f.debug_tuple("Group").field(state).finish(),
            NodeState::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// One entry of an evaluation plan. Lives from Build until Uninitialize.
#[derive(Debug)]
pub struct EvaluationContext {
    pub(crate) node: NodeKey,
    pub(crate) config: Config,
    pub state: Option<NodeState>,
}

impl EvaluationContext {
    pub(crate) fn new(node: NodeKey, config: Config) -> Self {
        EvaluationContext {
            node,
            config,
            state: None,
        }
    }

    pub fn node(&self) -> NodeKey {
        self.node
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// A node's view of its own items and cached state during one phase call.
pub struct NodeScope<'a> {
    node: NodeId,
    items: &'a mut [NodeItem],
    state: &'a mut Option<NodeState>,
    config: &'a Config,
}

impl<'a> NodeScope<'a> {
    pub(crate) fn new(
        node: NodeId,
        items: &'a mut [NodeItem],
        state: &'a mut Option<NodeState>,
        config: &'a Config,
    ) -> Self {
        NodeScope {
            node,
            items,
            state,
            config,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    pub fn items(&self) -> &[NodeItem] {
        self.items
    }

    fn item(&self, local: LocalId) -> Option<&NodeItem> {
        self.items.iter().find(|i| i.local_id == local)
    }

    pub fn value(&self, local: LocalId) -> Option<&Value> {
        self.item(local).map(|i| &i.value)
    }

    /// Overwrite an item's value. Returns false for unknown ids.
    pub fn set_value(&mut self, local: LocalId, value: Value) -> bool {
        match self.items.iter_mut().find(|i| i.local_id == local) {
            Some(item) => {
                item.value = value;
                true
            }
            None => false,
        }
    }

    pub fn input<T: SocketValue>(&self, socket: &InputSocket<T>) -> Option<T> {
        self.value(socket.local_id()).and_then(T::from_value)
    }

    pub fn property<T: SocketValue>(&self, property: &PropertyItem<T>) -> Option<T> {
        self.value(property.local_id()).and_then(T::from_value)
    }

    /// Values pulled into a list input, in connection order.
    pub fn collect<T: SocketValue>(&self, socket: &ListInputSocket<T>) -> Vec<T> {
        match self.item(socket.local_id()) {
            Some(item) if item.kind == ItemKind::ListInput => item
                .value
                .as_list()
                .map(|values| values.iter().filter_map(T::from_value).collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    pub fn set<T: SocketValue>(&mut self, socket: &OutputSocket<T>, value: T) {
        self.set_value(socket.local_id(), value.into_value());
    }

    pub fn state(&self) -> Option<&NodeState> {
        self.state.as_ref()
    }

    pub fn state_mut(&mut self) -> &mut Option<NodeState> {
        self.state
    }
}
