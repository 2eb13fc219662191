//! Nodes and the behavior trait implemented by every node type.

use std::fmt;

use crate::context::{EvaluationContext, Frame, NodeScope};
use crate::group::NodeGroup;
use crate::ids::{LocalId, NodeId, NodeKey};
use crate::socket::{ItemBuilder, ItemKind, NodeItem};

/// Node-type specific logic. Items are declared once in [`build_items`](Self::build_items);
/// the three evaluation phases then run once per frame, back to back.
pub trait NodeBehavior {
    /// Registry tag used to recreate this node when loading.
    fn type_tag(&self) -> &'static str;

    /// Declare this node's items. Called once, in a deterministic order so local ids
    /// line up with previously saved documents.
    fn build_items(&mut self, items: &mut ItemBuilder<'_>);

    fn initialize_for_context(&mut self, _ctx: &mut EvaluationContext) {}

    fn uninitialize_for_context(&mut self, _ctx: &mut EvaluationContext) {}

    /// Runs after inputs and properties were loaded for this frame.
    fn pre_evaluate(&mut self, _scope: &mut NodeScope<'_>, _frame: &mut Frame<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn evaluate(&mut self, scope: &mut NodeScope<'_>, frame: &mut Frame<'_>) -> anyhow::Result<()>;

    /// Runs before outputs are pushed downstream.
    fn post_evaluate(&mut self, _scope: &mut NodeScope<'_>, _frame: &mut Frame<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn as_group(&self) -> Option<&NodeGroup> {
        None
    }

    fn as_group_mut(&mut self) -> Option<&mut NodeGroup> {
        None
    }
}

/// A vertex of the graph: identity, layout position, items and behavior.
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) position: [f64; 2],
    pub(crate) items: Vec<NodeItem>,
    pub(crate) next_local_id: u32,
    pub(crate) behavior: Box<dyn NodeBehavior>,
}

impl Node {
    pub fn new(behavior: Box<dyn NodeBehavior>) -> Self {
        Self::with_id(NodeId::new(), behavior)
    }

    pub fn with_id(id: NodeId, mut behavior: Box<dyn NodeBehavior>) -> Self {
        let mut items = Vec::new();
        let mut next_local_id = 0;
        behavior.build_items(&mut ItemBuilder::new(&mut items, &mut next_local_id));
        Node {
            id,
            position: [0.0, 0.0],
            items,
            next_local_id,
            behavior,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn type_tag(&self) -> &'static str {
        self.behavior.type_tag()
    }

    pub fn position(&self) -> [f64; 2] {
        self.position
    }

    /// Layout position; NaN coordinates are stored as zero.
    pub fn set_position(&mut self, x: f64, y: f64) {
        let clean = |v: f64| if v.is_nan() { 0.0 } else { v };
        self.position = [clean(x), clean(y)];
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.set_position(x, y);
        self
    }

    pub fn items(&self) -> &[NodeItem] {
        &self.items
    }

    pub fn item(&self, local: LocalId) -> Option<&NodeItem> {
        self.items.iter().find(|i| i.local_id == local)
    }

    pub(crate) fn item_mut(&mut self, local: LocalId) -> Option<&mut NodeItem> {
        self.items.iter_mut().find(|i| i.local_id == local)
    }

    /// First item called `name`.
    pub fn item_named(&self, name: &str) -> Option<&NodeItem> {
        self.items.iter().find(|i| i.name == name)
    }

    pub fn inputs(&self) -> impl Iterator<Item = &NodeItem> {
        self.items.iter().filter(|i| i.kind.is_input())
    }

    pub fn outputs(&self) -> impl Iterator<Item = &NodeItem> {
        self.items.iter().filter(|i| i.kind == ItemKind::Output)
    }

    pub fn next_local_id(&self) -> LocalId {
        LocalId(self.next_local_id)
    }

    pub(crate) fn allocate_local_id(&mut self) -> LocalId {
        let id = LocalId(self.next_local_id);
        self.next_local_id += 1;
        id
    }

    pub fn behavior(&self) -> &dyn NodeBehavior {
        self.behavior.as_ref()
    }

    pub fn as_group(&self) -> Option<&NodeGroup> {
        self.behavior.as_group()
    }

    pub(crate) fn set_owner(&mut self, key: NodeKey) {
        for item in &mut self.items {
            item.owner = key;
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("type", &self.type_tag())
            .field("position", &self.position)
            .field("items", &self.items)
            .finish()
    }
}
