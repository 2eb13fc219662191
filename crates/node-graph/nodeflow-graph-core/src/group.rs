//! Nested subgraphs.
//!
//! A group hosts an inner [`NodeTreeModel`] with up to two boundary nodes. The
//! group-input node's outputs mirror the group's inputs and the group-output node's
//! inputs mirror the group's outputs. The group's own item list is derived from the
//! boundary nodes: outputs first, then inputs.

use log::{debug, warn};
use nodeflow_api_core::ValueKind;

use crate::config::Config;
use crate::context::{EvaluationContext, Frame, NodeScope, NodeState};
use crate::error::GraphError;
use crate::evaluator::NodeTreeEvaluator;
use crate::ids::{LocalId, NodeKey, SocketRef};
use crate::model::{ItemSpec, NodeTreeModel};
use crate::node::{Node, NodeBehavior};
use crate::socket::{ItemBuilder, ItemKind};

pub const GROUP_TAG: &str = "group";
pub const GROUP_INPUT_TAG: &str = "group.input";
pub const GROUP_OUTPUT_TAG: &str = "group.output";

/// Boundary node exposing the group's inputs inside the group.
#[derive(Debug, Default)]
pub struct GroupInputNode;

impl NodeBehavior for GroupInputNode {
    fn type_tag(&self) -> &'static str {
        GROUP_INPUT_TAG
    }

    fn build_items(&mut self, _items: &mut ItemBuilder<'_>) {}

    fn evaluate(&mut self, _scope: &mut NodeScope<'_>, _frame: &mut Frame<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Boundary node collecting the group's outputs inside the group.
#[derive(Debug, Default)]
pub struct GroupOutputNode;

impl NodeBehavior for GroupOutputNode {
    fn type_tag(&self) -> &'static str {
        GROUP_OUTPUT_TAG
    }

    fn build_items(&mut self, _items: &mut ItemBuilder<'_>) {}

    fn evaluate(&mut self, _scope: &mut NodeScope<'_>, _frame: &mut Frame<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Boundary {
    Input,
    Output,
}

/// Pairs an item of a boundary node with the group item mirroring it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct GroupLink {
    pub(crate) boundary: Boundary,
    pub(crate) boundary_local: LocalId,
    pub(crate) item: LocalId,
}

/// Inner evaluation state cached on the group's evaluation context.
#[derive(Debug, Default)]
pub struct GroupState {
    evaluator: NodeTreeEvaluator,
}

impl GroupState {
    pub fn new(config: Config) -> Self {
        GroupState {
            evaluator: NodeTreeEvaluator::with_config(config),
        }
    }

    pub fn evaluator(&self) -> &NodeTreeEvaluator {
        &self.evaluator
    }
}

#[derive(Debug, Default)]
pub struct NodeGroup {
    pub(crate) model: NodeTreeModel,
    pub(crate) input: Option<NodeKey>,
    pub(crate) output: Option<NodeKey>,
    pub(crate) links: Vec<GroupLink>,
}

impl NodeGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(&self) -> &NodeTreeModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut NodeTreeModel {
        &mut self.model
    }

    pub fn input_node(&self) -> Option<NodeKey> {
        self.input.filter(|k| self.model.node(*k).is_some())
    }

    pub fn output_node(&self) -> Option<NodeKey> {
        self.output.filter(|k| self.model.node(*k).is_some())
    }

    /// Insert or remove the group-input boundary node.
    pub fn set_input_boundary(&mut self, enabled: bool) -> Option<NodeKey> {
        let current = self.input_node();
        self.input = Self::set_boundary(&mut self.model, current, enabled, || {
            Node::new(Box::new(GroupInputNode))
        });
        self.input
    }

    /// Insert or remove the group-output boundary node.
    pub fn set_output_boundary(&mut self, enabled: bool) -> Option<NodeKey> {
        let current = self.output_node();
        self.output = Self::set_boundary(&mut self.model, current, enabled, || {
            Node::new(Box::new(GroupOutputNode))
        });
        self.output
    }

    fn set_boundary(
        model: &mut NodeTreeModel,
        current: Option<NodeKey>,
        enabled: bool,
        make: impl FnOnce() -> Node,
    ) -> Option<NodeKey> {
        match (current, enabled) {
            (Some(key), true) => Some(key),
            (None, true) => Some(model.add_node(make())),
            (Some(key), false) => {
                model.remove_node(key);
                None
            }
            (None, false) => None,
        }
    }

    /// Add a group input; returns the id of the mirroring output on the group-input node.
    pub fn add_input(&mut self, name: &str, kind: ValueKind) -> Result<LocalId, GraphError> {
        let key = match self.input_node() {
            Some(key) => key,
            None => {
                let key = self.model.add_node(Node::new(Box::new(GroupInputNode)));
                self.input = Some(key);
                key
            }
        };
        self.model
            .insert_item(key, usize::MAX, ItemSpec::output(name, kind))
    }

    /// Add a group output; returns the id of the mirroring input on the group-output node.
    pub fn add_output(&mut self, name: &str, kind: ValueKind) -> Result<LocalId, GraphError> {
        let key = match self.output_node() {
            Some(key) => key,
            None => {
                let key = self.model.add_node(Node::new(Box::new(GroupOutputNode)));
                self.output = Some(key);
                key
            }
        };
        self.model
            .insert_item(key, usize::MAX, ItemSpec::input(name, kind))
    }

    pub fn remove_input(&mut self, local: LocalId) -> Result<(), GraphError> {
        let key = self
            .input_node()
            .ok_or(GraphError::UnknownSocket(SocketRef::new(NodeKey::default(), local)))?;
        self.model.remove_item(SocketRef::new(key, local)).map(|_| ())
    }

    pub fn remove_output(&mut self, local: LocalId) -> Result<(), GraphError> {
        let key = self
            .output_node()
            .ok_or(GraphError::UnknownSocket(SocketRef::new(NodeKey::default(), local)))?;
        self.model.remove_item(SocketRef::new(key, local)).map(|_| ())
    }

    /// Socket inside the group for a group input or output, by boundary item id.
    pub fn boundary_socket(&self, boundary: Boundary, local: LocalId) -> Option<SocketRef> {
        let key = match boundary {
            Boundary::Input => self.input_node(),
            Boundary::Output => self.output_node(),
        }?;
        Some(SocketRef::new(key, local))
    }

    /// Group item mirroring the given boundary item.
    pub fn mirrored_item(&self, boundary: Boundary, local: LocalId) -> Option<LocalId> {
        self.links
            .iter()
            .find(|l| l.boundary == boundary && l.boundary_local == local)
            .map(|l| l.item)
    }

    /// Keep at most one boundary node of each kind, preferring the tracked one and
    /// otherwise the first found. Returns how many extra nodes were removed.
    pub(crate) fn enforce_single_boundaries(&mut self) -> usize {
        Self::keep_single(&mut self.model, &mut self.input, GROUP_INPUT_TAG)
            + Self::keep_single(&mut self.model, &mut self.output, GROUP_OUTPUT_TAG)
    }

    fn keep_single(model: &mut NodeTreeModel, tracked: &mut Option<NodeKey>, tag: &str) -> usize {
        let found: Vec<NodeKey> = model
            .nodes()
            .filter(|(_, node)| node.type_tag() == tag)
            .map(|(key, _)| key)
            .collect();
        let keep = tracked
            .filter(|key| found.contains(key))
            .or_else(|| found.first().copied());
        *tracked = keep;
        let mut removed = 0;
        for key in found.into_iter().filter(|key| Some(*key) != keep) {
            if let Some(node) = model.remove_node(key) {
                warn!("removing extra {tag} boundary node {}", node.id());
                removed += 1;
            }
        }
        removed
    }

    /// Items the group should expose, in order: outputs, then inputs.
    pub(crate) fn mirror_specs(&self) -> Vec<(Boundary, LocalId, ItemSpec)> {
        let mut specs = Vec::new();
        if let Some(node) = self.output_node().and_then(|k| self.model.node(k)) {
            for item in node.items().iter().filter(|i| i.kind() == ItemKind::Input) {
                specs.push((
                    Boundary::Output,
                    item.local_id(),
                    ItemSpec::output(item.name(), item.value_kind()),
                ));
            }
        }
        if let Some(node) = self.input_node().and_then(|k| self.model.node(k)) {
            for item in node.items().iter().filter(|i| i.kind() == ItemKind::Output) {
                specs.push((
                    Boundary::Input,
                    item.local_id(),
                    ItemSpec::input(item.name(), item.value_kind()),
                ));
            }
        }
        specs
    }

    fn copy_links(&mut self, boundary: Boundary, scope: &mut NodeScope<'_>) {
        let Some(key) = (match boundary {
            Boundary::Input => self.input_node(),
            Boundary::Output => self.output_node(),
        }) else {
            return;
        };
        for link in self.links.iter().filter(|l| l.boundary == boundary) {
            let inner = SocketRef::new(key, link.boundary_local);
            match boundary {
                Boundary::Input => {
                    let value = scope.value(link.item).cloned().unwrap_or_default();
                    if let Some(item) = self.model.item_mut(inner) {
                        item.value = value;
                    }
                }
                Boundary::Output => {
                    let value = self.model.value(inner).cloned().unwrap_or_default();
                    scope.set_value(link.item, value);
                }
            }
        }
    }
}

impl NodeBehavior for NodeGroup {
    fn type_tag(&self) -> &'static str {
        GROUP_TAG
    }

    fn build_items(&mut self, _items: &mut ItemBuilder<'_>) {}

    fn initialize_for_context(&mut self, ctx: &mut EvaluationContext) {
        ctx.state = Some(NodeState::Group(Box::new(GroupState::new(ctx.config))));
    }

    fn uninitialize_for_context(&mut self, ctx: &mut EvaluationContext) {
        if let Some(NodeState::Group(state)) = ctx.state.take() {
            state.evaluator.dispose(&mut self.model);
        }
    }

    fn pre_evaluate(&mut self, scope: &mut NodeScope<'_>, _frame: &mut Frame<'_>) -> anyhow::Result<()> {
        self.copy_links(Boundary::Input, scope);
        Ok(())
    }

    fn evaluate(&mut self, scope: &mut NodeScope<'_>, frame: &mut Frame<'_>) -> anyhow::Result<()> {
        let config = *scope.config();
        if frame.depth() >= config.max_group_depth {
            return Err(GraphError::GroupDepthExceeded(config.max_group_depth).into());
        }
        let mut state = match scope.state_mut().take() {
            Some(NodeState::Group(state)) => state,
            _ => Box::new(GroupState::new(config)),
        };
        let result = state.evaluator.evaluate(&mut self.model, &mut frame.nested());
        *scope.state_mut() = Some(NodeState::Group(state));
        result.map_err(Into::into)
    }

    fn post_evaluate(&mut self, scope: &mut NodeScope<'_>, _frame: &mut Frame<'_>) -> anyhow::Result<()> {
        self.copy_links(Boundary::Output, scope);
        Ok(())
    }

    fn as_group(&self) -> Option<&NodeGroup> {
        Some(self)
    }

    fn as_group_mut(&mut self) -> Option<&mut NodeGroup> {
        Some(self)
    }
}

impl NodeTreeModel {
    /// Edit a group's inner graph. Afterwards the group's items are re-synced with its
    /// boundary nodes; the outer topology only changes if that alters the items.
    pub fn edit_group<R>(
        &mut self,
        key: NodeKey,
        edit: impl FnOnce(&mut NodeGroup) -> R,
    ) -> Result<R, GraphError> {
        let node = self.nodes.get_mut(key).ok_or(GraphError::UnknownNode(key))?;
        let group = node
            .behavior
            .as_group_mut()
            .ok_or(GraphError::NotAGroup(key))?;
        let before = (group.model.topology_version(), group.model.content_version());
        let out = edit(group);
        group.enforce_single_boundaries();
        let after = (group.model.topology_version(), group.model.content_version());
        if after.0 != before.0 {
            self.sync_group_items(key)?;
        }
        if after != before {
            self.content_changed();
        }
        Ok(out)
    }

    pub fn group(&self, key: NodeKey) -> Option<&NodeGroup> {
        self.nodes.get(key)?.as_group()
    }

    /// Bring the group's item list in line with its boundary nodes.
    /// Returns true when items were added, removed or retyped.
    pub(crate) fn sync_group_items(&mut self, key: NodeKey) -> Result<bool, GraphError> {
        let node = self.nodes.get(key).ok_or(GraphError::UnknownNode(key))?;
        let group = node.as_group().ok_or(GraphError::NotAGroup(key))?;
        let desired = group.mirror_specs();
        let links = group.links.clone();

        let mut kept = Vec::new();
        let mut stale = Vec::new();
        for link in links {
            let wanted = desired
                .iter()
                .find(|(b, bl, _)| *b == link.boundary && *bl == link.boundary_local)
                .map(|(_, _, spec)| spec);
            match (wanted, node.item(link.item)) {
                (Some(spec), Some(item)) if item.value_kind() == spec.value_kind => kept.push(link),
                (_, Some(_)) => stale.push(link.item),
                (_, None) => {}
            }
        }

        let mut changed = !stale.is_empty();
        for local in stale {
            self.remove_item(SocketRef::new(key, local))?;
        }

        let mut links = Vec::with_capacity(desired.len());
        for (boundary, boundary_local, spec) in desired {
            let existing = kept
                .iter()
                .find(|l| l.boundary == boundary && l.boundary_local == boundary_local)
                .copied();
            let link = match existing {
                Some(link) => {
                    if let Some(item) = self.item_mut(SocketRef::new(key, link.item)) {
                        if item.name != spec.name {
                            item.name = spec.name;
                        }
                    }
                    link
                }
                None => {
                    changed = true;
                    let item = self.insert_item(key, usize::MAX, spec)?;
                    GroupLink {
                        boundary,
                        boundary_local,
                        item,
                    }
                }
            };
            links.push(link);
        }

        let node = self.nodes.get_mut(key).ok_or(GraphError::UnknownNode(key))?;
        let rank = |local: LocalId| links.iter().position(|l| l.item == local).unwrap_or(usize::MAX);
        node.items.sort_by_key(|i| rank(i.local_id));
        if let Some(group) = node.behavior.as_group_mut() {
            group.links = links;
        }
        if changed {
            debug!("group {} now exposes {} item(s)", node.id, node.items.len());
        }
        Ok(changed)
    }
}
