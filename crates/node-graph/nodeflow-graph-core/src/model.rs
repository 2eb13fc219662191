//! The graph container: nodes, connections and the mutation API.
//!
//! Every structural change goes through [`NodeTreeModel`] so the two invalidation
//! counters stay truthful: `topology_version` moves when nodes, items or connections
//! change (the evaluator must rebuild), `content_version` moves when only values do.

use hashbrown::{HashMap, HashSet};
use log::warn;
use nodeflow_animation_core::KeyframeAnimation;
use nodeflow_api_core::coercion::{accept_number, can_coerce};
use nodeflow_api_core::{Value, ValueKind};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::context::Frame;
use crate::error::GraphError;
use crate::ids::{ConnectionKey, LocalId, NodeId, NodeKey, SocketId, SocketRef};
use crate::node::Node;
use crate::socket::{ConnectionStatus, ItemKind, NodeItem, Receiver};

/// An edge from one output to one input.
#[derive(Clone, Debug, PartialEq)]
pub struct Connection {
    pub input: SocketRef,
    pub output: SocketRef,
    pub status: ConnectionStatus,
}

/// A connection request by persisted id, waiting for both endpoints to exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingConnection {
    pub input: SocketId,
    pub output: SocketId,
}

/// Description of an item added to an existing node.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemSpec {
    pub name: String,
    pub kind: ItemKind,
    pub value_kind: ValueKind,
    pub default: Option<Value>,
}

impl ItemSpec {
    pub fn input(name: impl Into<String>, value_kind: ValueKind) -> Self {
        ItemSpec {
            name: name.into(),
            kind: ItemKind::Input,
            value_kind,
            default: Some(Value::default_for(value_kind)),
        }
    }

    pub fn output(name: impl Into<String>, value_kind: ValueKind) -> Self {
        ItemSpec {
            name: name.into(),
            kind: ItemKind::Output,
            value_kind,
            default: None,
        }
    }

    pub fn list_input(name: impl Into<String>, value_kind: ValueKind) -> Self {
        ItemSpec {
            name: name.into(),
            kind: ItemKind::ListInput,
            value_kind,
            default: None,
        }
    }

    pub fn property(name: impl Into<String>, default: Value) -> Self {
        ItemSpec {
            name: name.into(),
            kind: ItemKind::Property,
            value_kind: default.kind(),
            default: Some(default),
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub(crate) fn into_item(self, local: LocalId) -> NodeItem {
        let default = match self.kind {
            ItemKind::Input | ItemKind::Property => self
                .default
                .or_else(|| Some(Value::default_for(self.value_kind))),
            ItemKind::Output => self.default,
            ItemKind::ListInput => None,
        };
        let mut item = NodeItem::new(local, self.name, self.kind, self.value_kind, default);
        if self.kind == ItemKind::ListInput {
            item.value = Value::List(Vec::new());
        }
        item
    }
}

/// True when the default receiver can feed an output of kind `output` into an input
/// of kind `input`. Inputs with their own receiver accept any producer.
pub fn kinds_compatible(input: ValueKind, output: ValueKind) -> bool {
    can_coerce(input, output)
}

/// Nodes and connections of one dataflow graph.
#[derive(Debug, Default)]
pub struct NodeTreeModel {
    pub(crate) nodes: SlotMap<NodeKey, Node>,
    pub(crate) order: Vec<NodeKey>,
    pub(crate) index: HashMap<NodeId, NodeKey>,
    pub(crate) connections: SlotMap<ConnectionKey, Connection>,
    pub(crate) pending: Vec<PendingConnection>,
    pub(crate) topology_version: u64,
    pub(crate) content_version: u64,
}

impl NodeTreeModel {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Invalidation ------------------------------------------------------

    /// Bumped on every structural change.
    pub fn topology_version(&self) -> u64 {
        self.topology_version
    }

    /// Bumped when values change without touching structure.
    pub fn content_version(&self) -> u64 {
        self.content_version
    }

    pub(crate) fn topology_changed(&mut self) {
        self.topology_version = self.topology_version.wrapping_add(1);
    }

    pub(crate) fn content_changed(&mut self) {
        self.content_version = self.content_version.wrapping_add(1);
    }

    // --- Nodes -------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Node keys in insertion order.
    pub fn node_keys(&self) -> &[NodeKey] {
        &self.order
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeKey, &Node)> {
        self.order
            .iter()
            .filter_map(move |k| self.nodes.get(*k).map(|n| (*k, n)))
    }

    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn key_of(&self, id: NodeId) -> Option<NodeKey> {
        self.index.get(&id).copied()
    }

    pub fn add_node(&mut self, mut node: Node) -> NodeKey {
        let id = node.id;
        if let Some(existing) = self.index.get(&id).copied() {
            warn!("node {id} added twice; replacing the previous instance");
            self.remove_node(existing);
        }
        let key = self.nodes.insert_with_key(|key| {
            node.set_owner(key);
            node
        });
        self.order.push(key);
        self.index.insert(id, key);
        self.topology_changed();
        if !self.pending.is_empty() {
            self.retry_pending();
        }
        key
    }

    /// Remove a node after disconnecting all of its sockets.
    pub fn remove_node(&mut self, key: NodeKey) -> Option<Node> {
        let attached: Vec<ConnectionKey> = self
            .nodes
            .get(key)?
            .items
            .iter()
            .flat_map(|i| i.connections.iter().copied())
            .collect();
        for conn in attached {
            self.detach(conn);
        }
        let node = self.nodes.remove(key)?;
        self.order.retain(|k| *k != key);
        self.index.remove(&node.id);
        self.topology_changed();
        Some(node)
    }

    /// Move a node. Position is presentation data and does not invalidate anything.
    pub fn set_position(&mut self, key: NodeKey, x: f64, y: f64) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(key).ok_or(GraphError::UnknownNode(key))?;
        node.set_position(x, y);
        Ok(())
    }

    // --- Items -------------------------------------------------------------

    pub fn item(&self, socket: SocketRef) -> Option<&NodeItem> {
        self.nodes.get(socket.node)?.item(socket.local)
    }

    pub(crate) fn item_mut(&mut self, socket: SocketRef) -> Option<&mut NodeItem> {
        self.nodes.get_mut(socket.node)?.item_mut(socket.local)
    }

    pub fn value(&self, socket: SocketRef) -> Option<&Value> {
        self.item(socket).map(|i| &i.value)
    }

    /// Address of the item called `name` on `node`.
    pub fn socket(&self, node: NodeKey, name: &str) -> Option<SocketRef> {
        self.nodes
            .get(node)?
            .item_named(name)
            .map(|i| SocketRef::new(node, i.local_id))
    }

    pub fn find_socket(&self, id: SocketId) -> Option<SocketRef> {
        let key = self.key_of(id.node)?;
        self.nodes.get(key)?.item(id.local)?;
        Some(SocketRef::new(key, id.local))
    }

    pub fn socket_id(&self, socket: SocketRef) -> Option<SocketId> {
        let node = self.nodes.get(socket.node)?;
        node.item(socket.local)?;
        Some(SocketId {
            node: node.id,
            local: socket.local,
        })
    }

    /// Insert an item into an existing node at `index` (clamped to the item count).
    pub fn insert_item(
        &mut self,
        node: NodeKey,
        index: usize,
        spec: ItemSpec,
    ) -> Result<LocalId, GraphError> {
        let target = self.nodes.get_mut(node).ok_or(GraphError::UnknownNode(node))?;
        let local = target.allocate_local_id();
        let mut item = spec.into_item(local);
        item.owner = node;
        let at = index.min(target.items.len());
        target.items.insert(at, item);
        self.topology_changed();
        Ok(local)
    }

    /// Remove an item, dropping its connections first.
    pub fn remove_item(&mut self, socket: SocketRef) -> Result<NodeItem, GraphError> {
        let attached = self
            .item(socket)
            .ok_or(GraphError::UnknownSocket(socket))?
            .connections
            .clone();
        for conn in attached {
            self.detach(conn);
        }
        let node = self
            .nodes
            .get_mut(socket.node)
            .ok_or(GraphError::UnknownNode(socket.node))?;
        let pos = node
            .items
            .iter()
            .position(|i| i.local_id == socket.local)
            .ok_or(GraphError::UnknownSocket(socket))?;
        let item = node.items.remove(pos);
        self.topology_changed();
        Ok(item)
    }

    /// Store a static value on a property-backed item.
    pub fn set_property_value(&mut self, socket: SocketRef, value: Value) -> Result<(), GraphError> {
        let item = self
            .item_mut(socket)
            .ok_or(GraphError::UnknownSocket(socket))?;
        let kind = item.value_kind;
        let accepted = accept_number(kind, &value).ok_or(GraphError::KindMismatch {
            input: kind,
            output: value.kind(),
        })?;
        let adapter = item
            .property
            .as_mut()
            .ok_or(GraphError::NoProperty(socket))?;
        adapter.set_value(accepted.clone());
        if item.connections.is_empty() {
            item.value = accepted;
            item.valid = true;
        }
        self.content_changed();
        Ok(())
    }

    /// Attach or clear the animation driving a property-backed item.
    pub fn set_animation(
        &mut self,
        socket: SocketRef,
        animation: Option<KeyframeAnimation>,
    ) -> Result<(), GraphError> {
        if let Some(anim) = &animation {
            anim.validate()?;
        }
        let item = self
            .item_mut(socket)
            .ok_or(GraphError::UnknownSocket(socket))?;
        let kind = item.value_kind;
        if let Some(first) = animation.as_ref().and_then(|a| a.keyframes.first()) {
            if accept_number(kind, &first.value).is_none() {
                return Err(GraphError::KindMismatch {
                    input: kind,
                    output: first.value.kind(),
                });
            }
        }
        item.property
            .as_mut()
            .ok_or(GraphError::NoProperty(socket))?
            .set_animation(animation);
        self.content_changed();
        Ok(())
    }

    /// Install (or clear) the receiver used to convert foreign values for this socket.
    pub fn set_receiver(
        &mut self,
        socket: SocketRef,
        receiver: Option<Receiver>,
    ) -> Result<(), GraphError> {
        let item = self
            .item_mut(socket)
            .ok_or(GraphError::UnknownSocket(socket))?;
        if !item.kind.is_input() {
            return Err(GraphError::NotAnInput(socket));
        }
        item.receiver = receiver;
        Ok(())
    }

    // --- Connections -------------------------------------------------------

    /// Connect `output` to `input`. On error nothing changes.
    pub fn connect(&mut self, input: SocketRef, output: SocketRef) -> Result<ConnectionKey, GraphError> {
        if input.node == output.node {
            return Err(GraphError::SameNode);
        }
        let in_item = self.item(input).ok_or(GraphError::UnknownSocket(input))?;
        if !in_item.kind.is_input() {
            return Err(GraphError::NotAnInput(input));
        }
        let out_item = self.item(output).ok_or(GraphError::UnknownSocket(output))?;
        if out_item.kind != ItemKind::Output {
            return Err(GraphError::NotAnOutput(output));
        }
        if in_item.receiver.is_none() && !kinds_compatible(in_item.value_kind, out_item.value_kind) {
            return Err(GraphError::KindMismatch {
                input: in_item.value_kind,
                output: out_item.value_kind,
            });
        }
        if in_item.kind == ItemKind::Input && in_item.is_connected() {
            return Err(GraphError::InputAlreadyConnected(input));
        }

        let key = self.connections.insert(Connection {
            input,
            output,
            status: ConnectionStatus::Pending,
        });
        if let Some(item) = self.item_mut(input) {
            item.connections.push(key);
        }
        if let Some(item) = self.item_mut(output) {
            item.connections.push(key);
        }
        self.topology_changed();
        Ok(key)
    }

    pub fn disconnect(&mut self, key: ConnectionKey) -> Option<Connection> {
        let conn = self.detach(key)?;
        self.topology_changed();
        Some(conn)
    }

    /// Remove a connection from both endpoints without signalling.
    fn detach(&mut self, key: ConnectionKey) -> Option<Connection> {
        let conn = self.connections.remove(key)?;
        if let Some(item) = self.item_mut(conn.output) {
            item.connections.retain(|k| *k != key);
        }
        if let Some(item) = self.item_mut(conn.input) {
            item.connections.retain(|k| *k != key);
            if item.connections.is_empty() {
                item.valid = true;
                item.value = match (item.kind, &item.property) {
                    (ItemKind::ListInput, _) => Value::List(Vec::new()),
                    (_, Some(p)) => p.value().clone(),
                    (_, None) => Value::default_for(item.value_kind),
                };
            }
        }
        Some(conn)
    }

    pub fn connection(&self, key: ConnectionKey) -> Option<&Connection> {
        self.connections.get(key)
    }

    pub fn connections(&self) -> impl Iterator<Item = (ConnectionKey, &Connection)> {
        self.connections.iter()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Connections attached to `socket`, in connect order.
    pub fn connections_of(&self, socket: SocketRef) -> &[ConnectionKey] {
        self.item(socket).map(|i| i.connections()).unwrap_or(&[])
    }

    pub fn is_connected(&self, socket: SocketRef) -> bool {
        !self.connections_of(socket).is_empty()
    }

    /// Nodes feeding any input of `node`, first occurrence order.
    pub fn upstream_of(&self, node: NodeKey) -> Vec<NodeKey> {
        self.neighbours(node, true)
    }

    /// Nodes fed by any output of `node`, first occurrence order.
    pub fn downstream_of(&self, node: NodeKey) -> Vec<NodeKey> {
        self.neighbours(node, false)
    }

    fn neighbours(&self, node: NodeKey, upstream: bool) -> Vec<NodeKey> {
        let Some(n) = self.nodes.get(node) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for item in &n.items {
            if item.kind.is_input() != upstream || item.kind == ItemKind::Property {
                continue;
            }
            for key in &item.connections {
                if let Some(conn) = self.connections.get(*key) {
                    let other = if upstream { conn.output.node } else { conn.input.node };
                    if seen.insert(other) {
                        out.push(other);
                    }
                }
            }
        }
        out
    }

    // --- Deferred resolution ----------------------------------------------

    /// Queue a connection between sockets that may not exist yet.
    pub fn request_connection(&mut self, input: SocketId, output: SocketId) {
        self.pending.push(PendingConnection { input, output });
    }

    pub fn pending(&self) -> &[PendingConnection] {
        &self.pending
    }

    /// Connect every queued request whose endpoints exist; keep the rest queued.
    ///
    /// Requests for one input are resolved in queue order: once a request is kept,
    /// later requests for the same input wait too, so list inputs keep their order.
    fn retry_pending(&mut self) {
        let queued = std::mem::take(&mut self.pending);
        let mut blocked: HashSet<SocketId> = HashSet::new();
        for request in queued {
            if blocked.contains(&request.input) {
                self.pending.push(request);
                continue;
            }
            match (self.find_socket(request.input), self.find_socket(request.output)) {
                (Some(input), Some(output)) => {
                    if let Err(err) = self.connect(input, output) {
                        warn!(
                            "dropping connection {} -> {}: {err}",
                            request.output, request.input
                        );
                    }
                }
                _ => {
                    blocked.insert(request.input);
                    self.pending.push(request);
                }
            }
        }
    }

    /// Resolve queued requests against the current id table and drop whatever is
    /// still unresolved. Returns the number of dropped requests.
    pub fn resolve_pending(&mut self) -> usize {
        let queued = std::mem::take(&mut self.pending);
        let mut dropped = 0;
        for request in queued {
            let resolved = match (self.find_socket(request.input), self.find_socket(request.output)) {
                (Some(input), Some(output)) => self.connect(input, output).map_err(|e| e.to_string()),
                _ => Err("endpoint not found".to_string()),
            };
            if let Err(reason) = resolved {
                warn!(
                    "dropping unresolved connection {} -> {}: {reason}",
                    request.output, request.input
                );
                dropped += 1;
            }
        }
        dropped
    }

    // --- Evaluation phases -------------------------------------------------

    /// Load this frame's values into the node's inputs and properties: list inputs
    /// pull from their outputs, unconnected inputs and properties read their adapter.
    pub(crate) fn load_inputs(&mut self, key: NodeKey, frame: &Frame<'_>, coerce: bool) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        let mut pulled = Vec::new();
        for (idx, item) in node.items.iter().enumerate() {
            if item.kind != ItemKind::ListInput {
                continue;
            }
            let mut values = Vec::with_capacity(item.connections.len());
            let mut statuses = Vec::with_capacity(item.connections.len());
            for ckey in &item.connections {
                let Some(source) = self
                    .connections
                    .get(*ckey)
                    .and_then(|c| self.item(c.output))
                else {
                    continue;
                };
                let status = match item.coerce(&source.value, coerce) {
                    Some((v, converted)) => {
                        values.push(v);
                        if converted {
                            ConnectionStatus::Converted
                        } else {
                            ConnectionStatus::Success
                        }
                    }
                    None => ConnectionStatus::Error,
                };
                statuses.push((*ckey, status));
            }
            pulled.push((idx, values, statuses));
        }

        for (_, _, statuses) in &pulled {
            for (ckey, status) in statuses {
                if let Some(conn) = self.connections.get_mut(*ckey) {
                    conn.status = *status;
                }
            }
        }
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        for (idx, values, _) in pulled {
            if let Some(item) = node.items.get_mut(idx) {
                item.value = Value::List(values);
            }
        }
        for item in &mut node.items {
            let unconnected = match item.kind {
                ItemKind::Input => item.connections.is_empty(),
                ItemKind::Property => true,
                ItemKind::ListInput | ItemKind::Output => false,
            };
            if unconnected {
                item.value = match &item.property {
                    Some(p) => p.load(item.value_kind, frame.time, frame.start),
                    None => Value::default_for(item.value_kind),
                };
                item.valid = true;
            }
        }
    }

    /// Push every output of `key` into its connected scalar inputs.
    pub(crate) fn push_outputs(&mut self, key: NodeKey, coerce: bool) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        let deliveries: Vec<(ConnectionKey, Value)> = node
            .items
            .iter()
            .filter(|i| i.kind == ItemKind::Output)
            .flat_map(|i| i.connections.iter().map(move |c| (*c, i.value.clone())))
            .collect();
        for (ckey, value) in deliveries {
            let Some(input) = self.connections.get(ckey).map(|c| c.input) else {
                continue;
            };
            let status = match self.item_mut(input) {
                Some(item) if item.kind == ItemKind::Input => item.receive(&value, coerce),
                _ => continue,
            };
            if let Some(conn) = self.connections.get_mut(ckey) {
                conn.status = status;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{AddNode, ValueNode};

    fn pair() -> (NodeTreeModel, NodeKey, NodeKey) {
        let mut model = NodeTreeModel::new();
        let a = model.add_node(Node::new(Box::new(ValueNode::default())));
        let b = model.add_node(Node::new(Box::new(AddNode::default())));
        (model, a, b)
    }

    #[test]
    fn connect_rejects_second_connection_on_scalar_input() {
        let (mut model, a, b) = pair();
        let c = model.add_node(Node::new(Box::new(ValueNode::default())));
        let lhs = model.socket(b, "lhs").unwrap();
        model.connect(lhs, model.socket(a, "out").unwrap()).unwrap();
        let version = model.topology_version();
        let err = model
            .connect(lhs, model.socket(c, "out").unwrap())
            .unwrap_err();
        assert!(matches!(err, GraphError::InputAlreadyConnected(_)));
        assert_eq!(model.topology_version(), version);
        assert_eq!(model.connection_count(), 1);
    }

    #[test]
    fn connect_checks_direction() {
        let (mut model, a, b) = pair();
        let out = model.socket(a, "out").unwrap();
        let lhs = model.socket(b, "lhs").unwrap();
        assert!(matches!(
            model.connect(out, lhs),
            Err(GraphError::NotAnInput(_))
        ));
        assert!(matches!(
            model.connect(lhs, lhs),
            Err(GraphError::SameNode)
        ));
    }

    #[test]
    fn removing_a_node_disconnects_it() {
        let (mut model, a, b) = pair();
        let lhs = model.socket(b, "lhs").unwrap();
        model.connect(lhs, model.socket(a, "out").unwrap()).unwrap();
        model.remove_node(a).unwrap();
        assert_eq!(model.connection_count(), 0);
        assert!(!model.is_connected(lhs));
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn neighbour_queries() {
        let (mut model, a, b) = pair();
        model
            .connect(model.socket(b, "lhs").unwrap(), model.socket(a, "out").unwrap())
            .unwrap();
        model
            .connect(model.socket(b, "rhs").unwrap(), model.socket(a, "out").unwrap())
            .unwrap();
        assert_eq!(model.upstream_of(b), vec![a]);
        assert_eq!(model.downstream_of(a), vec![b]);
        assert!(model.upstream_of(a).is_empty());
    }

    #[test]
    fn property_value_is_content_change_only() {
        let (mut model, a, _) = pair();
        let topo = model.topology_version();
        let content = model.content_version();
        let value = model.socket(a, "value").unwrap();
        model.set_property_value(value, Value::Int(4)).unwrap();
        assert_eq!(model.topology_version(), topo);
        assert_eq!(model.content_version(), content + 1);
        assert_eq!(model.value(value), Some(&Value::Float(4.0)));
        assert!(matches!(
            model.set_property_value(value, Value::Bool(true)),
            Err(GraphError::KindMismatch { .. })
        ));
    }

    #[test]
    fn removed_item_ids_are_not_reused() {
        let (mut model, a, _) = pair();
        let first = model
            .insert_item(a, usize::MAX, ItemSpec::input("extra", ValueKind::Float))
            .unwrap();
        model.remove_item(SocketRef::new(a, first)).unwrap();
        let second = model
            .insert_item(a, 0, ItemSpec::input("extra", ValueKind::Float))
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(model.node(a).unwrap().items()[0].local_id(), second);
    }

    #[test]
    fn pending_requests_wait_for_their_nodes() {
        let mut model = NodeTreeModel::new();
        let src = Node::new(Box::new(ValueNode::default()));
        let dst = Node::new(Box::new(AddNode::default()));
        let out_id = SocketId {
            node: src.id(),
            local: src.item_named("out").unwrap().local_id(),
        };
        let in_id = SocketId {
            node: dst.id(),
            local: dst.item_named("lhs").unwrap().local_id(),
        };
        model.request_connection(in_id, out_id);
        model.add_node(dst);
        assert_eq!(model.pending().len(), 1);
        model.add_node(src);
        assert!(model.pending().is_empty());
        assert_eq!(model.connection_count(), 1);
        assert_eq!(model.resolve_pending(), 0);
    }
}
