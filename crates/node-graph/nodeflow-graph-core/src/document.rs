//! Persisted graph form and the two-phase load.
//!
//! Saving writes connections from one side only: an output lists the scalar inputs
//! it feeds, a list input lists its outputs in order. Loading first instantiates
//! every node through the [`NodeRegistry`] and queues all connection requests, then
//! resolves the queue against the complete id table. Requests that still do not
//! resolve are dropped.

use log::{debug, warn};
use nodeflow_api_core::coercion::accept_number;
use nodeflow_animation_core::KeyframeAnimation;
use nodeflow_api_core::ValueKind;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::GraphError;
use crate::group::NodeGroup;
use crate::ids::{LocalId, NodeId, NodeKey, SocketId};
use crate::model::{ItemSpec, NodeTreeModel, PendingConnection};
use crate::node::Node;
use crate::property::PropertyAdapter;
use crate::registry::NodeRegistry;
use crate::socket::{ItemKind, NodeItem};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub nodes: Vec<NodeDocument>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default, deserialize_with = "position_or_origin")]
    pub position: [f64; 2],
    #[serde(default)]
    pub next_local_id: u32,
    #[serde(default)]
    pub items: Vec<ItemDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupDocument>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemDocument {
    pub local_id: LocalId,
    pub name: String,
    pub kind: ItemKind,
    pub value_kind: ValueKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<PropertyAdapter>,
    /// Outputs: the scalar inputs they feed. List inputs: their outputs, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<SocketId>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupDocument {
    pub graph: GraphDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<NodeId>,
}

/// NaN is written as `null` by serde_json; read it back as zero.
fn position_or_origin<'de, D>(deserializer: D) -> Result<[f64; 2], D::Error>
where
    D: Deserializer<'de>,
{
    let raw: [Option<f64>; 2] = Deserialize::deserialize(deserializer)?;
    Ok([raw[0].unwrap_or(0.0), raw[1].unwrap_or(0.0)])
}

impl NodeTreeModel {
    pub fn to_document(&self) -> GraphDocument {
        GraphDocument {
            nodes: self.nodes().map(|(_, node)| self.node_document(node)).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    pub fn from_json(text: &str, registry: &NodeRegistry) -> Result<Self, GraphError> {
        let doc: GraphDocument = serde_json::from_str(text)?;
        Self::from_document(&doc, registry)
    }

    fn node_document(&self, node: &Node) -> NodeDocument {
        NodeDocument {
            id: node.id,
            type_tag: node.type_tag().to_string(),
            position: node.position,
            next_local_id: node.next_local_id,
            items: node
                .items
                .iter()
                .map(|item| ItemDocument {
                    local_id: item.local_id,
                    name: item.name.clone(),
                    kind: item.kind,
                    value_kind: item.value_kind,
                    property: item.property.clone(),
                    connections: self.persisted_connections(item),
                })
                .collect(),
            group: node.as_group().map(|group| GroupDocument {
                graph: group.model.to_document(),
                input: group
                    .input_node()
                    .and_then(|k| group.model.node(k))
                    .map(Node::id),
                output: group
                    .output_node()
                    .and_then(|k| group.model.node(k))
                    .map(Node::id),
            }),
        }
    }

    fn persisted_connections(&self, item: &NodeItem) -> Vec<SocketId> {
        let conns = item
            .connections
            .iter()
            .filter_map(|key| self.connections.get(*key));
        match item.kind {
            ItemKind::Output => conns
                .filter(|c| self.item(c.input).is_some_and(|i| i.kind == ItemKind::Input))
                .filter_map(|c| self.socket_id(c.input))
                .collect(),
            ItemKind::ListInput => conns.filter_map(|c| self.socket_id(c.output)).collect(),
            ItemKind::Input | ItemKind::Property => Vec::new(),
        }
    }

    /// Build a model from `doc`. Unknown node types fail the load; connections whose
    /// endpoints are missing are dropped.
    pub fn from_document(doc: &GraphDocument, registry: &NodeRegistry) -> Result<Self, GraphError> {
        let mut model = NodeTreeModel::new();
        let mut requests: Vec<(PendingConnection, bool)> = Vec::new();

        for saved in &doc.nodes {
            let mut node = registry.create_with_id(&saved.type_tag, saved.id)?;
            node.set_position(saved.position[0], saved.position[1]);
            let is_group = match (&saved.group, node.behavior.as_group_mut()) {
                (Some(group_doc), Some(group)) => {
                    group.load_document(group_doc, registry)?;
                    true
                }
                (None, Some(_)) => true,
                _ => false,
            };
            let key = model.add_node(node);
            if is_group {
                model.sync_group_items(key)?;
                model.adopt_local_ids(key, &saved.items)?;
            }
            model.restore_items(key, saved, !is_group)?;

            for item in &saved.items {
                let here = SocketId {
                    node: saved.id,
                    local: item.local_id,
                };
                match item.kind {
                    ItemKind::Output => requests.extend(item.connections.iter().map(|input| {
                        (
                            PendingConnection {
                                input: *input,
                                output: here,
                            },
                            false,
                        )
                    })),
                    ItemKind::ListInput => requests.extend(item.connections.iter().map(|output| {
                        (
                            PendingConnection {
                                input: here,
                                output: *output,
                            },
                            true,
                        )
                    })),
                    ItemKind::Input | ItemKind::Property => {}
                }
            }
        }

        // A list input's own ordered list is authoritative for its connections.
        for (request, from_list) in requests {
            let into_list = model
                .find_socket(request.input)
                .and_then(|s| model.item(s))
                .is_some_and(|i| i.kind == ItemKind::ListInput);
            if from_list || !into_list {
                model.pending.push(request);
            }
        }
        let dropped = model.resolve_pending();
        debug!(
            "loaded graph: {} node(s), {} connection(s), {} dropped",
            model.len(),
            model.connection_count(),
            dropped
        );
        Ok(model)
    }

    /// Restore saved property state and items the node type does not declare itself.
    fn restore_items(
        &mut self,
        key: NodeKey,
        saved: &NodeDocument,
        recreate_missing: bool,
    ) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(key).ok_or(GraphError::UnknownNode(key))?;
        for (index, doc) in saved.items.iter().enumerate() {
            if node.item(doc.local_id).is_none() {
                if !recreate_missing {
                    continue;
                }
                let spec = ItemSpec {
                    name: doc.name.clone(),
                    kind: doc.kind,
                    value_kind: doc.value_kind,
                    default: doc.property.as_ref().map(|p| p.default_value().clone()),
                };
                let mut item = spec.into_item(doc.local_id);
                item.owner = key;
                let at = index.min(node.items.len());
                node.items.insert(at, item);
            }
            let Some(item) = node.item_mut(doc.local_id) else {
                continue;
            };
            if item.kind != doc.kind || item.value_kind != doc.value_kind {
                debug!(
                    "item `{}` changed kind since it was saved; keeping defaults",
                    item.name
                );
                continue;
            }
            if let (Some(adapter), Some(stored)) = (item.property.as_mut(), doc.property.as_ref()) {
                let value = accept_number(item.value_kind, stored.value())
                    .unwrap_or_else(|| adapter.default_value().clone());
                adapter.set_value(value.clone());
                let animation = loadable_animation(&item.name, item.value_kind, stored.animation());
                adapter.set_animation(animation);
                item.value = value;
            }
        }
        node.next_local_id = node.next_local_id.max(saved.next_local_id);
        Ok(())
    }

    /// Give a rebuilt group's items the local ids they were saved with. Items are
    /// matched by position and kind; unmatched items get fresh ids.
    fn adopt_local_ids(&mut self, key: NodeKey, saved: &[ItemDocument]) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(key).ok_or(GraphError::UnknownNode(key))?;
        let mut next = node
            .next_local_id
            .max(saved.iter().map(|i| i.local_id.0 + 1).max().unwrap_or(0));
        let mut remap: Vec<(LocalId, LocalId)> = Vec::with_capacity(node.items.len());
        for (index, item) in node.items.iter_mut().enumerate() {
            let new = match saved.get(index) {
                Some(doc) if doc.kind == item.kind && doc.value_kind == item.value_kind => doc.local_id,
                _ => {
                    let id = LocalId(next);
                    next += 1;
                    id
                }
            };
            remap.push((item.local_id, new));
            item.local_id = new;
        }
        node.next_local_id = next;
        if let Some(group) = node.behavior.as_group_mut() {
            for link in &mut group.links {
                if let Some((_, new)) = remap.iter().find(|(old, _)| *old == link.item) {
                    link.item = *new;
                }
            }
        }
        Ok(())
    }
}

/// Saved animation for `name`, or `None` when it is malformed or cannot drive `kind`.
fn loadable_animation(
    name: &str,
    kind: ValueKind,
    stored: Option<&KeyframeAnimation>,
) -> Option<KeyframeAnimation> {
    let anim = stored?;
    if let Err(e) = anim.validate() {
        warn!("dropping animation on `{name}`: {e}");
        return None;
    }
    if let Some(first) = anim.keyframes.first() {
        if accept_number(kind, &first.value).is_none() {
            warn!(
                "dropping animation on `{name}`: {} keyframes cannot drive a {} property",
                first.value.kind().name(),
                kind.name()
            );
            return None;
        }
    }
    Some(anim.clone())
}

impl NodeGroup {
    fn load_document(&mut self, doc: &GroupDocument, registry: &NodeRegistry) -> Result<(), GraphError> {
        self.model = NodeTreeModel::from_document(&doc.graph, registry)?;
        self.input = doc.input.and_then(|id| self.model.key_of(id));
        self.output = doc.output.and_then(|id| self.model.key_of(id));
        self.links.clear();
        self.enforce_single_boundaries();
        Ok(())
    }
}
