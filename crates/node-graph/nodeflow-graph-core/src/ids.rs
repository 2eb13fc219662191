//! Identifiers for nodes, items and connections.
//!
//! Two families coexist: arena keys ([`NodeKey`], [`ConnectionKey`]) address live
//! entries inside one [`NodeTreeModel`](crate::NodeTreeModel) and are never persisted,
//! while [`NodeId`] / [`SocketId`] are stable across save/load.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;
use uuid::Uuid;

new_key_type! {
    /// Arena index of a node inside its model.
    pub struct NodeKey;
    /// Arena index of a connection inside its model.
    pub struct ConnectionKey;
}

/// Stable node identity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn new() -> Self {
        NodeId(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Item id, unique within its node and stable across save/load.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(pub u32);

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Persisted socket address.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SocketId {
    pub node: NodeId,
    pub local: LocalId,
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.node, self.local)
    }
}

/// Live socket address inside one model.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SocketRef {
    pub node: NodeKey,
    pub local: LocalId,
}

impl SocketRef {
    pub fn new(node: NodeKey, local: LocalId) -> Self {
        SocketRef { node, local }
    }
}
