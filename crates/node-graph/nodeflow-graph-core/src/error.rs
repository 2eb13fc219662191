use nodeflow_animation_core::AnimationError;
use nodeflow_api_core::ValueKind;
use thiserror::Error;

use crate::ids::{NodeId, NodeKey, SocketRef};

/// Errors raised by graph mutation, loading and evaluation.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node {0:?} is not part of this graph")]
    UnknownNode(NodeKey),
    #[error("socket {0:?} does not exist")]
    UnknownSocket(SocketRef),
    #[error("socket {0:?} is not an input")]
    NotAnInput(SocketRef),
    #[error("socket {0:?} is not an output")]
    NotAnOutput(SocketRef),
    #[error("cannot feed a {} output into a {} input", .output.name(), .input.name())]
    KindMismatch { input: ValueKind, output: ValueKind },
    #[error("input {0:?} is already connected")]
    InputAlreadyConnected(SocketRef),
    #[error("a node cannot be connected to itself")]
    SameNode,
    #[error("socket {0:?} has no property")]
    NoProperty(SocketRef),
    #[error("unknown node type `{0}`")]
    UnknownNodeType(String),
    #[error("node {0:?} is not a group")]
    NotAGroup(NodeKey),
    #[error("group nesting exceeds {0} levels")]
    GroupDepthExceeded(usize),
    #[error(transparent)]
    Animation(#[from] AnimationError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("node {node} ({type_tag}) failed to evaluate")]
    NodeFailed {
        node: NodeId,
        type_tag: String,
        #[source]
        source: anyhow::Error,
    },
}
