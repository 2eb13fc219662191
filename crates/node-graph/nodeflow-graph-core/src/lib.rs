//! Node dataflow engine.
//!
//! A [`NodeTreeModel`] owns nodes and the connections between their sockets. A
//! [`NodeTreeEvaluator`] sorts the model topologically (leaving cyclic nodes out of the
//! plan) and runs every planned node's PreEvaluate, Evaluate and PostEvaluate phases
//! once per frame. [`NodeGroup`] nests a whole model inside a single node.

pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod evaluator;
pub mod group;
pub mod ids;
pub mod model;
pub mod node;
pub mod nodes;
pub mod property;
pub mod registry;
pub mod socket;
pub mod topo;


pub use config::Config;
pub use context::{Drawable, EvaluationContext, Frame, NodeScope, NodeState, NullRenderer, Renderer};
pub use document::{GraphDocument, GroupDocument, ItemDocument, NodeDocument};
pub use error::GraphError;
pub use evaluator::{EvaluatorState, NodeTreeEvaluator};
pub use group::{Boundary, GroupState, NodeGroup};
pub use ids::{ConnectionKey, LocalId, NodeId, NodeKey, SocketId, SocketRef};
pub use model::{kinds_compatible, Connection, ItemSpec, NodeTreeModel, PendingConnection};
pub use node::{Node, NodeBehavior};
pub use property::PropertyAdapter;
pub use registry::{NodeFactory, NodeRegistry};
pub use socket::{
    ConnectionStatus, InputSocket, ItemBuilder, ItemKind, ListInputSocket, NodeItem, OutputSocket,
    PropertyItem, Receiver, SocketValue,
};
pub use topo::{topo_order, TopoOrder};

pub use nodeflow_api_core::{Value, ValueKind};
