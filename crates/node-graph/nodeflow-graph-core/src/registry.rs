//! Type-tag to constructor mapping used when loading documents.

use hashbrown::HashMap;

use crate::error::GraphError;
use crate::ids::NodeId;
use crate::node::{Node, NodeBehavior};

pub type NodeFactory = fn() -> Box<dyn NodeBehavior>;

#[derive(Clone, Debug, Default)]
pub struct NodeRegistry {
    factories: HashMap<String, NodeFactory>,
}

impl NodeRegistry {
    /// Empty registry. Most hosts want [`NodeRegistry::with_builtins`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::nodes::register_builtins(&mut registry);
        registry
    }

    /// Register `factory` under `tag`, replacing any previous entry.
    pub fn register(&mut self, tag: &str, factory: NodeFactory) -> Option<NodeFactory> {
        self.factories.insert(tag.to_string(), factory)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn create_behavior(&self, tag: &str) -> Result<Box<dyn NodeBehavior>, GraphError> {
        self.factories
            .get(tag)
            .map(|factory| factory())
            .ok_or_else(|| GraphError::UnknownNodeType(tag.to_string()))
    }

    /// Instantiate a node of type `tag` with a fresh id.
    pub fn create(&self, tag: &str) -> Result<Node, GraphError> {
        self.create_behavior(tag).map(Node::new)
    }

    pub fn create_with_id(&self, tag: &str, id: NodeId) -> Result<Node, GraphError> {
        self.create_behavior(tag).map(|b| Node::with_id(id, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let registry = NodeRegistry::with_builtins();
        for tag in ["value", "add", "sum", "time", "shape.rect", "output", "group"] {
            assert!(registry.contains(tag), "missing {tag}");
        }
        let node = registry.create("add").unwrap();
        assert_eq!(node.type_tag(), "add");
        assert_eq!(node.items().len(), 3);
    }

    #[test]
    fn unknown_tag_is_an_error() {
        let registry = NodeRegistry::with_builtins();
        assert!(matches!(
            registry.create("nope"),
            Err(GraphError::UnknownNodeType(tag)) if tag == "nope"
        ));
    }
}
