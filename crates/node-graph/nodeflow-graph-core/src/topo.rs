use crate::ids::NodeKey;
use crate::model::NodeTreeModel;
use crate::socket::ItemKind;
use hashbrown::HashMap;
use std::collections::VecDeque;

/// Result of sorting a model: nodes in dependency order plus the ones left out
/// because they sit on (or behind) a cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TopoOrder {
    pub order: Vec<NodeKey>,
    pub skipped: Vec<NodeKey>,
}

impl TopoOrder {
    pub fn has_cycles(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// Kahn's algorithm over every input and list-input connection of `model`.
/// Ties are broken by node insertion order, so the result is deterministic.
pub fn topo_order(model: &NodeTreeModel) -> TopoOrder {
    let mut indeg: HashMap<NodeKey, usize> = HashMap::with_capacity(model.len());
    let mut adj: HashMap<NodeKey, Vec<NodeKey>> = HashMap::new();

    for (key, node) in model.nodes() {
        indeg.entry(key).or_insert(0);
        for item in node.items() {
            if !matches!(item.kind(), ItemKind::Input | ItemKind::ListInput) {
                continue;
            }
            for conn in item.connections() {
                let Some(conn) = model.connection(*conn) else {
                    continue;
                };
                adj.entry(conn.output.node).or_default().push(key);
                *indeg.entry(key).or_default() += 1;
            }
        }
    }

    let mut q: VecDeque<NodeKey> = model
        .node_keys()
        .iter()
        .copied()
        .filter(|k| indeg.get(k).copied() == Some(0))
        .collect();

    let mut order = Vec::with_capacity(model.len());
    while let Some(u) = q.pop_front() {
        order.push(u);
        if let Some(vs) = adj.get(&u) {
            for v in vs {
                if let Some(d) = indeg.get_mut(v) {
                    *d -= 1;
                    if *d == 0 {
                        q.push_back(*v);
                    }
                }
            }
        }
    }

    let skipped = model
        .node_keys()
        .iter()
        .copied()
        .filter(|k| indeg.get(k).is_some_and(|d| *d > 0))
        .collect();
    TopoOrder { order, skipped }
}
