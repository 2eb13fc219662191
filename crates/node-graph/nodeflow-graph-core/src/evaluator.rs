//! The scheduler: builds a topological plan from a model and runs it once per frame.
//!
//! The evaluator never owns the model. It remembers the model's topology version at
//! the last Build and treats any difference as the dirty signal, so every structural
//! mutation made through [`NodeTreeModel`] forces a rebuild before the next pass.

use log::{debug, warn};

use crate::config::Config;
use crate::context::{EvaluationContext, Frame, NodeScope};
use crate::error::GraphError;
use crate::ids::NodeKey;
use crate::model::NodeTreeModel;
use crate::topo::topo_order;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EvaluatorState {
    Clean,
    Dirty,
}

#[derive(Debug, Default)]
pub struct NodeTreeEvaluator {
    config: Config,
    built_version: Option<u64>,
    plan: Vec<EvaluationContext>,
    skipped: Vec<NodeKey>,
}

impl NodeTreeEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        NodeTreeEvaluator {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self, model: &NodeTreeModel) -> EvaluatorState {
        if self.built_version == Some(model.topology_version()) {
            EvaluatorState::Clean
        } else {
            EvaluatorState::Dirty
        }
    }

    pub fn is_dirty(&self, model: &NodeTreeModel) -> bool {
        self.state(model) == EvaluatorState::Dirty
    }

    /// Force a rebuild on the next pass.
    pub fn mark_dirty(&mut self) {
        self.built_version = None;
    }

    /// Nodes of the current plan in execution order.
    pub fn sorted_nodes(&self) -> Vec<NodeKey> {
        self.plan.iter().map(|ctx| ctx.node).collect()
    }

    /// Nodes left out of the current plan because of cycles.
    pub fn skipped(&self) -> &[NodeKey] {
        &self.skipped
    }

    pub fn plan(&self) -> &[EvaluationContext] {
        &self.plan
    }

    /// Rebuild the plan if the model changed since the last Build.
    pub fn build(&mut self, model: &mut NodeTreeModel) {
        if !self.is_dirty(model) {
            return;
        }
        self.uninitialize(model);

        let topo = topo_order(model);
        if topo.has_cycles() {
            warn!(
                "graph contains a cycle: {} of {} node(s) skipped",
                topo.skipped.len(),
                model.len()
            );
        }

        self.plan = Vec::with_capacity(topo.order.len());
        for key in topo.order {
            let mut ctx = EvaluationContext::new(key, self.config);
            if let Some(node) = model.nodes.get_mut(key) {
                node.behavior.initialize_for_context(&mut ctx);
            }
            self.plan.push(ctx);
        }
        self.skipped = topo.skipped;
        self.built_version = Some(model.topology_version());
        debug!(
            "built evaluation plan: {} node(s), {} skipped",
            self.plan.len(),
            self.skipped.len()
        );
    }

    /// Run one pass: Build when dirty, then PreEvaluate, Evaluate and PostEvaluate
    /// for each planned node before moving to the next.
    pub fn evaluate(&mut self, model: &mut NodeTreeModel, frame: &mut Frame<'_>) -> Result<(), GraphError> {
        self.build(model);
        let coerce = self.config.coerce_on_receive;
        for ctx in &mut self.plan {
            model.load_inputs(ctx.node, frame, coerce);

            let Some(node) = model.nodes.get_mut(ctx.node) else {
                continue;
            };
            let id = node.id;
            let behavior = &mut node.behavior;
            let config = ctx.config;
            let mut scope = NodeScope::new(id, &mut node.items, &mut ctx.state, &config);
            behavior
                .pre_evaluate(&mut scope, frame)
                .and_then(|()| behavior.evaluate(&mut scope, frame))
                .and_then(|()| behavior.post_evaluate(&mut scope, frame))
                .map_err(|source| GraphError::NodeFailed {
                    node: id,
                    type_tag: behavior.type_tag().to_string(),
                    source,
                })?;

            model.push_outputs(ctx.node, coerce);
        }
        Ok(())
    }

    /// Release per-node state of the current plan and clear it.
    pub fn uninitialize(&mut self, model: &mut NodeTreeModel) {
        for mut ctx in self.plan.drain(..) {
            if let Some(node) = model.nodes.get_mut(ctx.node) {
                node.behavior.uninitialize_for_context(&mut ctx);
            }
        }
        self.skipped.clear();
        self.built_version = None;
    }

    /// Uninitialize and forget the model.
    pub fn dispose(mut self, model: &mut NodeTreeModel) {
        self.uninitialize(model);
    }
}
