use crate::context::{Frame, NodeScope};
use crate::node::NodeBehavior;
use crate::socket::{InputSocket, ItemBuilder, ListInputSocket, OutputSocket};

pub(crate) const ADD_TAG: &str = "add";
pub(crate) const SUM_TAG: &str = "sum";

#[derive(Debug, Default)]
pub struct AddNode {
    lhs: InputSocket<f32>,
    rhs: InputSocket<f32>,
    out: OutputSocket<f32>,
}

impl NodeBehavior for AddNode {
    fn type_tag(&self) -> &'static str {
        ADD_TAG
    }

    fn build_items(&mut self, items: &mut ItemBuilder<'_>) {
        self.lhs = items.input("lhs", 0.0f32);
        self.rhs = items.input("rhs", 0.0f32);
        self.out = items.output("out");
    }

    fn evaluate(&mut self, scope: &mut NodeScope<'_>, _frame: &mut Frame<'_>) -> anyhow::Result<()> {
        let lhs = scope.input(&self.lhs).unwrap_or_default();
        let rhs = scope.input(&self.rhs).unwrap_or_default();
        scope.set(&self.out, lhs + rhs);
        Ok(())
    }
}

/// Fan-in sum over a list input.
#[derive(Debug, Default)]
pub struct SumNode {
    values: ListInputSocket<f32>,
    out: OutputSocket<f32>,
}

impl NodeBehavior for SumNode {
    fn type_tag(&self) -> &'static str {
        SUM_TAG
    }

    fn build_items(&mut self, items: &mut ItemBuilder<'_>) {
        self.values = items.list_input("values");
        self.out = items.output("out");
    }

    fn evaluate(&mut self, scope: &mut NodeScope<'_>, _frame: &mut Frame<'_>) -> anyhow::Result<()> {
        let total: f32 = scope.collect(&self.values).into_iter().sum();
        scope.set(&self.out, total);
        Ok(())
    }
}
