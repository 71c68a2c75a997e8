use anyhow::Result;
use optd_core::nodes::PlanNodeId;

use super::{check_unique, ArcDistPlanNode, DistPlanNode};
use crate::symbol::Symbol;

/// A leaf producing rows with a fixed set of columns, e.g. a table scan or remote split.
#[derive(Debug, Clone)]
pub struct SourceNode {
    id: PlanNodeId,
    name: String,
    output_symbols: Vec<Symbol>,
}

impl SourceNode {
    pub fn new(id: PlanNodeId, name: impl Into<String>, output_symbols: Vec<Symbol>) -> Result<Self> {
        check_unique("Source", "outputs", &output_symbols)?;
        Ok(Self {
            id,
            name: name.into(),
            output_symbols,
        })
    }

    pub fn id(&self) -> PlanNodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn output_symbols(&self) -> &[Symbol] {
        &self.output_symbols
    }

    pub fn into_plan_node(self) -> ArcDistPlanNode {
        DistPlanNode::Source(self).into()
    }
}

impl From<SourceNode> for DistPlanNode {
    fn from(node: SourceNode) -> Self {
        DistPlanNode::Source(node)
    }
}
