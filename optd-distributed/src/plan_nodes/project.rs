use anyhow::Result;
use itertools::Itertools;
use optd_core::nodes::PlanNodeId;

use super::{check_subset, check_unique, ArcDistPlanNode, DistPlanNode};
use crate::{expr::Expression, symbol::Symbol};

/// Computes one output symbol per assignment from the columns of its source.
#[derive(Debug, Clone)]
pub struct ProjectNode {
    id: PlanNodeId,
    source: ArcDistPlanNode,
    assignments: Vec<(Symbol, Expression)>,
}

impl ProjectNode {
    pub fn new(
        id: PlanNodeId,
        source: ArcDistPlanNode,
        assignments: Vec<(Symbol, Expression)>,
    ) -> Result<Self> {
        let node = Self {
            id,
            source,
            assignments,
        };
        check_unique("Project", "outputs", &node.output_symbols())?;
        let inputs = node
            .assignments
            .iter()
            .flat_map(|(_, expr)| expr.referenced_symbols())
            .unique()
            .collect_vec();
        check_subset("Project", "assignments", &inputs, &node.source.output_symbols())?;
        Ok(node)
    }

    pub fn id(&self) -> PlanNodeId {
        self.id
    }

    pub fn source(&self) -> &ArcDistPlanNode {
        &self.source
    }

    pub fn assignments(&self) -> &[(Symbol, Expression)] {
        &self.assignments
    }

    pub fn output_symbols(&self) -> Vec<Symbol> {
        self.assignments
            .iter()
            .map(|(symbol, _)| symbol.clone())
            .collect()
    }

    /// Whether every assignment is `x := x`.
    pub fn is_identity(&self) -> bool {
        self.assignments
            .iter()
            .all(|(symbol, expr)| expr.as_symbol() == Some(symbol))
    }

    pub fn into_plan_node(self) -> ArcDistPlanNode {
        DistPlanNode::Project(self).into()
    }
}

impl From<ProjectNode> for DistPlanNode {
    fn from(node: ProjectNode) -> Self {
        DistPlanNode::Project(node)
    }
}
