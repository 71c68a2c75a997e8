//! Typed plan nodes of a distributed query plan.

mod aggregation;
mod exchange;
mod ordering;
mod project;
mod source;

use std::sync::Arc;

use anyhow::Result;
use itertools::Itertools;
use optd_core::{
    error::OptimizerError,
    nodes::{NodeType, PlanNode, PlanNodeId},
};

pub use aggregation::{
    Aggregation, AggregationNode, AggregationNodeBuilder, AggregationStep, GroupingSets,
};
pub use exchange::{
    ArgumentBinding, ExchangeNode, ExchangeScope, ExchangeType, Partitioning, PartitioningHandle,
    PartitioningScheme,
};
pub use ordering::{OrderingScheme, SortOrder};
pub use project::ProjectNode;
pub use source::SourceNode;

use crate::symbol::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistNodeType {
    Aggregation,
    Exchange,
    Project,
    Source,
}

impl std::fmt::Display for DistNodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl NodeType for DistNodeType {}

#[derive(Debug, Clone)]
pub enum DistPlanNode {
    Aggregation(AggregationNode),
    Exchange(ExchangeNode),
    Project(ProjectNode),
    Source(SourceNode),
}

pub type ArcDistPlanNode = Arc<DistPlanNode>;

impl DistPlanNode {
    /// Symbols produced by this node, in output order.
    pub fn output_symbols(&self) -> Vec<Symbol> {
        match self {
            DistPlanNode::Aggregation(node) => node.output_symbols(),
            DistPlanNode::Exchange(node) => node.output_symbols().to_vec(),
            DistPlanNode::Project(node) => node.output_symbols(),
            DistPlanNode::Source(node) => node.output_symbols().to_vec(),
        }
    }

    pub fn as_aggregation(&self) -> Option<&AggregationNode> {
        match self {
            DistPlanNode::Aggregation(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_exchange(&self) -> Option<&ExchangeNode> {
        match self {
            DistPlanNode::Exchange(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_project(&self) -> Option<&ProjectNode> {
        match self {
            DistPlanNode::Project(node) => Some(node),
            _ => None,
        }
    }

    /// Largest node id used anywhere in this tree.
    pub fn max_id(&self) -> PlanNodeId {
        self.children()
            .iter()
            .map(|child| child.max_id())
            .fold(self.id(), std::cmp::max)
    }

    /// Every distinct symbol produced anywhere in this tree.
    pub fn all_symbols(&self) -> Vec<Symbol> {
        let mut symbols = self.output_symbols();
        for child in self.children() {
            symbols.extend(child.all_symbols());
        }
        symbols.into_iter().unique().collect()
    }
}

impl PlanNode for DistPlanNode {
    type Typ = DistNodeType;

    fn typ(&self) -> DistNodeType {
        match self {
            DistPlanNode::Aggregation(_) => DistNodeType::Aggregation,
            DistPlanNode::Exchange(_) => DistNodeType::Exchange,
            DistPlanNode::Project(_) => DistNodeType::Project,
            DistPlanNode::Source(_) => DistNodeType::Source,
        }
    }

    fn id(&self) -> PlanNodeId {
        match self {
            DistPlanNode::Aggregation(node) => node.id(),
            DistPlanNode::Exchange(node) => node.id(),
            DistPlanNode::Project(node) => node.id(),
            DistPlanNode::Source(node) => node.id(),
        }
    }

    fn children(&self) -> Vec<ArcDistPlanNode> {
        match self {
            DistPlanNode::Aggregation(node) => vec![node.source().clone()],
            DistPlanNode::Exchange(node) => node.sources().to_vec(),
            DistPlanNode::Project(node) => vec![node.source().clone()],
            DistPlanNode::Source(_) => vec![],
        }
    }

    fn with_children(&self, children: Vec<ArcDistPlanNode>) -> Result<ArcDistPlanNode> {
        let node: DistPlanNode = match self {
            DistPlanNode::Aggregation(node) => {
                let [source] = single_child("Aggregation", children)?;
                node.to_builder().source(source).build()?.into()
            }
            DistPlanNode::Exchange(node) => node.with_sources(children)?.into(),
            DistPlanNode::Project(node) => {
                let [source] = single_child("Project", children)?;
                ProjectNode::new(node.id(), source, node.assignments().to_vec())?.into()
            }
            DistPlanNode::Source(_) => {
                check(children.is_empty(), "Source", || {
                    format!("expected no children, got {}", children.len())
                })?;
                self.clone()
            }
        };
        Ok(Arc::new(node))
    }
}

fn single_child(
    node: &'static str,
    children: Vec<ArcDistPlanNode>,
) -> Result<[ArcDistPlanNode; 1]> {
    let len = children.len();
    children.try_into().map_err(|_| {
        OptimizerError::malformed(node, format!("expected exactly one child, got {}", len)).into()
    })
}

/// Fails with [`OptimizerError::MalformedPlan`] unless `condition` holds.
pub(crate) fn check(
    condition: bool,
    node: &'static str,
    message: impl FnOnce() -> String,
) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(OptimizerError::malformed(node, message()).into())
    }
}

/// Fails unless `symbols` has no repeated entry.
pub(crate) fn check_unique(node: &'static str, what: &str, symbols: &[Symbol]) -> Result<()> {
    let duplicates = symbols.iter().duplicates().join(", ");
    check(duplicates.is_empty(), node, || {
        format!("{} contain duplicates: {}", what, duplicates)
    })
}

/// Fails unless every symbol of `symbols` is one of `available`.
pub(crate) fn check_subset(
    node: &'static str,
    what: &str,
    symbols: &[Symbol],
    available: &[Symbol],
) -> Result<()> {
    let missing = symbols
        .iter()
        .filter(|symbol| !available.contains(symbol))
        .join(", ");
    check(missing.is_empty(), node, || {
        format!("{} reference unknown symbols: {}", what, missing)
    })
}
