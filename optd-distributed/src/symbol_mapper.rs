//! Renames the symbols of a plan subtree.

use std::collections::HashMap;

use anyhow::Result;
use itertools::Itertools;
use optd_core::{
    error::OptimizerError,
    nodes::{PlanNode, PlanNodeId},
};

use crate::{
    context::PlanningContext,
    expr::Expression,
    plan_nodes::{
        Aggregation, AggregationNode, ArcDistPlanNode, DistPlanNode, ProjectNode,
    },
    symbol::Symbol,
};

/// A renaming from one symbol namespace to another. Symbols without an entry map to
/// themselves.
#[derive(Debug, Clone, Default)]
pub struct SymbolMapper {
    mapping: HashMap<Symbol, Symbol>,
}

impl SymbolMapper {
    /// Builds the renaming `old -> new` from `pairs`, skipping pairs that map a symbol to
    /// itself. Mapping one symbol to two different targets is an error.
    pub fn build(pairs: impl IntoIterator<Item = (Symbol, Symbol)>) -> Result<Self> {
        let mut mapping = HashMap::new();
        for (old, new) in pairs {
            if old == new {
                continue;
            }
            if let Some(existing) = mapping.get(&old) {
                if existing != &new {
                    return Err(OptimizerError::invariant(
                        "SymbolMapper",
                        format!("{} is mapped to both {} and {}", old, existing, new),
                    )
                    .into());
                }
                continue;
            }
            mapping.insert(old, new);
        }
        Ok(Self { mapping })
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    pub fn map_symbol(&self, symbol: &Symbol) -> Symbol {
        self.mapping.get(symbol).unwrap_or(symbol).clone()
    }

    /// Maps every symbol; entries that collapse onto the same target are kept once.
    pub fn map_symbols(&self, symbols: &[Symbol]) -> Vec<Symbol> {
        symbols
            .iter()
            .map(|symbol| self.map_symbol(symbol))
            .unique()
            .collect()
    }

    pub fn map_expression(&self, expr: &Expression) -> Expression {
        expr.rewrite_symbols(&|symbol: &Symbol| self.map_symbol(symbol))
    }

    pub fn map_aggregation(&self, aggregation: &Aggregation) -> Aggregation {
        Aggregation::new(
            aggregation.function().clone(),
            aggregation
                .arguments()
                .iter()
                .map(|argument| self.map_expression(argument))
                .collect(),
        )
        .with_distinct(aggregation.is_distinct())
        .with_filter(aggregation.filter().map(|filter| self.map_symbol(filter)))
        .with_ordering_scheme(
            aggregation
                .ordering_scheme()
                .map(|ordering| ordering.map_symbols(|symbol| self.map_symbol(symbol))),
        )
        .with_mask(aggregation.mask().map(|mask| self.map_symbol(mask)))
    }

    /// `node` rewritten over `source`, under `id`, with every symbol reference renamed.
    pub fn map_aggregation_node(
        &self,
        node: &AggregationNode,
        source: ArcDistPlanNode,
        id: PlanNodeId,
    ) -> Result<AggregationNode> {
        AggregationNode::builder(id, source)
            .aggregations(
                node.aggregations()
                    .iter()
                    .map(|(output, aggregation)| {
                        (self.map_symbol(output), self.map_aggregation(aggregation))
                    })
                    .collect(),
            )
            .grouping_sets(
                node.grouping_sets()
                    .map_symbols(|symbol| self.map_symbol(symbol)),
            )
            .pre_grouped_symbols(self.map_symbols(node.pre_grouped_symbols()))
            .step(node.step())
            .hash_symbol(node.hash_symbol().map(|hash| self.map_symbol(hash)))
            .group_id_symbol(node.group_id_symbol().map(|group_id| self.map_symbol(group_id)))
            .build()
    }

    pub fn map_project_node(
        &self,
        node: &ProjectNode,
        source: ArcDistPlanNode,
        id: PlanNodeId,
    ) -> Result<ProjectNode> {
        ProjectNode::new(
            id,
            source,
            node.assignments()
                .iter()
                .map(|(output, expr)| (self.map_symbol(output), self.map_expression(expr)))
                .collect(),
        )
    }

    /// A copy of the single-source `node` over `new_source` with a fresh id and every symbol
    /// reference renamed.
    pub fn map_subtree(
        &self,
        node: &DistPlanNode,
        new_source: ArcDistPlanNode,
        context: &mut PlanningContext,
    ) -> Result<ArcDistPlanNode> {
        match node {
            DistPlanNode::Aggregation(node) => Ok(self
                .map_aggregation_node(node, new_source, context.next_id())?
                .into_plan_node()),
            DistPlanNode::Project(node) => Ok(self
                .map_project_node(node, new_source, context.next_id())?
                .into_plan_node()),
            DistPlanNode::Exchange(_) | DistPlanNode::Source(_) => Err(OptimizerError::invariant(
                "SymbolMapper",
                format!("cannot map a {} node onto a single source", node.typ()),
            )
            .into()),
        }
    }
}
