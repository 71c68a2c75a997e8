use anyhow::Result;
use itertools::Itertools;
use optd_core::nodes::PlanNodeId;

use super::{
    check, check_subset, check_unique, ArcDistPlanNode, DistPlanNode, OrderingScheme,
};
use crate::{expr::Expression, metadata::FunctionSignature, symbol::Symbol};

/// Which half of a (possibly split) aggregation a node computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationStep {
    /// Raw input in, final values out.
    Single,
    /// Raw input in, intermediate states out.
    Partial,
    /// Intermediate states in, final values out.
    Final,
}

impl AggregationStep {
    pub fn is_input_raw(&self) -> bool {
        matches!(self, AggregationStep::Single | AggregationStep::Partial)
    }

    pub fn is_output_partial(&self) -> bool {
        matches!(self, AggregationStep::Partial)
    }
}

impl std::fmt::Display for AggregationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregationStep::Single => write!(f, "SINGLE"),
            AggregationStep::Partial => write!(f, "PARTIAL"),
            AggregationStep::Final => write!(f, "FINAL"),
        }
    }
}

/// One aggregate call, e.g. `sum(DISTINCT x) FILTER (WHERE f)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Aggregation {
    function: FunctionSignature,
    arguments: Vec<Expression>,
    distinct: bool,
    filter: Option<Symbol>,
    ordering_scheme: Option<OrderingScheme>,
    mask: Option<Symbol>,
}

impl Aggregation {
    pub fn new(function: FunctionSignature, arguments: Vec<Expression>) -> Self {
        Self {
            function,
            arguments,
            distinct: false,
            filter: None,
            ordering_scheme: None,
            mask: None,
        }
    }

    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    pub fn with_filter(mut self, filter: Option<Symbol>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_ordering_scheme(mut self, ordering_scheme: Option<OrderingScheme>) -> Self {
        self.ordering_scheme = ordering_scheme;
        self
    }

    pub fn with_mask(mut self, mask: Option<Symbol>) -> Self {
        self.mask = mask;
        self
    }

    pub fn function(&self) -> &FunctionSignature {
        &self.function
    }

    pub fn arguments(&self) -> &[Expression] {
        &self.arguments
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn filter(&self) -> Option<&Symbol> {
        self.filter.as_ref()
    }

    pub fn ordering_scheme(&self) -> Option<&OrderingScheme> {
        self.ordering_scheme.as_ref()
    }

    pub fn mask(&self) -> Option<&Symbol> {
        self.mask.as_ref()
    }

    /// Input columns this call reads.
    pub fn referenced_symbols(&self) -> Vec<Symbol> {
        self.arguments
            .iter()
            .flat_map(Expression::referenced_symbols)
            .chain(self.filter.clone())
            .chain(self.ordering_scheme.iter().flat_map(OrderingScheme::symbols))
            .chain(self.mask.clone())
            .unique()
            .collect()
    }
}

impl std::fmt::Display for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(", self.function.name())?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        write!(f, "{})", self.arguments.iter().join(", "))?;
        if let Some(filter) = &self.filter {
            write!(f, " FILTER (WHERE {})", filter)?;
        }
        if let Some(ordering) = &self.ordering_scheme {
            write!(f, " ORDER BY {}", ordering)?;
        }
        if let Some(mask) = &self.mask {
            write!(f, " MASK {}", mask)?;
        }
        Ok(())
    }
}

/// The grouping sets of an aggregation. `[[]]` is a global aggregation, `[[a, b]]` a plain
/// `GROUP BY a, b`, and more than one set comes from `GROUPING SETS`, `ROLLUP` or `CUBE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupingSets {
    sets: Vec<Vec<Symbol>>,
}

impl GroupingSets {
    pub fn new(sets: Vec<Vec<Symbol>>) -> Self {
        Self { sets }
    }

    pub fn single(keys: Vec<Symbol>) -> Self {
        Self::new(vec![keys])
    }

    pub fn global() -> Self {
        Self::single(vec![])
    }

    pub fn sets(&self) -> &[Vec<Symbol>] {
        &self.sets
    }

    pub fn grouping_set_count(&self) -> usize {
        self.sets.len()
    }

    /// The union of all sets, in first-appearance order.
    pub fn grouping_keys(&self) -> Vec<Symbol> {
        self.sets.iter().flatten().unique().cloned().collect()
    }

    pub fn has_empty_grouping_set(&self) -> bool {
        self.sets.iter().any(Vec::is_empty)
    }

    pub fn has_non_empty_grouping_set(&self) -> bool {
        self.sets.iter().any(|set| !set.is_empty())
    }

    /// Renames every key. Keys of one set that collapse onto the same symbol are kept once.
    pub fn map_symbols(&self, f: impl Fn(&Symbol) -> Symbol) -> Self {
        Self {
            sets: self
                .sets
                .iter()
                .map(|set| set.iter().map(&f).unique().collect())
                .collect(),
        }
    }
}

impl std::fmt::Display for GroupingSets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.sets
                .iter()
                .map(|set| format!("[{}]", set.iter().join(", ")))
                .join(", ")
        )
    }
}

/// Grouped aggregation. Outputs are the grouping keys, then the group id (when it is not
/// already a key), then the hash symbol, then one symbol per aggregate call.
///
/// With several grouping sets the input carries a group id column, and a row belongs to the
/// set whose position equals its group id.
#[derive(Debug, Clone)]
pub struct AggregationNode {
    id: PlanNodeId,
    source: ArcDistPlanNode,
    aggregations: Vec<(Symbol, Aggregation)>,
    grouping_sets: GroupingSets,
    pre_grouped_symbols: Vec<Symbol>,
    step: AggregationStep,
    hash_symbol: Option<Symbol>,
    group_id_symbol: Option<Symbol>,
}

impl AggregationNode {
    pub fn builder(id: PlanNodeId, source: ArcDistPlanNode) -> AggregationNodeBuilder {
        AggregationNodeBuilder {
            id,
            source,
            aggregations: vec![],
            grouping_sets: GroupingSets::global(),
            pre_grouped_symbols: vec![],
            step: AggregationStep::Single,
            hash_symbol: None,
            group_id_symbol: None,
        }
    }

    /// A builder pre-filled with every field of this node.
    pub fn to_builder(&self) -> AggregationNodeBuilder {
        AggregationNodeBuilder {
            id: self.id,
            source: self.source.clone(),
            aggregations: self.aggregations.clone(),
            grouping_sets: self.grouping_sets.clone(),
            pre_grouped_symbols: self.pre_grouped_symbols.clone(),
            step: self.step,
            hash_symbol: self.hash_symbol.clone(),
            group_id_symbol: self.group_id_symbol.clone(),
        }
    }

    pub fn id(&self) -> PlanNodeId {
        self.id
    }

    pub fn source(&self) -> &ArcDistPlanNode {
        &self.source
    }

    pub fn aggregations(&self) -> &[(Symbol, Aggregation)] {
        &self.aggregations
    }

    pub fn grouping_sets(&self) -> &GroupingSets {
        &self.grouping_sets
    }

    pub fn pre_grouped_symbols(&self) -> &[Symbol] {
        &self.pre_grouped_symbols
    }

    pub fn step(&self) -> AggregationStep {
        self.step
    }

    pub fn hash_symbol(&self) -> Option<&Symbol> {
        self.hash_symbol.as_ref()
    }

    pub fn group_id_symbol(&self) -> Option<&Symbol> {
        self.group_id_symbol.as_ref()
    }

    /// All grouping keys including the group id symbol.
    pub fn grouping_keys(&self) -> Vec<Symbol> {
        let mut keys = self.grouping_sets.grouping_keys();
        if let Some(group_id) = &self.group_id_symbol {
            if !keys.contains(group_id) {
                keys.push(group_id.clone());
            }
        }
        keys
    }

    pub fn has_empty_grouping_set(&self) -> bool {
        self.grouping_sets.has_empty_grouping_set()
    }

    pub fn has_non_empty_grouping_set(&self) -> bool {
        self.grouping_sets.has_non_empty_grouping_set()
    }

    pub fn has_ordering(&self) -> bool {
        self.aggregations
            .iter()
            .any(|(_, aggregation)| aggregation.ordering_scheme().is_some())
    }

    pub fn output_symbols(&self) -> Vec<Symbol> {
        self.grouping_keys()
            .into_iter()
            .chain(self.hash_symbol.clone())
            .chain(self.aggregations.iter().map(|(symbol, _)| symbol.clone()))
            .collect()
    }

    pub fn into_plan_node(self) -> ArcDistPlanNode {
        DistPlanNode::Aggregation(self).into()
    }

    fn validate(&self) -> Result<()> {
        const NODE: &str = "Aggregation";
        check(self.grouping_sets.grouping_set_count() > 0, NODE, || {
            "at least one grouping set is required".into()
        })?;
        // Rows of different grouping sets are told apart by the group id.
        check(
            self.grouping_sets.grouping_set_count() == 1 || self.group_id_symbol.is_some(),
            NODE,
            || {
                format!(
                    "grouping sets {} need a group id symbol",
                    self.grouping_sets
                )
            },
        )?;
        check_unique(NODE, "outputs", &self.output_symbols())?;
        check_subset(
            NODE,
            "pre-grouped symbols",
            &self.pre_grouped_symbols,
            &self.grouping_keys(),
        )?;
        check(
            self.step == AggregationStep::Single || !self.has_ordering(),
            NODE,
            || format!("ordered aggregations cannot run as a {} step", self.step),
        )?;

        let inputs = self
            .grouping_keys()
            .into_iter()
            .chain(self.hash_symbol.clone())
            .chain(
                self.aggregations
                    .iter()
                    .flat_map(|(_, aggregation)| aggregation.referenced_symbols()),
            )
            .unique()
            .collect_vec();
        check_subset(NODE, "inputs", &inputs, &self.source.output_symbols())
    }
}

impl From<AggregationNode> for DistPlanNode {
    fn from(node: AggregationNode) -> Self {
        DistPlanNode::Aggregation(node)
    }
}

pub struct AggregationNodeBuilder {
    id: PlanNodeId,
    source: ArcDistPlanNode,
    aggregations: Vec<(Symbol, Aggregation)>,
    grouping_sets: GroupingSets,
    pre_grouped_symbols: Vec<Symbol>,
    step: AggregationStep,
    hash_symbol: Option<Symbol>,
    group_id_symbol: Option<Symbol>,
}

impl AggregationNodeBuilder {
    pub fn id(mut self, id: PlanNodeId) -> Self {
        self.id = id;
        self
    }

    pub fn source(mut self, source: ArcDistPlanNode) -> Self {
        self.source = source;
        self
    }

    pub fn aggregations(mut self, aggregations: Vec<(Symbol, Aggregation)>) -> Self {
        self.aggregations = aggregations;
        self
    }

    pub fn add_aggregation(mut self, output: Symbol, aggregation: Aggregation) -> Self {
        self.aggregations.push((output, aggregation));
        self
    }

    pub fn grouping_sets(mut self, grouping_sets: GroupingSets) -> Self {
        self.grouping_sets = grouping_sets;
        self
    }

    pub fn group_by(self, keys: Vec<Symbol>) -> Self {
        self.grouping_sets(GroupingSets::single(keys))
    }

    pub fn pre_grouped_symbols(mut self, pre_grouped_symbols: Vec<Symbol>) -> Self {
        self.pre_grouped_symbols = pre_grouped_symbols;
        self
    }

    pub fn step(mut self, step: AggregationStep) -> Self {
        self.step = step;
        self
    }

    pub fn hash_symbol(mut self, hash_symbol: Option<Symbol>) -> Self {
        self.hash_symbol = hash_symbol;
        self
    }

    pub fn group_id_symbol(mut self, group_id_symbol: Option<Symbol>) -> Self {
        self.group_id_symbol = group_id_symbol;
        self
    }

    pub fn build(self) -> Result<AggregationNode> {
        let node = AggregationNode {
            id: self.id,
            source: self.source,
            aggregations: self.aggregations,
            grouping_sets: self.grouping_sets,
            pre_grouped_symbols: self.pre_grouped_symbols,
            step: self.step,
            hash_symbol: self.hash_symbol,
            group_id_symbol: self.group_id_symbol,
        };
        node.validate()?;
        Ok(node)
    }
}
