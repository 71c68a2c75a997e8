//! Plan builders and a row-level evaluator shared by the unit tests.

pub(crate) mod executor;

use anyhow::Result;
use arrow_schema::DataType;
use itertools::Itertools;
use optd_core::rules::{match_and_pick, Rule};

use crate::{
    context::PlanningContext,
    metadata::FunctionSignature,
    plan_nodes::{
        Aggregation, AggregationNode, AggregationNodeBuilder, ArcDistPlanNode, DistPlanNode,
        ExchangeNode, ExchangeScope, ExchangeType, Partitioning, PartitioningScheme, SourceNode,
    },
    symbol::Symbol,
};

pub(crate) fn int(name: &str) -> Symbol {
    Symbol::new(name, DataType::Int64)
}

pub(crate) fn symbols(names: &[&str]) -> Vec<Symbol> {
    names.iter().map(|name| int(name)).collect()
}

pub(crate) fn aggregate(name: &str, argument: &Symbol) -> Aggregation {
    let return_type = match name {
        "count" => DataType::Int64,
        _ => argument.typ().clone(),
    };
    Aggregation::new(
        FunctionSignature::new(name, vec![argument.typ().clone()], return_type),
        vec![argument.to_expression()],
    )
}

pub(crate) fn sum(argument: &Symbol) -> Aggregation {
    aggregate("sum", argument)
}

pub(crate) fn count(argument: &Symbol) -> Aggregation {
    aggregate("count", argument)
}

/// A leaf named `name` producing Int64 columns.
pub(crate) fn source(ctx: &mut PlanningContext, name: &str, columns: &[&str]) -> ArcDistPlanNode {
    let node = SourceNode::new(ctx.next_id(), name, symbols(columns))
        .unwrap()
        .into_plan_node();
    ctx.register_plan(&node);
    node
}

/// An exchange over `sources` whose outputs are named after the first source's columns. Every
/// branch feeds its own outputs position by position.
pub(crate) fn exchange(
    ctx: &mut PlanningContext,
    exchange_type: ExchangeType,
    partitioning: Partitioning,
    sources: Vec<ArcDistPlanNode>,
    customize: impl FnOnce(PartitioningScheme) -> PartitioningScheme,
) -> ExchangeNode {
    let outputs = sources[0].output_symbols();
    let inputs = sources.iter().map(|source| source.output_symbols()).collect_vec();
    ExchangeNode::new(
        ctx.next_id(),
        exchange_type,
        ExchangeScope::Remote,
        customize(PartitioningScheme::new(partitioning, outputs)),
        sources,
        inputs,
        None,
    )
    .unwrap()
}

pub(crate) fn repartition(
    ctx: &mut PlanningContext,
    sources: Vec<ArcDistPlanNode>,
    keys: &[&str],
) -> ArcDistPlanNode {
    exchange(
        ctx,
        ExchangeType::Repartition,
        Partitioning::hashed(symbols(keys)),
        sources,
        |scheme| scheme,
    )
    .into_plan_node()
}

pub(crate) fn gather(ctx: &mut PlanningContext, sources: Vec<ArcDistPlanNode>) -> ArcDistPlanNode {
    exchange(
        ctx,
        ExchangeType::Gather,
        Partitioning::single(),
        sources,
        |scheme| scheme,
    )
    .into_plan_node()
}

pub(crate) fn aggregation(
    ctx: &mut PlanningContext,
    source: ArcDistPlanNode,
) -> AggregationNodeBuilder {
    AggregationNode::builder(ctx.next_id(), source)
}

/// Registers `plan` with `ctx` and runs `rule` once on its root. A root the rule does not
/// match yields no replacement.
pub(crate) fn apply_rule(
    rule: &dyn Rule<DistPlanNode, PlanningContext>,
    ctx: &mut PlanningContext,
    plan: &ArcDistPlanNode,
) -> Result<Vec<ArcDistPlanNode>> {
    ctx.register_plan(plan);
    match match_and_pick(rule.matcher(), plan) {
        Some(picks) => rule.apply(ctx, picks),
        None => Ok(vec![]),
    }
}
