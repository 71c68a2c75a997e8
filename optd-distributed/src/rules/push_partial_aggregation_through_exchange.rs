use std::iter;

use anyhow::Result;
use itertools::Itertools;
use optd_core::{error::OptimizerError, nodes::PlanNode};
use tracing::trace;

use super::macros::define_rule;
use crate::{
    context::PlanningContext,
    metadata::Metadata,
    plan_nodes::{
        Aggregation, AggregationNode, AggregationStep, ArcDistPlanNode, DistPlanNode,
        ExchangeNode, ExchangeType, PartitioningScheme, ProjectNode,
    },
    symbol_mapper::SymbolMapper,
};

const RULE: &str = "push_partial_aggregation_through_exchange";

define_rule!(
    PushPartialAggregationThroughExchange,
    apply_push_partial_aggregation_through_exchange,
    (Aggregation => aggregation, [(Exchange if exchange_is_unordered => exchange)])
);

fn exchange_is_unordered(node: &DistPlanNode) -> bool {
    node.as_exchange()
        .is_some_and(|exchange| exchange.ordering_scheme().is_none())
}

/// Whether every aggregate can be computed as a partial step below the exchange and a final
/// step above it. DISTINCT and ORDER BY aggregates need all their input in one place.
fn is_decomposable(node: &AggregationNode, metadata: &dyn Metadata) -> bool {
    node.aggregations().iter().all(|(_, aggregation)| {
        !aggregation.is_distinct()
            && aggregation.ordering_scheme().is_none()
            && metadata.is_decomposable(aggregation.function())
    })
}

fn not_applicable(node: &AggregationNode, reason: &str) -> Result<Vec<ArcDistPlanNode>> {
    trace!(event = "rule_not_applicable", rule = RULE, node_id = %node.id(), reason);
    Ok(vec![])
}

fn apply_push_partial_aggregation_through_exchange(
    context: &mut PlanningContext,
    PushPartialAggregationThroughExchangePicks {
        aggregation,
        exchange,
    }: PushPartialAggregationThroughExchangePicks,
) -> Result<Vec<ArcDistPlanNode>> {
    let (Some(aggregation), Some(exchange)) = (aggregation.as_aggregation(), exchange.as_exchange())
    else {
        return Err(OptimizerError::invariant(RULE, "matched nodes of unexpected kinds").into());
    };
    let decomposable = is_decomposable(aggregation, context.metadata());

    // A global grouping set must produce exactly one row, which a single-step aggregation
    // in a partitioned stage cannot guarantee.
    if aggregation.step() == AggregationStep::Single
        && aggregation.has_empty_grouping_set()
        && aggregation.has_non_empty_grouping_set()
        && exchange.exchange_type() == ExchangeType::Repartition
    {
        if !decomposable {
            return Err(OptimizerError::invariant(
                RULE,
                format!(
                    "aggregation {} over grouping sets {} must be split but is not decomposable",
                    aggregation.id(),
                    aggregation.grouping_sets()
                ),
            )
            .into());
        }
        return Ok(vec![split(aggregation, context)?]);
    }

    if !decomposable {
        return not_applicable(aggregation, "not decomposable");
    }
    if !context.session().prefer_partial_aggregation {
        return not_applicable(aggregation, "partial aggregation disabled");
    }

    let scheme = exchange.partitioning_scheme();
    // Only exchanges that keep every row exactly once.
    if !matches!(
        exchange.exchange_type(),
        ExchangeType::Gather | ExchangeType::Repartition
    ) || scheme.is_replicate_nulls_and_any()
    {
        return not_applicable(aggregation, "exchange duplicates rows");
    }
    if exchange.exchange_type() == ExchangeType::Repartition {
        let grouping_keys = aggregation.grouping_keys();
        let partitioned_by_keys = scheme
            .partitioning()
            .columns()
            .iter()
            .all(|column| grouping_keys.contains(column));
        if !partitioned_by_keys {
            return not_applicable(aggregation, "partitioning columns are not grouping keys");
        }
    }
    // TODO: support precomputed hashes by re-deriving them above the pushed aggregation.
    if aggregation.hash_symbol().is_some() || scheme.hash_column().is_some() {
        return not_applicable(aggregation, "precomputed hash");
    }

    match aggregation.step() {
        AggregationStep::Single => Ok(vec![split(aggregation, context)?]),
        AggregationStep::Partial => Ok(vec![push_partial_to_branches(
            aggregation,
            exchange,
            context,
        )?]),
        AggregationStep::Final => not_applicable(aggregation, "final step"),
    }
}

/// Splits a single-step aggregation into FINAL (keeping the original id) over PARTIAL.
fn split(node: &AggregationNode, context: &mut PlanningContext) -> Result<ArcDistPlanNode> {
    let mut intermediate_aggregations = Vec::with_capacity(node.aggregations().len());
    let mut final_aggregations = Vec::with_capacity(node.aggregations().len());
    for (output, aggregation) in node.aggregations() {
        if aggregation.ordering_scheme().is_some() {
            return Err(OptimizerError::invariant(
                RULE,
                format!("cannot split ordered aggregation {} := {}", output, aggregation),
            )
            .into());
        }
        let function = aggregation.function();
        let intermediate_type = context.metadata().intermediate_type(function)?;
        let intermediate = context.new_symbol(function.name(), intermediate_type);
        intermediate_aggregations.push((intermediate.clone(), aggregation.clone()));

        let lambdas = aggregation
            .arguments()
            .iter()
            .filter(|argument| argument.is_lambda())
            .cloned();
        final_aggregations.push((
            output.clone(),
            Aggregation::new(
                function.clone(),
                iter::once(intermediate.to_expression())
                    .chain(lambdas)
                    .collect(),
            ),
        ));
    }

    let partial = node
        .to_builder()
        .id(context.next_id())
        .aggregations(intermediate_aggregations)
        .pre_grouped_symbols(vec![])
        .step(AggregationStep::Partial)
        .build()?;
    let final_aggregation = node
        .to_builder()
        .source(partial.into_plan_node())
        .aggregations(final_aggregations)
        .pre_grouped_symbols(vec![])
        .step(AggregationStep::Final)
        .build()?;
    trace!(
        event = "split_aggregation",
        rule = RULE,
        node_id = %node.id(),
        aggregations = node.aggregations().len()
    );
    Ok(final_aggregation.into_plan_node())
}

/// Copies a partial aggregation onto every branch of `exchange`, renaming it into each
/// branch's namespace and projecting its outputs back to the original symbols.
fn push_partial_to_branches(
    aggregation: &AggregationNode,
    exchange: &ExchangeNode,
    context: &mut PlanningContext,
) -> Result<ArcDistPlanNode> {
    let outputs = aggregation.output_symbols();
    let node = DistPlanNode::Aggregation(aggregation.clone());

    let mut partials = Vec::with_capacity(exchange.sources().len());
    for (source, inputs) in exchange.sources().iter().zip_eq(exchange.inputs()) {
        let mapper = SymbolMapper::build(
            exchange
                .output_symbols()
                .iter()
                .cloned()
                .zip_eq(inputs.iter().cloned()),
        )?;
        let mapped = mapper.map_subtree(&node, source.clone(), context)?;
        let assignments = outputs
            .iter()
            .map(|output| (output.clone(), mapper.map_symbol(output).to_expression()))
            .collect();
        let project = ProjectNode::new(context.next_id(), mapped, assignments)?;
        if project.output_symbols() != outputs {
            return Err(OptimizerError::invariant(
                RULE,
                format!(
                    "branch {} produces [{}] instead of [{}]",
                    source.id(),
                    project.output_symbols().iter().join(", "),
                    outputs.iter().join(", ")
                ),
            )
            .into());
        }
        partials.push(project.into_plan_node());
    }

    // The partitioning columns are grouping keys, which the partial aggregation passes
    // through under their original names.
    let scheme = exchange.partitioning_scheme();
    let partitioning_scheme = PartitioningScheme::new(scheme.partitioning().clone(), outputs.clone())
        .with_bucket_to_partition(scheme.bucket_to_partition().map(<[usize]>::to_vec));
    let inputs = vec![outputs; partials.len()];
    let pushed = ExchangeNode::new(
        context.next_id(),
        exchange.exchange_type(),
        exchange.scope(),
        partitioning_scheme,
        partials,
        inputs,
        None,
    )?;
    trace!(
        event = "push_partial_aggregation",
        rule = RULE,
        node_id = %aggregation.id(),
        exchange_id = %exchange.id(),
        branches = pushed.sources().len()
    );
    Ok(pushed.into_plan_node())
}
