use std::sync::Arc;

use anyhow::{Context, Result};
use arrow_schema::DataType;
use optd_distributed::{
    config::SessionConfig,
    context::PlanningContext,
    metadata::{FunctionRegistry, FunctionSignature},
    plan_nodes::{
        Aggregation, AggregationNode, ExchangeNode, ExchangeScope, ExchangeType, Partitioning,
        PartitioningScheme, SourceNode,
    },
    symbol::Symbol,
    DistributedOptimizer,
};
use tracing::Level;

pub fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .init();

    let session = match std::env::args().nth(1) {
        Some(path) => SessionConfig::from_json(
            &std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read session properties from {}", path))?,
        )?,
        None => SessionConfig::default(),
    };
    let mut context = PlanningContext::new(Arc::new(FunctionRegistry::with_builtins()), session);

    // SELECT k, SUM(x) FROM t GROUP BY k, with t spread over two remote fragments
    let k = Symbol::new("k", DataType::Int64);
    let x = Symbol::new("x", DataType::Int64);
    let remote_k = Symbol::new("k_remote", DataType::Int64);
    let remote_x = Symbol::new("x_remote", DataType::Int64);
    let local = SourceNode::new(context.next_id(), "t_local", vec![k.clone(), x.clone()])?;
    let remote = SourceNode::new(
        context.next_id(),
        "t_remote",
        vec![remote_k.clone(), remote_x.clone()],
    )?;
    let exchange = ExchangeNode::new(
        context.next_id(),
        ExchangeType::Repartition,
        ExchangeScope::Remote,
        PartitioningScheme::new(
            Partitioning::hashed(vec![k.clone()]),
            vec![k.clone(), x.clone()],
        ),
        vec![local.into_plan_node(), remote.into_plan_node()],
        vec![vec![k.clone(), x.clone()], vec![remote_k, remote_x]],
        None,
    )?;
    let total = Symbol::new("total", DataType::Int64);
    let plan = AggregationNode::builder(context.next_id(), exchange.into_plan_node())
        .group_by(vec![k])
        .add_aggregation(
            total,
            Aggregation::new(
                FunctionSignature::new("sum", vec![DataType::Int64], DataType::Int64),
                vec![x.to_expression()],
            ),
        )
        .build()?
        .into_plan_node();

    println!("{}", plan.explain_to_string());

    let mut optimizer = DistributedOptimizer::new(context);
    let optimized = optimizer.optimize(plan)?;
    println!("{}", optimized.explain_to_string());
    Ok(())
}
