#![allow(clippy::new_without_default)]

use std::sync::Arc;

use anyhow::Result;
use optd_core::{
    heuristics::{ApplyOrder, HeuristicsOptimizer},
    nodes::PlanNode,
    optimizer::Optimizer,
    rules::Rule,
};
use tracing::debug;

use context::PlanningContext;
use plan_nodes::{ArcDistPlanNode, DistPlanNode};
use rules::PushPartialAggregationThroughExchange;

pub mod config;
pub mod context;
mod explain;
pub mod expr;
pub mod metadata;
pub mod plan_nodes;
pub mod rules;
pub mod symbol;
pub mod symbol_mapper;
#[cfg(test)]
mod testing;

/// Rewrites distributed plans with the heuristic rule set until none of the rules fires.
pub struct DistributedOptimizer {
    heuristic_optimizer: HeuristicsOptimizer<DistPlanNode, PlanningContext>,
}

impl DistributedOptimizer {
    pub fn default_heuristic_rules() -> Vec<Arc<dyn Rule<DistPlanNode, PlanningContext>>> {
        vec![Arc::new(PushPartialAggregationThroughExchange::new())]
    }

    pub fn new(context: PlanningContext) -> Self {
        let max_passes = context.session().optimizer_max_passes;
        Self {
            heuristic_optimizer: HeuristicsOptimizer::new_with_rules(
                Self::default_heuristic_rules(),
                ApplyOrder::BottomUp,
                context,
            )
            .with_max_passes(max_passes),
        }
    }

    pub fn optimize(&mut self, root: ArcDistPlanNode) -> Result<ArcDistPlanNode> {
        self.heuristic_optimizer
            .context_mut()
            .register_plan(&root);
        let root_id = root.id();
        let optimized = self.heuristic_optimizer.optimize(root)?;
        debug!(event = "optimized", root_id = %root_id, new_root_id = %optimized.id());
        Ok(optimized)
    }

    pub fn context(&self) -> &PlanningContext {
        self.heuristic_optimizer.context()
    }
}
