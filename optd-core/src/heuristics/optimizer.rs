use std::sync::Arc;

use anyhow::{ensure, Result};
use tracing::{debug, trace};

use crate::{
    error::OptimizerError,
    nodes::{ArcPlanNode, PlanNode},
    optimizer::Optimizer,
    rules::{match_and_pick, Rule},
};

pub const DEFAULT_MAX_PASSES: usize = 32;

// Grow the stack instead of overflowing on deep plans.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROWTH: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOrder {
    TopDown,
    BottomUp,
}

/// Applies a fixed list of rules over a plan tree until none of them fires.
///
/// One pass visits every node once in `apply_order`. At each node the rules are tried in
/// order, and a rule that returns a replacement swaps the node before the next rule is
/// tried. Passes repeat until a pass leaves the tree unchanged.
pub struct HeuristicsOptimizer<P: PlanNode, C> {
    rules: Arc<[Arc<dyn Rule<P, C>>]>,
    apply_order: ApplyOrder,
    context: C,
    max_passes: usize,
}

impl<P: PlanNode, C: 'static> HeuristicsOptimizer<P, C> {
    pub fn new_with_rules(
        rules: Vec<Arc<dyn Rule<P, C>>>,
        apply_order: ApplyOrder,
        context: C,
    ) -> Self {
        Self {
            rules: rules.into(),
            apply_order,
            context,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    pub fn into_context(self) -> C {
        self.context
    }

    fn apply_rules(&mut self, mut node: ArcPlanNode<P>) -> Result<(ArcPlanNode<P>, bool)> {
        let mut changed = false;
        for rule in self.rules.iter() {
            let Some(picks) = match_and_pick(rule.matcher(), &node) else {
                continue;
            };
            let mut results = rule.apply(&mut self.context, picks)?;
            ensure!(
                results.len() <= 1,
                "heuristic rule {} returned {} alternatives",
                rule.name(),
                results.len()
            );
            if let Some(result) = results.pop() {
                trace!(
                    event = "apply_rule",
                    rule = rule.name(),
                    node_id = %node.id(),
                    new_node_id = %result.id()
                );
                node = result;
                changed = true;
            }
        }
        Ok((node, changed))
    }

    fn optimize_inputs(&mut self, node: ArcPlanNode<P>) -> Result<(ArcPlanNode<P>, bool)> {
        let children = node.children();
        if children.is_empty() {
            return Ok((node, false));
        }
        let mut changed = false;
        let mut new_children = Vec::with_capacity(children.len());
        for child in children {
            let (new_child, child_changed) = self.optimize_inner(child)?;
            changed |= child_changed;
            new_children.push(new_child);
        }
        if !changed {
            return Ok((node, false));
        }
        Ok((node.with_children(new_children)?, true))
    }

    fn optimize_inner(&mut self, node: ArcPlanNode<P>) -> Result<(ArcPlanNode<P>, bool)> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || match self.apply_order {
            ApplyOrder::BottomUp => {
                let (node, children_changed) = self.optimize_inputs(node)?;
                let (node, changed) = self.apply_rules(node)?;
                Ok((node, children_changed || changed))
            }
            ApplyOrder::TopDown => {
                let (node, changed) = self.apply_rules(node)?;
                let (node, children_changed) = self.optimize_inputs(node)?;
                Ok((node, changed || children_changed))
            }
        })
    }
}

impl<P: PlanNode, C: 'static> Optimizer<P> for HeuristicsOptimizer<P, C> {
    fn optimize(&mut self, root_rel: ArcPlanNode<P>) -> Result<ArcPlanNode<P>> {
        let mut root_rel = root_rel;
        for pass in 0..self.max_passes {
            let (new_root, changed) = self.optimize_inner(root_rel)?;
            root_rel = new_root;
            if !changed {
                debug!(event = "fixpoint", passes = pass + 1, root_id = %root_rel.id());
                return Ok(root_rel);
            }
        }
        Err(OptimizerError::NoFixpoint {
            passes: self.max_passes,
        }
        .into())
    }
}
