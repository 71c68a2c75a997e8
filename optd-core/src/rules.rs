mod ir;
mod matcher;

use std::collections::HashMap;

use anyhow::{anyhow, Result};

pub use ir::{NodePredicate, RuleMatcher};
pub use matcher::match_and_pick;

use crate::nodes::{ArcPlanNode, PlanNode};

/// A rewrite rule. `C` is the per-compilation planning context the rule allocates ids and
/// symbols from; it is borrowed mutably so a compilation has exactly one writer.
///
/// `apply` returns the replacement for the matched node, or an empty vector when the rule
/// does not apply. An `Err` aborts the compilation.
pub trait Rule<P: PlanNode, C>: 'static + Send + Sync {
    fn matcher(&self) -> &RuleMatcher<P>;
    fn apply(&self, context: &mut C, picks: Picks<P>) -> Result<Vec<ArcPlanNode<P>>>;
    fn name(&self) -> &'static str;
}

/// Nodes recorded by a successful match, keyed by the `pick_to` slot of the matcher that
/// picked them.
#[derive(Debug)]
pub struct Picks<P: PlanNode> {
    nodes: HashMap<usize, ArcPlanNode<P>>,
}

impl<P: PlanNode> Picks<P> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, pick_to: usize, node: ArcPlanNode<P>) {
        let res = self.nodes.insert(pick_to, node);
        assert!(res.is_none(), "dup pick");
    }

    pub fn get(&self, pick_to: usize) -> Option<&ArcPlanNode<P>> {
        self.nodes.get(&pick_to)
    }

    pub fn take(&mut self, pick_to: usize) -> Result<ArcPlanNode<P>> {
        self.nodes
            .remove(&pick_to)
            .ok_or_else(|| anyhow!("no node was picked into slot {}", pick_to))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
