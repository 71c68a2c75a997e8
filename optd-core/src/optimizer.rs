use anyhow::Result;

use crate::nodes::{ArcPlanNode, PlanNode};

pub trait Optimizer<P: PlanNode> {
    fn optimize(&mut self, root_rel: ArcPlanNode<P>) -> Result<ArcPlanNode<P>>;
}
