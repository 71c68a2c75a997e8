//! The node abstraction every optimizer component is generic over.

use std::{
    fmt::{Debug, Display},
    hash::Hash,
    sync::Arc,
};

use anyhow::Result;

/// The kind tag of a plan node. Matchers compare tags, never whole nodes.
pub trait NodeType:
    'static + Clone + Copy + Eq + PartialEq + Hash + Debug + Display + Send + Sync
{
}

/// Identifier of a plan node, unique within one compilation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct PlanNodeId(pub usize);

impl Display for PlanNodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out plan node ids. One allocator per compilation; ids are never reused.
#[derive(Debug, Default)]
pub struct PlanNodeIdAllocator {
    next_id: usize,
}

impl PlanNodeIdAllocator {
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Starts handing out ids at `next_id`, e.g. after the ids already used by an incoming plan.
    pub fn starting_at(next_id: usize) -> Self {
        Self { next_id }
    }

    pub fn next_id(&mut self) -> PlanNodeId {
        let id = PlanNodeId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// An immutable plan tree node. Rewrites build new nodes and never mutate existing ones.
pub trait PlanNode: 'static + Debug + Send + Sync + Sized {
    type Typ: NodeType;

    fn typ(&self) -> Self::Typ;

    fn id(&self) -> PlanNodeId;

    fn children(&self) -> Vec<ArcPlanNode<Self>>;

    /// Builds a copy of this node (same id) over `children`. The number of children must not change.
    fn with_children(&self, children: Vec<ArcPlanNode<Self>>) -> Result<ArcPlanNode<Self>>;
}

pub type ArcPlanNode<P> = Arc<P>;
