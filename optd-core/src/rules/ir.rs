use crate::nodes::PlanNode;

/// A node predicate evaluated after the node type matched.
pub type NodePredicate<P> = fn(&P) -> bool;

pub enum RuleMatcher<P: PlanNode> {
    /// Match a node of type `typ` whose children match `children`.
    MatchNode {
        typ: P::Typ,
        predicate: Option<NodePredicate<P>>,
        children: Vec<Self>,
    },
    /// Match a node of type `typ` and pick it.
    MatchAndPickNode {
        typ: P::Typ,
        predicate: Option<NodePredicate<P>>,
        children: Vec<Self>,
        pick_to: usize,
    },
    /// Match any node and pick it.
    PickOne { pick_to: usize },
    /// Ignore one child.
    IgnoreOne,
    /// Ignore all remaining children. Only valid as the last child matcher.
    IgnoreMany,
}
