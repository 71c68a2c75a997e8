use crate::{
    nodes::{ArcPlanNode, PlanNode},
    rules::{ir::NodePredicate, Picks, RuleMatcher},
};

/// Matches `node` against `matcher`. Returns the picked nodes on success. A failed match has no
/// side effects.
pub fn match_and_pick<P: PlanNode>(
    matcher: &RuleMatcher<P>,
    node: &ArcPlanNode<P>,
) -> Option<Picks<P>> {
    let mut picks = Picks::new();
    if match_into(matcher, node, &mut picks) {
        Some(picks)
    } else {
        None
    }
}

fn match_into<P: PlanNode>(
    matcher: &RuleMatcher<P>,
    node: &ArcPlanNode<P>,
    picks: &mut Picks<P>,
) -> bool {
    match matcher {
        RuleMatcher::MatchNode {
            typ,
            predicate,
            children,
        } => match_node(*typ, *predicate, children, None, node, picks),
        RuleMatcher::MatchAndPickNode {
            typ,
            predicate,
            children,
            pick_to,
        } => match_node(*typ, *predicate, children, Some(*pick_to), node, picks),
        RuleMatcher::PickOne { pick_to } => {
            picks.insert(*pick_to, node.clone());
            true
        }
        RuleMatcher::IgnoreOne | RuleMatcher::IgnoreMany => true,
    }
}

fn match_node<P: PlanNode>(
    typ: P::Typ,
    predicate: Option<NodePredicate<P>>,
    children: &[RuleMatcher<P>],
    pick_to: Option<usize>,
    node: &ArcPlanNode<P>,
    picks: &mut Picks<P>,
) -> bool {
    if node.typ() != typ {
        return false;
    }
    if let Some(predicate) = predicate {
        if !predicate(node.as_ref()) {
            return false;
        }
    }

    let node_children = node.children();
    let (fixed, open_ended) = match children.last() {
        Some(RuleMatcher::IgnoreMany) => (&children[..children.len() - 1], true),
        _ => (children, false),
    };
    if node_children.len() < fixed.len() || (!open_ended && node_children.len() != fixed.len()) {
        return false;
    }

    for (child_matcher, child) in fixed.iter().zip(node_children.iter()) {
        assert!(
            !matches!(child_matcher, RuleMatcher::IgnoreMany),
            "many matcher should be at the end"
        );
        if !match_into(child_matcher, child, picks) {
            return false;
        }
    }

    if let Some(pick_to) = pick_to {
        picks.insert(pick_to, node.clone());
    }
    true
}
