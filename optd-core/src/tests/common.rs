use std::sync::Arc;

use anyhow::{ensure, Result};
use itertools::Itertools;

use crate::nodes::{ArcPlanNode, NodeType, PlanNode, PlanNodeId, PlanNodeIdAllocator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum TestNodeType {
    Scan,
    Filter,
    Project,
    Sort,
    Join,
}

impl std::fmt::Display for TestNodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl NodeType for TestNodeType {}

#[derive(Debug)]
pub(crate) struct TestNode {
    pub id: PlanNodeId,
    pub typ: TestNodeType,
    pub table: Option<String>,
    pub children: Vec<Arc<TestNode>>,
}

impl PlanNode for TestNode {
    type Typ = TestNodeType;

    fn typ(&self) -> TestNodeType {
        self.typ
    }

    fn id(&self) -> PlanNodeId {
        self.id
    }

    fn children(&self) -> Vec<ArcPlanNode<Self>> {
        self.children.clone()
    }

    fn with_children(&self, children: Vec<ArcPlanNode<Self>>) -> Result<ArcPlanNode<Self>> {
        ensure!(children.len() == self.children.len(), "children size changed");
        Ok(Arc::new(TestNode {
            id: self.id,
            typ: self.typ,
            table: self.table.clone(),
            children,
        }))
    }
}

pub(crate) fn scan(ids: &mut PlanNodeIdAllocator, table: &str) -> Arc<TestNode> {
    Arc::new(TestNode {
        id: ids.next_id(),
        typ: TestNodeType::Scan,
        table: Some(table.to_string()),
        children: vec![],
    })
}

pub(crate) fn node(
    ids: &mut PlanNodeIdAllocator,
    typ: TestNodeType,
    children: Vec<Arc<TestNode>>,
) -> Arc<TestNode> {
    Arc::new(TestNode {
        id: ids.next_id(),
        typ,
        table: None,
        children,
    })
}

pub(crate) fn explain(node: &TestNode) -> String {
    let mut parts = vec![node.typ.to_string()];
    parts.extend(node.table.clone());
    parts.extend(node.children.iter().map(|child| explain(child)));
    format!("({})", parts.iter().join(" "))
}
