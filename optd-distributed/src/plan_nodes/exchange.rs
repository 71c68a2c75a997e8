use anyhow::Result;
use itertools::Itertools;
use optd_core::nodes::{PlanNode, PlanNodeId};

use super::{check, check_subset, check_unique, ArcDistPlanNode, DistPlanNode, OrderingScheme};
use crate::{expr::Value, symbol::Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeType {
    /// Funnel every row into a single stream.
    Gather,
    /// Route each row to the partition chosen by the partitioning function.
    Repartition,
    /// Send every row to every partition.
    Replicate,
}

impl std::fmt::Display for ExchangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangeType::Gather => write!(f, "GATHER"),
            ExchangeType::Repartition => write!(f, "REPARTITION"),
            ExchangeType::Replicate => write!(f, "REPLICATE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeScope {
    /// Between threads of one worker.
    Local,
    /// Between workers.
    Remote,
}

impl std::fmt::Display for ExchangeScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangeScope::Local => write!(f, "LOCAL"),
            ExchangeScope::Remote => write!(f, "REMOTE"),
        }
    }
}

/// The partitioning function of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitioningHandle {
    Single,
    FixedHash,
    FixedArbitrary,
    FixedBroadcast,
}

impl std::fmt::Display for PartitioningHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartitioningHandle::Single => write!(f, "SINGLE"),
            PartitioningHandle::FixedHash => write!(f, "FIXED_HASH"),
            PartitioningHandle::FixedArbitrary => write!(f, "FIXED_ARBITRARY"),
            PartitioningHandle::FixedBroadcast => write!(f, "FIXED_BROADCAST"),
        }
    }
}

/// An argument of a partitioning function: a column of the exchange output or a constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgumentBinding {
    Column(Symbol),
    Constant(Value),
}

impl ArgumentBinding {
    pub fn is_variable(&self) -> bool {
        matches!(self, ArgumentBinding::Column(_))
    }

    pub fn column(&self) -> Option<&Symbol> {
        match self {
            ArgumentBinding::Column(symbol) => Some(symbol),
            ArgumentBinding::Constant(_) => None,
        }
    }
}

impl std::fmt::Display for ArgumentBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgumentBinding::Column(symbol) => write!(f, "{}", symbol),
            ArgumentBinding::Constant(value) => write!(f, "{}", value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Partitioning {
    handle: PartitioningHandle,
    arguments: Vec<ArgumentBinding>,
}

impl Partitioning {
    pub fn new(handle: PartitioningHandle, arguments: Vec<ArgumentBinding>) -> Self {
        Self { handle, arguments }
    }

    pub fn single() -> Self {
        Self::new(PartitioningHandle::Single, vec![])
    }

    pub fn hashed(columns: Vec<Symbol>) -> Self {
        Self::new(
            PartitioningHandle::FixedHash,
            columns.into_iter().map(ArgumentBinding::Column).collect(),
        )
    }

    pub fn handle(&self) -> PartitioningHandle {
        self.handle
    }

    pub fn arguments(&self) -> &[ArgumentBinding] {
        &self.arguments
    }

    /// The variable (column) arguments.
    pub fn columns(&self) -> Vec<Symbol> {
        self.arguments
            .iter()
            .filter_map(ArgumentBinding::column)
            .cloned()
            .collect()
    }
}

impl std::fmt::Display for Partitioning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.handle, self.arguments.iter().join(", "))
    }
}

/// How an exchange partitions its output and which columns it emits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitioningScheme {
    partitioning: Partitioning,
    output_layout: Vec<Symbol>,
    hash_column: Option<Symbol>,
    replicate_nulls_and_any: bool,
    bucket_to_partition: Option<Vec<usize>>,
}

impl PartitioningScheme {
    pub fn new(partitioning: Partitioning, output_layout: Vec<Symbol>) -> Self {
        Self {
            partitioning,
            output_layout,
            hash_column: None,
            replicate_nulls_and_any: false,
            bucket_to_partition: None,
        }
    }

    pub fn with_hash_column(mut self, hash_column: Option<Symbol>) -> Self {
        self.hash_column = hash_column;
        self
    }

    pub fn with_replicate_nulls_and_any(mut self, replicate_nulls_and_any: bool) -> Self {
        self.replicate_nulls_and_any = replicate_nulls_and_any;
        self
    }

    pub fn with_bucket_to_partition(mut self, bucket_to_partition: Option<Vec<usize>>) -> Self {
        self.bucket_to_partition = bucket_to_partition;
        self
    }

    pub fn partitioning(&self) -> &Partitioning {
        &self.partitioning
    }

    pub fn output_layout(&self) -> &[Symbol] {
        &self.output_layout
    }

    pub fn hash_column(&self) -> Option<&Symbol> {
        self.hash_column.as_ref()
    }

    /// Whether rows with a null partitioning key (and one arbitrary row) go to every partition.
    pub fn is_replicate_nulls_and_any(&self) -> bool {
        self.replicate_nulls_and_any
    }

    pub fn bucket_to_partition(&self) -> Option<&[usize]> {
        self.bucket_to_partition.as_deref()
    }
}

/// Moves rows between streams. Every branch `i` feeds `inputs[i]`, which lines up
/// position-by-position with the output layout.
#[derive(Debug, Clone)]
pub struct ExchangeNode {
    id: PlanNodeId,
    exchange_type: ExchangeType,
    scope: ExchangeScope,
    partitioning_scheme: PartitioningScheme,
    sources: Vec<ArcDistPlanNode>,
    inputs: Vec<Vec<Symbol>>,
    ordering_scheme: Option<OrderingScheme>,
}

impl ExchangeNode {
    pub fn new(
        id: PlanNodeId,
        exchange_type: ExchangeType,
        scope: ExchangeScope,
        partitioning_scheme: PartitioningScheme,
        sources: Vec<ArcDistPlanNode>,
        inputs: Vec<Vec<Symbol>>,
        ordering_scheme: Option<OrderingScheme>,
    ) -> Result<Self> {
        let node = Self {
            id,
            exchange_type,
            scope,
            partitioning_scheme,
            sources,
            inputs,
            ordering_scheme,
        };
        node.validate()?;
        Ok(node)
    }

    /// A single-branch gathering exchange that passes every column of `source` through.
    pub fn gather(id: PlanNodeId, scope: ExchangeScope, source: ArcDistPlanNode) -> Result<Self> {
        let outputs = source.output_symbols();
        Self::new(
            id,
            ExchangeType::Gather,
            scope,
            PartitioningScheme::new(Partitioning::single(), outputs.clone()),
            vec![source],
            vec![outputs],
            None,
        )
    }

    /// A single-branch hash repartitioning exchange on `columns`.
    pub fn repartition(
        id: PlanNodeId,
        scope: ExchangeScope,
        source: ArcDistPlanNode,
        columns: Vec<Symbol>,
    ) -> Result<Self> {
        let outputs = source.output_symbols();
        Self::new(
            id,
            ExchangeType::Repartition,
            scope,
            PartitioningScheme::new(Partitioning::hashed(columns), outputs.clone()),
            vec![source],
            vec![outputs],
            None,
        )
    }

    pub fn id(&self) -> PlanNodeId {
        self.id
    }

    pub fn exchange_type(&self) -> ExchangeType {
        self.exchange_type
    }

    pub fn scope(&self) -> ExchangeScope {
        self.scope
    }

    pub fn partitioning_scheme(&self) -> &PartitioningScheme {
        &self.partitioning_scheme
    }

    pub fn sources(&self) -> &[ArcDistPlanNode] {
        &self.sources
    }

    pub fn inputs(&self) -> &[Vec<Symbol>] {
        &self.inputs
    }

    pub fn ordering_scheme(&self) -> Option<&OrderingScheme> {
        self.ordering_scheme.as_ref()
    }

    pub fn output_symbols(&self) -> &[Symbol] {
        self.partitioning_scheme.output_layout()
    }

    /// The same exchange over new branches. Branch outputs must still cover `inputs`.
    pub fn with_sources(&self, sources: Vec<ArcDistPlanNode>) -> Result<Self> {
        Self::new(
            self.id,
            self.exchange_type,
            self.scope,
            self.partitioning_scheme.clone(),
            sources,
            self.inputs.clone(),
            self.ordering_scheme.clone(),
        )
    }

    pub fn into_plan_node(self) -> ArcDistPlanNode {
        DistPlanNode::Exchange(self).into()
    }

    fn validate(&self) -> Result<()> {
        const NODE: &str = "Exchange";
        let outputs = self.output_symbols();
        check(!self.sources.is_empty(), NODE, || {
            "at least one source is required".into()
        })?;
        check(self.inputs.len() == self.sources.len(), NODE, || {
            format!(
                "{} input lists for {} sources",
                self.inputs.len(),
                self.sources.len()
            )
        })?;
        check_unique(NODE, "outputs", outputs)?;
        for (source, inputs) in self.sources.iter().zip_eq(&self.inputs) {
            check(inputs.len() == outputs.len(), NODE, || {
                format!(
                    "branch {} has {} inputs for {} outputs",
                    source.id(),
                    inputs.len(),
                    outputs.len()
                )
            })?;
            check_subset(NODE, "branch inputs", inputs, &source.output_symbols())?;
        }

        let partitioning = self.partitioning_scheme.partitioning();
        check_subset(NODE, "partitioning columns", &partitioning.columns(), outputs)?;
        check_subset(
            NODE,
            "hash column",
            self.partitioning_scheme.hash_column.as_slice(),
            outputs,
        )?;
        check(
            self.scope == ExchangeScope::Remote
                || partitioning.arguments().iter().all(ArgumentBinding::is_variable),
            NODE,
            || "local exchanges do not take constant partitioning arguments".into(),
        )?;
        if let Some(ordering) = &self.ordering_scheme {
            check(self.exchange_type == ExchangeType::Gather, NODE, || {
                format!("only gathering exchanges may be ordered, not {}", self.exchange_type)
            })?;
            check_subset(NODE, "ordering", &ordering.symbols(), outputs)?;
        }
        Ok(())
    }
}

impl From<ExchangeNode> for DistPlanNode {
    fn from(node: ExchangeNode) -> Self {
        DistPlanNode::Exchange(node)
    }
}
