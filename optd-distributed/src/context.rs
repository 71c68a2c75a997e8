//! Per-compilation state threaded through every rule application.

use std::sync::Arc;

use arrow_schema::DataType;
use optd_core::nodes::{PlanNodeId, PlanNodeIdAllocator};

use crate::{
    config::SessionConfig,
    metadata::{FunctionRegistry, Metadata},
    plan_nodes::DistPlanNode,
    symbol::{Symbol, SymbolAllocator},
};

pub struct PlanningContext {
    id_allocator: PlanNodeIdAllocator,
    symbol_allocator: SymbolAllocator,
    metadata: Arc<dyn Metadata>,
    session: SessionConfig,
}

impl PlanningContext {
    pub fn new(metadata: Arc<dyn Metadata>, session: SessionConfig) -> Self {
        Self {
            id_allocator: PlanNodeIdAllocator::new(),
            symbol_allocator: SymbolAllocator::new(),
            metadata,
            session,
        }
    }

    /// A context over the built-in functions and default session properties.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(FunctionRegistry::with_builtins()), SessionConfig::default())
    }

    /// Reserves every id and symbol name used by `plan`, so allocations never collide with it.
    pub fn register_plan(&mut self, plan: &DistPlanNode) {
        let next_id = plan.max_id().0 + 1;
        let current = self.id_allocator.next_id();
        self.id_allocator = PlanNodeIdAllocator::starting_at(std::cmp::max(next_id, current.0));
        for symbol in plan.all_symbols() {
            self.symbol_allocator.register(&symbol);
        }
    }

    pub fn next_id(&mut self) -> PlanNodeId {
        self.id_allocator.next_id()
    }

    pub fn new_symbol(&mut self, name_hint: &str, typ: DataType) -> Symbol {
        self.symbol_allocator.new_symbol(name_hint, typ)
    }

    pub fn metadata(&self) -> &dyn Metadata {
        self.metadata.as_ref()
    }

    pub fn session(&self) -> &SessionConfig {
        &self.session
    }
}

impl std::fmt::Debug for PlanningContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanningContext")
            .field("id_allocator", &self.id_allocator)
            .field("symbol_allocator", &self.symbol_allocator)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
