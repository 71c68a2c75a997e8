//! Named, typed column references and their per-compilation allocator.

use std::{
    cmp::Ordering,
    collections::HashSet,
    hash::{Hash, Hasher},
    sync::Arc,
};

use arrow_schema::DataType;

use crate::expr::Expression;

/// A column reference. Two symbols are the same column iff their names are equal; the type
/// rides along for consumers that need it.
#[derive(Clone, Debug)]
pub struct Symbol {
    name: Arc<str>,
    typ: DataType,
}

impl Symbol {
    pub fn new(name: impl Into<Arc<str>>, typ: DataType) -> Self {
        Self {
            name: name.into(),
            typ,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn typ(&self) -> &DataType {
        &self.typ
    }

    pub fn to_expression(&self) -> Expression {
        Expression::Symbol(self.clone())
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Hands out symbols whose names are unique within one compilation.
#[derive(Debug, Default)]
pub struct SymbolAllocator {
    used: HashSet<Arc<str>>,
    next_id: usize,
}

impl SymbolAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the name of a symbol produced outside this allocator, e.g. by the plan builder.
    pub fn register(&mut self, symbol: &Symbol) {
        self.used.insert(symbol.name.clone());
    }

    /// Allocates a fresh symbol. The hint is lower-cased and a trailing `_<digits>` (or a
    /// trailing `_`) is stripped, so re-allocating from an allocated name does not pile up
    /// suffixes.
    pub fn new_symbol(&mut self, name_hint: &str, typ: DataType) -> Symbol {
        let mut hint = name_hint.to_lowercase();
        if let Some(index) = hint.rfind('_') {
            let tail = &hint[index + 1..];
            if index > 0 && (tail.is_empty() || tail.parse::<u64>().is_ok()) {
                hint.truncate(index);
            }
        }
        if hint.is_empty() {
            hint.push_str("expr");
        }

        let mut attempt = hint.clone();
        while self.used.contains(attempt.as_str()) {
            attempt = format!("{}_{}", hint, self.next_id);
            self.next_id += 1;
        }
        let name: Arc<str> = attempt.into();
        self.used.insert(name.clone());
        Symbol { name, typ }
    }
}
