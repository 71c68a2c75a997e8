use itertools::Itertools;

use crate::symbol::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Ascending => write!(f, "ASC"),
            SortOrder::Descending => write!(f, "DESC"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderingScheme {
    order_by: Vec<(Symbol, SortOrder)>,
}

impl OrderingScheme {
    pub fn new(order_by: Vec<(Symbol, SortOrder)>) -> Self {
        Self { order_by }
    }

    pub fn order_by(&self) -> &[(Symbol, SortOrder)] {
        &self.order_by
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.order_by.iter().map(|(symbol, _)| symbol.clone()).collect()
    }

    pub fn map_symbols(&self, f: impl Fn(&Symbol) -> Symbol) -> Self {
        Self {
            order_by: self
                .order_by
                .iter()
                .map(|(symbol, order)| (f(symbol), *order))
                .collect(),
        }
    }
}

impl std::fmt::Display for OrderingScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.order_by
                .iter()
                .map(|(symbol, order)| format!("{} {}", symbol, order))
                .join(", ")
        )
    }
}
