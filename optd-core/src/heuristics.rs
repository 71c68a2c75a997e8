mod optimizer;

pub use optimizer::{ApplyOrder, HeuristicsOptimizer, DEFAULT_MAX_PASSES};
