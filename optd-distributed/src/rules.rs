mod macros;
mod push_partial_aggregation_through_exchange;

pub use push_partial_aggregation_through_exchange::PushPartialAggregationThroughExchange;
