//! Human-readable rendering of plan trees.

use itertools::Itertools;
use pretty_xmlish::{Pretty, PrettyConfig};

use crate::{
    plan_nodes::{AggregationNode, DistPlanNode, ExchangeNode, ProjectNode, SourceNode},
    symbol::Symbol,
};

fn symbol_list(symbols: &[Symbol]) -> Pretty<'static> {
    Pretty::Array(symbols.iter().map(Pretty::display).collect())
}

impl DistPlanNode {
    pub fn explain(&self) -> Pretty<'static> {
        match self {
            DistPlanNode::Aggregation(node) => node.explain(),
            DistPlanNode::Exchange(node) => node.explain(),
            DistPlanNode::Project(node) => node.explain(),
            DistPlanNode::Source(node) => node.explain(),
        }
    }

    pub fn explain_to_string(&self) -> String {
        let mut config = PrettyConfig {
            need_boundaries: false,
            reduced_spaces: false,
            width: 300,
            ..Default::default()
        };
        let mut out = String::new();
        config.unicode(&mut out, &self.explain());
        out
    }
}

impl AggregationNode {
    fn explain(&self) -> Pretty<'static> {
        let mut fields = vec![
            ("id", Pretty::display(&self.id())),
            ("step", Pretty::display(&self.step())),
            ("grouping_sets", Pretty::display(self.grouping_sets())),
            (
                "aggregations",
                Pretty::Array(
                    self.aggregations()
                        .iter()
                        .map(|(output, aggregation)| {
                            Pretty::from(format!("{} := {}", output, aggregation))
                        })
                        .collect(),
                ),
            ),
        ];
        if !self.pre_grouped_symbols().is_empty() {
            fields.push(("pre_grouped", symbol_list(self.pre_grouped_symbols())));
        }
        if let Some(hash) = self.hash_symbol() {
            fields.push(("hash", Pretty::display(hash)));
        }
        if let Some(group_id) = self.group_id_symbol() {
            fields.push(("group_id", Pretty::display(group_id)));
        }
        Pretty::simple_record("Aggregation", fields, vec![self.source().explain()])
    }
}

impl ExchangeNode {
    fn explain(&self) -> Pretty<'static> {
        let scheme = self.partitioning_scheme();
        let mut fields = vec![
            ("id", Pretty::display(&self.id())),
            ("type", Pretty::display(&self.exchange_type())),
            ("scope", Pretty::display(&self.scope())),
            ("partitioning", Pretty::display(scheme.partitioning())),
            ("outputs", symbol_list(scheme.output_layout())),
            (
                "inputs",
                Pretty::Array(self.inputs().iter().map(|inputs| symbol_list(inputs)).collect()),
            ),
        ];
        if let Some(hash) = scheme.hash_column() {
            fields.push(("hash", Pretty::display(hash)));
        }
        if scheme.is_replicate_nulls_and_any() {
            fields.push(("replicate_nulls_and_any", Pretty::display(&true)));
        }
        if let Some(buckets) = scheme.bucket_to_partition() {
            fields.push((
                "bucket_to_partition",
                format!("[{}]", buckets.iter().join(", ")).into(),
            ));
        }
        if let Some(ordering) = self.ordering_scheme() {
            fields.push(("ordering", Pretty::display(ordering)));
        }
        Pretty::simple_record(
            "Exchange",
            fields,
            self.sources().iter().map(|source| source.explain()).collect(),
        )
    }
}

impl ProjectNode {
    fn explain(&self) -> Pretty<'static> {
        Pretty::simple_record(
            "Project",
            vec![
                ("id", Pretty::display(&self.id())),
                (
                    "assignments",
                    Pretty::Array(
                        self.assignments()
                            .iter()
                            .map(|(output, expr)| Pretty::from(format!("{} := {}", output, expr)))
                            .collect(),
                    ),
                ),
            ],
            vec![self.source().explain()],
        )
    }
}

impl SourceNode {
    fn explain(&self) -> Pretty<'static> {
        Pretty::childless_record(
            "Source",
            vec![
                ("id", Pretty::display(&self.id())),
                ("name", self.name().to_string().into()),
                ("outputs", symbol_list(self.output_symbols())),
            ],
        )
    }
}
