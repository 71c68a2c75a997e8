//! A naive row-at-a-time evaluator used to check that rewrites preserve results.

use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};
use itertools::Itertools;

use crate::{
    expr::{Expression, Value},
    plan_nodes::{Aggregation, AggregationNode, AggregationStep, DistPlanNode},
    symbol::Symbol,
};

type Row = HashMap<Symbol, Value>;

/// Evaluates plans over in-memory tables. Source nodes read the table of the same name,
/// positionally by their output symbols.
#[derive(Default)]
pub(crate) struct Executor {
    tables: HashMap<String, Vec<Vec<Value>>>,
}

impl Executor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_table(mut self, name: &str, rows: Vec<Vec<Value>>) -> Self {
        self.tables.insert(name.to_string(), rows);
        self
    }

    /// The rows of `plan` in output-symbol order, sorted so results compare as multisets.
    pub(crate) fn execute_sorted(&self, plan: &DistPlanNode) -> Result<Vec<Vec<Value>>> {
        let outputs = plan.output_symbols();
        let rows = self.execute(plan)?;
        let mut rows = rows
            .into_iter()
            .map(|row| {
                outputs
                    .iter()
                    .map(|symbol| row.get(symbol).cloned().unwrap_or(Value::Null))
                    .collect_vec()
            })
            .collect_vec();
        rows.sort_by_key(|row| format!("{:?}", row));
        Ok(rows)
    }

    fn execute(&self, plan: &DistPlanNode) -> Result<Vec<Row>> {
        match plan {
            DistPlanNode::Source(node) => {
                let table = self
                    .tables
                    .get(node.name())
                    .with_context(|| format!("no table {}", node.name()))?;
                Ok(table
                    .iter()
                    .map(|values| {
                        node.output_symbols()
                            .iter()
                            .cloned()
                            .zip_eq(values.iter().cloned())
                            .collect::<Row>()
                    })
                    .collect())
            }
            DistPlanNode::Project(node) => {
                let mut rows = vec![];
                for row in self.execute(node.source())? {
                    let mut projected = Row::new();
                    for (symbol, expr) in node.assignments() {
                        projected.insert(symbol.clone(), evaluate(expr, &row)?);
                    }
                    rows.push(projected);
                }
                Ok(rows)
            }
            DistPlanNode::Exchange(node) => {
                let mut rows: Vec<Row> = vec![];
                for (source, inputs) in node.sources().iter().zip_eq(node.inputs()) {
                    for row in self.execute(source)? {
                        rows.push(
                            node.output_symbols()
                                .iter()
                                .zip_eq(inputs)
                                .map(|(output, input)| {
                                    (output.clone(), row.get(input).cloned().unwrap_or(Value::Null))
                                })
                                .collect(),
                        );
                    }
                }
                Ok(rows)
            }
            DistPlanNode::Aggregation(node) => {
                let input = self.execute(node.source())?;
                aggregate(node, &input)
            }
        }
    }
}

fn evaluate(expr: &Expression, row: &Row) -> Result<Value> {
    match expr {
        Expression::Symbol(symbol) => row
            .get(symbol)
            .cloned()
            .ok_or_else(|| anyhow!("unbound symbol {}", symbol)),
        Expression::Constant(value) => Ok(value.clone()),
        Expression::Call {
            function,
            arguments,
        } if function == "add" => {
            let mut total = 0;
            for argument in arguments {
                match evaluate(argument, row)? {
                    Value::Int64(x) => total += x,
                    Value::Null => return Ok(Value::Null),
                    other => bail!("cannot add {}", other),
                }
            }
            Ok(Value::Int64(total))
        }
        _ => bail!("cannot evaluate {}", expr),
    }
}

fn aggregate(node: &AggregationNode, input: &[Row]) -> Result<Vec<Row>> {
    let group_id = node.group_id_symbol();
    let several_sets = node.grouping_sets().grouping_set_count() > 1;
    let mut output = vec![];
    for (index, set) in node.grouping_sets().sets().iter().enumerate() {
        let set_id = Value::Int64(index as i64);
        let mut keys = set.clone();
        if let Some(group_id) = group_id {
            if !keys.contains(group_id) {
                keys.push(group_id.clone());
            }
        }

        let mut groups: HashMap<Vec<Value>, Vec<&Row>> = HashMap::new();
        for row in input {
            if let (Some(group_id), true) = (group_id, several_sets) {
                if row.get(group_id) != Some(&set_id) {
                    continue;
                }
            }
            let key = keys
                .iter()
                .map(|symbol| row.get(symbol).cloned().unwrap_or(Value::Null))
                .collect_vec();
            groups.entry(key).or_default().push(row);
        }
        if set.is_empty() && groups.is_empty() {
            let key = keys
                .iter()
                .map(|symbol| {
                    if Some(symbol) == group_id {
                        set_id.clone()
                    } else {
                        Value::Null
                    }
                })
                .collect_vec();
            groups.insert(key, vec![]);
        }

        for (key, rows) in groups {
            let mut result: Row = node
                .grouping_keys()
                .into_iter()
                .map(|symbol| (symbol, Value::Null))
                .collect();
            result.extend(keys.iter().cloned().zip_eq(key));
            for (symbol, aggregation) in node.aggregations() {
                result.insert(symbol.clone(), accumulate(aggregation, node.step(), &rows)?);
            }
            output.push(result);
        }
    }
    Ok(output)
}

fn selected(row: &Row, symbol: Option<&Symbol>) -> bool {
    symbol.map_or(true, |symbol| row.get(symbol) == Some(&Value::Bool(true)))
}

fn accumulate(aggregation: &Aggregation, step: AggregationStep, rows: &[&Row]) -> Result<Value> {
    let mut values = rows
        .iter()
        .filter(|row| selected(row, aggregation.filter()) && selected(row, aggregation.mask()))
        .map(|row| match aggregation.arguments().first() {
            Some(argument) => evaluate(argument, row),
            None => Ok(Value::Int64(1)),
        })
        .collect::<Result<Vec<_>>>()?;
    if aggregation.is_distinct() {
        values = values.into_iter().unique().collect();
    }
    let non_null = values
        .iter()
        .filter_map(Value::as_i64)
        .collect_vec();

    let name = aggregation.function().name();
    let value = match (name, step) {
        ("count", AggregationStep::Final) => Value::Int64(non_null.iter().sum()),
        ("count", _) => Value::Int64(non_null.len() as i64),
        ("sum", _) if non_null.is_empty() => Value::Null,
        ("sum", _) => Value::Int64(non_null.iter().sum()),
        ("min", _) => non_null.iter().min().map_or(Value::Null, |x| Value::Int64(*x)),
        ("max", _) => non_null.iter().max().map_or(Value::Null, |x| Value::Int64(*x)),
        _ => bail!("cannot evaluate aggregate {}", name),
    };
    Ok(value)
}
