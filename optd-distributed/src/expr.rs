//! Scalar expressions referenced by plan nodes.

use std::sync::Arc;

use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::symbol::Symbol;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(OrderedFloat<f64>),
    Utf8(Arc<str>),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(x) => Some(*x),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(x) => write!(f, "{}", x),
            Value::Int64(x) => write!(f, "{}", x),
            Value::Float64(x) => write!(f, "{}", x),
            Value::Utf8(x) => write!(f, "'{}'", x),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expression {
    Symbol(Symbol),
    Constant(Value),
    Call {
        function: String,
        arguments: Vec<Expression>,
    },
    /// A lambda argument of a higher-order function. The body may only refer to the
    /// parameters; it never reads a column.
    Lambda {
        parameters: Vec<Symbol>,
        body: Box<Expression>,
    },
}

impl Expression {
    pub fn call(function: impl Into<String>, arguments: Vec<Expression>) -> Self {
        Expression::Call {
            function: function.into(),
            arguments,
        }
    }

    pub fn lambda(parameters: Vec<Symbol>, body: Expression) -> Self {
        Expression::Lambda {
            parameters,
            body: Box::new(body),
        }
    }

    pub fn is_lambda(&self) -> bool {
        matches!(self, Expression::Lambda { .. })
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Expression::Symbol(symbol) => Some(symbol),
            _ => None,
        }
    }

    /// Columns read by this expression, in first-reference order. Lambda parameters are not
    /// columns and are left out.
    pub fn referenced_symbols(&self) -> Vec<Symbol> {
        let mut symbols = vec![];
        self.collect_symbols(&[], &mut symbols);
        symbols.into_iter().unique().collect()
    }

    fn collect_symbols(&self, bound: &[Symbol], symbols: &mut Vec<Symbol>) {
        match self {
            Expression::Symbol(symbol) => {
                if !bound.contains(symbol) {
                    symbols.push(symbol.clone());
                }
            }
            Expression::Constant(_) => {}
            Expression::Call { arguments, .. } => {
                for argument in arguments {
                    argument.collect_symbols(bound, symbols);
                }
            }
            Expression::Lambda { parameters, body } => {
                let bound = bound.iter().chain(parameters).cloned().collect_vec();
                body.collect_symbols(&bound, symbols);
            }
        }
    }

    /// Rewrites every column reference with `f`. Lambda parameters are left alone.
    pub fn rewrite_symbols(&self, f: &impl Fn(&Symbol) -> Symbol) -> Expression {
        self.rewrite_symbols_inner(&[], f)
    }

    fn rewrite_symbols_inner(&self, bound: &[Symbol], f: &impl Fn(&Symbol) -> Symbol) -> Expression {
        match self {
            Expression::Symbol(symbol) if bound.contains(symbol) => self.clone(),
            Expression::Symbol(symbol) => Expression::Symbol(f(symbol)),
            Expression::Constant(_) => self.clone(),
            Expression::Call {
                function,
                arguments,
            } => Expression::Call {
                function: function.clone(),
                arguments: arguments
                    .iter()
                    .map(|argument| argument.rewrite_symbols_inner(bound, f))
                    .collect(),
            },
            Expression::Lambda { parameters, body } => {
                let bound = bound.iter().chain(parameters).cloned().collect_vec();
                Expression::Lambda {
                    parameters: parameters.clone(),
                    body: Box::new(body.rewrite_symbols_inner(&bound, f)),
                }
            }
        }
    }
}

impl From<Symbol> for Expression {
    fn from(symbol: Symbol) -> Self {
        Expression::Symbol(symbol)
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Expression::Constant(value)
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Symbol(symbol) => write!(f, "{}", symbol),
            Expression::Constant(value) => write!(f, "{}", value),
            Expression::Call {
                function,
                arguments,
            } => write!(f, "{}({})", function, arguments.iter().join(", ")),
            Expression::Lambda { parameters, body } => {
                write!(f, "({}) -> {}", parameters.iter().join(", "), body)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use arrow_schema::DataType;
    use pretty_assertions::assert_eq;

    use super::{Expression, Value};
    use crate::symbol::Symbol;

    fn sym(name: &str) -> Symbol {
        Symbol::new(name, DataType::Int64)
    }

    #[test]
    fn lambda_parameters_are_not_columns() {
        let expr = Expression::call(
            "add",
            vec![
                sym("a").into(),
                Expression::lambda(
                    vec![sym("s"), sym("x")],
                    Expression::call("add", vec![sym("s").into(), sym("x").into()]),
                ),
                sym("a").into(),
                Value::Int64(1).into(),
            ],
        );
        assert_eq!(expr.referenced_symbols(), vec![sym("a")]);

        let renamed = expr.rewrite_symbols(&|symbol: &Symbol| Symbol::new(format!("{}_1", symbol), DataType::Int64));
        assert_eq!(renamed.to_string(), "add(a_1, (s, x) -> add(s, x), a_1, 1)");
    }
}
