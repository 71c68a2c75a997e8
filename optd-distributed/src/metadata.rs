//! Catalog knowledge about aggregate functions.

use std::collections::HashMap;

use anyhow::{bail, Result};
use arrow_schema::{DataType, Field, Fields};
use itertools::Itertools;

/// A resolved function: name plus argument and return types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSignature {
    name: String,
    argument_types: Vec<DataType>,
    return_type: DataType,
}

impl FunctionSignature {
    pub fn new(name: impl Into<String>, argument_types: Vec<DataType>, return_type: DataType) -> Self {
        Self {
            name: name.into(),
            argument_types,
            return_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn argument_types(&self) -> &[DataType] {
        &self.argument_types
    }

    pub fn return_type(&self) -> &DataType {
        &self.return_type
    }
}

impl std::fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({}):{}",
            self.name,
            self.argument_types.iter().join(", "),
            self.return_type
        )
    }
}

/// Function lookups the optimizer needs. Implementations must be cheap and side-effect free.
pub trait Metadata: Send + Sync {
    /// Whether the aggregate can be split into a partial and a final step.
    fn is_decomposable(&self, function: &FunctionSignature) -> bool;

    /// The type of the state a partial step emits for `function`.
    fn intermediate_type(&self, function: &FunctionSignature) -> Result<DataType>;
}

/// The state an aggregate carries between its partial and final step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntermediateType {
    /// Same type as the argument at this position, e.g. `0` for `sum` or `min` and `1` for
    /// the initial state of `reduce_agg`.
    ArgumentType(usize),
    /// One or more fixed types. More than one is packed into an anonymous struct.
    Fixed(Vec<DataType>),
}

#[derive(Debug, Clone)]
struct AggregateFunction {
    decomposable: bool,
    intermediate: Option<IntermediateType>,
}

/// An in-memory [`Metadata`] keyed by (lower-cased) function name.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, AggregateFunction>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// A registry holding the built-in aggregates.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_decomposable("count", IntermediateType::Fixed(vec![DataType::Int64]));
        for name in ["sum", "min", "max"] {
            registry.register_decomposable(name, IntermediateType::ArgumentType(0));
        }
        registry.register_decomposable("reduce_agg", IntermediateType::ArgumentType(1));
        registry.register_decomposable(
            "avg",
            IntermediateType::Fixed(vec![DataType::Float64, DataType::Int64]),
        );
        for name in ["bool_and", "bool_or"] {
            registry.register_decomposable(name, IntermediateType::Fixed(vec![DataType::Boolean]));
        }
        registry.register_non_decomposable("median");
        registry
    }

    pub fn register_decomposable(&mut self, name: &str, intermediate: IntermediateType) {
        self.functions.insert(
            name.to_lowercase(),
            AggregateFunction {
                decomposable: true,
                intermediate: Some(intermediate),
            },
        );
    }

    pub fn register_non_decomposable(&mut self, name: &str) {
        self.functions.insert(
            name.to_lowercase(),
            AggregateFunction {
                decomposable: false,
                intermediate: None,
            },
        );
    }

    fn lookup(&self, function: &FunctionSignature) -> Option<&AggregateFunction> {
        self.functions.get(&function.name().to_lowercase())
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl Metadata for FunctionRegistry {
    fn is_decomposable(&self, function: &FunctionSignature) -> bool {
        self.lookup(function)
            .map(|info| info.decomposable)
            .unwrap_or(false)
    }

    fn intermediate_type(&self, function: &FunctionSignature) -> Result<DataType> {
        let Some(info) = self.lookup(function) else {
            bail!("unknown aggregate function {}", function);
        };
        let Some(intermediate) = &info.intermediate else {
            bail!("aggregate function {} has no intermediate state", function);
        };
        match intermediate {
            IntermediateType::ArgumentType(index) => match function.argument_types().get(*index) {
                Some(typ) => Ok(typ.clone()),
                None => bail!(
                    "{} takes its intermediate type from missing argument {}",
                    function,
                    index
                ),
            },
            IntermediateType::Fixed(types) => match types.as_slice() {
                [] => bail!("aggregate function {} declares an empty intermediate state", function),
                [typ] => Ok(typ.clone()),
                types => Ok(DataType::Struct(Fields::from(
                    types
                        .iter()
                        .enumerate()
                        .map(|(i, typ)| Field::new(format!("field{}", i), typ.clone(), true))
                        .collect_vec(),
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use arrow_schema::{DataType, Field, Fields};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::{FunctionRegistry, FunctionSignature, IntermediateType, Metadata};

    fn signature(name: &str, argument_type: DataType) -> FunctionSignature {
        FunctionSignature::new(name, vec![argument_type.clone()], argument_type)
    }

    #[test_case("count", DataType::Utf8, DataType::Int64)]
    #[test_case("sum", DataType::Float64, DataType::Float64)]
    #[test_case("MAX", DataType::Utf8, DataType::Utf8)]
    #[test_case("bool_or", DataType::Boolean, DataType::Boolean)]
    fn builtin_intermediate_types(name: &str, argument: DataType, expected: DataType) {
        let registry = FunctionRegistry::with_builtins();
        let function = signature(name, argument);
        assert!(registry.is_decomposable(&function));
        assert_eq!(registry.intermediate_type(&function).unwrap(), expected);
    }

    #[test]
    fn reduce_agg_state_follows_the_initial_value() {
        let registry = FunctionRegistry::with_builtins();
        let reduce = FunctionSignature::new(
            "reduce_agg",
            vec![DataType::Int32, DataType::Int64, DataType::Null, DataType::Null],
            DataType::Int64,
        );
        assert_eq!(registry.intermediate_type(&reduce).unwrap(), DataType::Int64);

        let truncated = FunctionSignature::new("reduce_agg", vec![DataType::Int32], DataType::Int32);
        assert!(registry.intermediate_type(&truncated).is_err());
    }

    #[test]
    fn multi_value_state_is_a_struct() {
        let registry = FunctionRegistry::with_builtins();
        let typ = registry
            .intermediate_type(&signature("avg", DataType::Int64))
            .unwrap();
        assert_eq!(
            typ,
            DataType::Struct(Fields::from(vec![
                Field::new("field0", DataType::Float64, true),
                Field::new("field1", DataType::Int64, true),
            ]))
        );
    }

    #[test]
    fn unknown_and_holistic_functions() {
        let mut registry = FunctionRegistry::with_builtins();
        let median = signature("median", DataType::Int64);
        let custom = signature("approx_set", DataType::Int64);
        assert!(!registry.is_decomposable(&median));
        assert!(registry.intermediate_type(&median).is_err());
        assert!(!registry.is_decomposable(&custom));
        assert!(registry.intermediate_type(&custom).is_err());

        registry.register_decomposable("approx_set", IntermediateType::Fixed(vec![DataType::Binary]));
        assert!(registry.is_decomposable(&custom));
        assert_eq!(registry.intermediate_type(&custom).unwrap(), DataType::Binary);
    }
}
