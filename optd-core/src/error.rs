use thiserror::Error;

/// Failures that abort a compilation. A rule that simply does not apply is not an error:
/// it returns no replacement.
#[derive(Debug, Error)]
pub enum OptimizerError {
    /// An internal-consistency assumption of a rule was broken.
    #[error("invariant violated in {rule}: {message}")]
    InvariantViolation { rule: &'static str, message: String },
    /// A plan node constructor rejected its inputs.
    #[error("malformed {node} node: {message}")]
    MalformedPlan { node: &'static str, message: String },
    /// The driver kept rewriting the plan for more passes than allowed.
    #[error("no fixpoint reached after {passes} optimizer passes")]
    NoFixpoint { passes: usize },
}

impl OptimizerError {
    pub fn invariant(rule: &'static str, message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            rule,
            message: message.into(),
        }
    }

    pub fn malformed(node: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedPlan {
            node,
            message: message.into(),
        }
    }
}
