//! Error types for problem composition.

use thiserror::Error;

/// Errors that can occur while composing an optimization problem.
///
/// These are all programming errors in problem construction, not transient
/// conditions: a malformed layout would corrupt every downstream Jacobian
/// scatter, so composition aborts instead of recovering.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// A supplied vector's length disagrees with a declared dimension
    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Declared length
        expected: usize,
        /// Length actually supplied
        actual: usize,
        /// What was being set or validated
        context: String,
    },

    /// A variable block or constraint set with this name is already registered
    #[error("name '{0}' is already registered")]
    DuplicateName(String),

    /// A constraint set was queried (or registered) before `link_with_variables`
    #[error("constraint set '{0}' has not been linked with a variable set")]
    NotLinked(String),

    /// A constraint references a variable block the variable set does not contain
    #[error("variable block '{0}' not found in the variable set")]
    UnknownVariable(String),

    /// A bound pair with `lower > upper` (or a NaN side)
    #[error("invalid bounds in {context}: lower {lower} is greater than upper {upper}")]
    InvalidBounds {
        /// Supplied lower bound
        lower: f64,
        /// Supplied upper bound
        upper: f64,
        /// What was being bounded
        context: String,
    },
}

/// Result type for composition operations.
pub type ComposeResult<T> = Result<T, ComposeError>;

impl ComposeError {
    /// Shorthand for a [`ComposeError::DimensionMismatch`] with an owned context.
    pub fn dimension(expected: usize, actual: usize, context: impl Into<String>) -> Self {
        ComposeError::DimensionMismatch {
            expected,
            actual,
            context: context.into(),
        }
    }
}
