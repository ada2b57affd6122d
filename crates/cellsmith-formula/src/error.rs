//! Formula error types
//!
//! Everything a user can trigger ends up as an [`ErrorKind`] value in the
//! evaluated result. [`FormulaError`] is the internal carrier used while
//! parsing and evaluating; [`FormulaError::error_kind`] maps it onto the
//! literal shown in the cell.

use cellsmith_core::ErrorKind;
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula parsing or evaluation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Malformed formula text
    #[error("Parse error ({kind}): {message}")]
    Parse { kind: ErrorKind, message: String },

    /// Function name not found in bindings, named lambdas or the registry
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Bare identifier that resolves to nothing
    #[error("Unknown name: {0}")]
    UnknownName(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// An argument had the wrong type or shape
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// A plain spreadsheet error
    #[error("{0}")]
    Value(ErrorKind),

    /// Lambda invocation nested deeper than the configured limit
    #[error("Lambda call depth exceeded the limit of {limit}")]
    DepthExceeded { limit: usize },

    /// Requested array is larger than the configured ceiling
    #[error("Array of {rows}x{cols} exceeds the size limit")]
    ArrayTooLarge { rows: usize, cols: usize },

    /// Reference that points off the sheet
    #[error("Invalid reference: {0}")]
    InvalidReference(String),
}

impl FormulaError {
    /// Build a parse error
    pub fn parse(kind: ErrorKind, message: impl Into<String>) -> Self {
        FormulaError::Parse {
            kind,
            message: message.into(),
        }
    }

    /// The spreadsheet error this failure surfaces as
    pub fn error_kind(&self) -> ErrorKind {
        match self {
            FormulaError::Parse { kind, .. } => *kind,
            FormulaError::UnknownFunction(_) | FormulaError::UnknownName(_) => ErrorKind::Name,
            FormulaError::ArgumentCount { .. } | FormulaError::Argument(_) => ErrorKind::Value,
            FormulaError::Value(kind) => *kind,
            FormulaError::DepthExceeded { .. } => ErrorKind::Value,
            FormulaError::ArrayTooLarge { .. } => ErrorKind::Value,
            FormulaError::InvalidReference(_) => ErrorKind::Ref,
        }
    }
}

impl From<ErrorKind> for FormulaError {
    fn from(kind: ErrorKind) -> Self {
        FormulaError::Value(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(
            FormulaError::UnknownFunction("FOO".into()).error_kind(),
            ErrorKind::Name
        );
        assert_eq!(
            FormulaError::DepthExceeded { limit: 10 }.error_kind(),
            ErrorKind::Value
        );
        assert_eq!(
            FormulaError::parse(ErrorKind::Value, "unexpected ')'").error_kind(),
            ErrorKind::Value
        );
        assert_eq!(FormulaError::from(ErrorKind::Num).error_kind(), ErrorKind::Num);
        assert_eq!(
            FormulaError::InvalidReference("A0".into()).error_kind(),
            ErrorKind::Ref
        );
    }
}
