//! Cell value and error types

use std::fmt;

/// Represents the value stored in a cell
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellValue {
    /// Empty cell (no value)
    #[default]
    Empty,
    /// Boolean value (TRUE/FALSE)
    Boolean(bool),
    /// Numeric value (all numbers stored as f64, including dates)
    Number(f64),
    /// String value
    String(String),
    /// Error value (#VALUE!, #REF!, etc.)
    Error(ErrorKind),
}

impl CellValue {
    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Check if the cell contains an error
    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }

    /// Try to get the value as a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Try to get the value as a string slice
    pub fn as_string(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Boolean(_) => "boolean",
            CellValue::Number(_) => "number",
            CellValue::String(_) => "string",
            CellValue::Error(_) => "error",
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::String(s) => f.write_str(s),
            CellValue::Error(e) => write!(f, "{}", e),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<ErrorKind> for CellValue {
    fn from(e: ErrorKind) -> Self {
        CellValue::Error(e)
    }
}

/// Excel error values
///
/// This is a closed set; anything the engine reports to a caller is one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    /// #DIV/0! - Division by zero
    DivZero,
    /// #N/A - Value not available
    NA,
    /// #NAME? - Unrecognized name
    Name,
    /// #NULL! - Empty intersection
    Null,
    /// #NUM! - Invalid numeric value
    Num,
    /// #REF! - Invalid cell reference
    Ref,
    /// #VALUE! - Wrong type of argument or operand
    Value,
    /// #SPILL! - Dynamic array cannot spill
    Spill,
    /// #CALC! - Calculation engine error
    Calc,
}

impl ErrorKind {
    /// All error kinds, in declaration order
    pub const ALL: [ErrorKind; 9] = [
        ErrorKind::DivZero,
        ErrorKind::NA,
        ErrorKind::Name,
        ErrorKind::Null,
        ErrorKind::Num,
        ErrorKind::Ref,
        ErrorKind::Value,
        ErrorKind::Spill,
        ErrorKind::Calc,
    ];

    /// Get the literal token for this error
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DivZero => "#DIV/0!",
            ErrorKind::NA => "#N/A",
            ErrorKind::Name => "#NAME?",
            ErrorKind::Null => "#NULL!",
            ErrorKind::Num => "#NUM!",
            ErrorKind::Ref => "#REF!",
            ErrorKind::Value => "#VALUE!",
            ErrorKind::Spill => "#SPILL!",
            ErrorKind::Calc => "#CALC!",
        }
    }

    /// Parse a literal error token (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_literals_round_trip() {
        for kind in ErrorKind::ALL {
            assert_eq!(ErrorKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ErrorKind::parse("#div/0!"), Some(ErrorKind::DivZero));
        assert_eq!(ErrorKind::parse("#BOGUS!"), None);
        assert_eq!(ErrorKind::NA.to_string(), "#N/A");
    }

    #[test]
    fn test_cell_value_conversions() {
        assert_eq!(CellValue::from(3), CellValue::Number(3.0));
        assert_eq!(CellValue::from("x"), CellValue::String("x".into()));
        assert_eq!(CellValue::Boolean(true).as_number(), Some(1.0));
        assert_eq!(CellValue::String("5".into()).as_number(), None);
        assert_eq!(CellValue::Error(ErrorKind::Ref).to_string(), "#REF!");
    }
}
