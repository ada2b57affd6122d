//! Values produced during formula evaluation

use std::fmt;
use std::sync::Arc;

use cellsmith_core::{CellValue, ErrorKind};

use crate::error::{FormulaError, FormulaResult};
use crate::lambda::LambdaFunction;

/// Value types during formula evaluation
///
/// Arrays are never flattened implicitly: a single-row array literal is an
/// `Array1D`, anything with more than one row (and every range reference) is
/// an `Array2D` of rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FormulaValue {
    Number(f64),
    Text(String),
    Boolean(bool),
    #[default]
    Empty,
    Error(ErrorKind),
    Array1D(Vec<FormulaValue>),
    Array2D(Vec<Vec<FormulaValue>>),
    /// An uninvoked closure
    Lambda(Arc<LambdaFunction>),
}

impl FormulaValue {
    /// Convert to number, if possible
    ///
    /// Booleans are 1/0, empty is 0 and text is parsed after trimming.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormulaValue::Number(n) => Some(*n),
            FormulaValue::Boolean(true) => Some(1.0),
            FormulaValue::Boolean(false) => Some(0.0),
            FormulaValue::Empty => Some(0.0),
            FormulaValue::Text(s) => parse_number(s),
            _ => None,
        }
    }

    /// Force conversion to number for arithmetic
    pub fn to_number(&self) -> FormulaResult<f64> {
        if let FormulaValue::Error(e) = self {
            return Err(FormulaError::Value(*e));
        }
        self.as_number()
            .ok_or(FormulaError::Value(ErrorKind::Value))
    }

    /// Convert to boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FormulaValue::Boolean(b) => Some(*b),
            FormulaValue::Number(n) => Some(*n != 0.0),
            FormulaValue::Empty => Some(false),
            FormulaValue::Text(s) => {
                if s.eq_ignore_ascii_case("TRUE") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("FALSE") {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Force conversion to boolean
    pub fn to_bool(&self) -> FormulaResult<bool> {
        if let FormulaValue::Error(e) = self {
            return Err(FormulaError::Value(*e));
        }
        self.as_bool().ok_or(FormulaError::Value(ErrorKind::Value))
    }

    /// Convert to display text
    pub fn as_text(&self) -> String {
        match self {
            FormulaValue::Number(n) => format_number(*n),
            FormulaValue::Text(s) => s.clone(),
            FormulaValue::Boolean(true) => "TRUE".to_string(),
            FormulaValue::Boolean(false) => "FALSE".to_string(),
            FormulaValue::Error(e) => e.to_string(),
            FormulaValue::Empty => String::new(),
            FormulaValue::Array1D(_) | FormulaValue::Array2D(_) => self.first().as_text(),
            FormulaValue::Lambda(_) => ErrorKind::Calc.to_string(),
        }
    }

    /// Text conversion for string functions; errors propagate
    pub fn to_text(&self) -> FormulaResult<String> {
        match self {
            FormulaValue::Error(e) => Err(FormulaError::Value(*e)),
            FormulaValue::Lambda(_) => Err(FormulaError::Value(ErrorKind::Value)),
            other => Ok(other.as_text()),
        }
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self, FormulaValue::Error(_))
    }

    /// Get the error if this is one
    pub fn error(&self) -> Option<ErrorKind> {
        match self {
            FormulaValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Check for the empty value
    pub fn is_empty(&self) -> bool {
        matches!(self, FormulaValue::Empty)
    }

    /// Empty, or text with no characters
    pub fn is_blank(&self) -> bool {
        match self {
            FormulaValue::Empty => true,
            FormulaValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Check for either array variant
    pub fn is_array(&self) -> bool {
        matches!(self, FormulaValue::Array1D(_) | FormulaValue::Array2D(_))
    }

    /// Type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            FormulaValue::Number(_) => "number",
            FormulaValue::Text(_) => "text",
            FormulaValue::Boolean(_) => "boolean",
            FormulaValue::Empty => "empty",
            FormulaValue::Error(_) => "error",
            FormulaValue::Array1D(_) | FormulaValue::Array2D(_) => "array",
            FormulaValue::Lambda(_) => "lambda",
        }
    }

    /// Shape as (rows, columns); scalars are 1x1 and `Array1D` is one row
    pub fn dimensions(&self) -> (usize, usize) {
        match self {
            FormulaValue::Array1D(items) => (1, items.len()),
            FormulaValue::Array2D(rows) => (
                rows.len(),
                rows.iter().map(Vec::len).max().unwrap_or(0),
            ),
            _ => (1, 1),
        }
    }

    /// Element at (row, col), treating scalars as 1x1
    pub fn get(&self, row: usize, col: usize) -> Option<&FormulaValue> {
        match self {
            FormulaValue::Array1D(items) if row == 0 => items.get(col),
            FormulaValue::Array1D(_) => None,
            FormulaValue::Array2D(rows) => rows.get(row).and_then(|r| r.get(col)),
            scalar if row == 0 && col == 0 => Some(scalar),
            _ => None,
        }
    }

    /// Top-left element, or the value itself for scalars
    pub fn first(&self) -> &FormulaValue {
        self.get(0, 0).unwrap_or(&FormulaValue::Empty)
    }

    /// Iterate every element in row-major order; scalars yield themselves
    pub fn values(&self) -> Box<dyn Iterator<Item = &FormulaValue> + '_> {
        match self {
            FormulaValue::Array1D(items) => Box::new(items.iter()),
            FormulaValue::Array2D(rows) => Box::new(rows.iter().flatten()),
            scalar => Box::new(std::iter::once(scalar)),
        }
    }

    /// Convert into rows of values
    pub fn into_rows(self) -> Vec<Vec<FormulaValue>> {
        match self {
            FormulaValue::Array1D(items) => vec![items],
            FormulaValue::Array2D(rows) => rows,
            scalar => vec![vec![scalar]],
        }
    }
}

/// Parse numeric text the way cell input does: trimmed, no empty string
pub(crate) fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Format a number like a spreadsheet cell: integers without a decimal
/// point, everything else rounded to 15 significant digits
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    let rounded: f64 = format!("{:.14e}", n).parse().unwrap_or(n);
    format!("{}", rounded)
}

impl fmt::Display for FormulaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaValue::Array1D(items) => {
                let parts: Vec<String> = items.iter().map(FormulaValue::as_text).collect();
                write!(f, "{{{}}}", parts.join(","))
            }
            FormulaValue::Array2D(rows) => {
                let parts: Vec<String> = rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(FormulaValue::as_text)
                            .collect::<Vec<_>>()
                            .join(",")
                    })
                    .collect();
                write!(f, "{{{}}}", parts.join(";"))
            }
            FormulaValue::Lambda(lambda) => write!(f, "LAMBDA({})", lambda.parameters.join(",")),
            other => f.write_str(&other.as_text()),
        }
    }
}

impl From<CellValue> for FormulaValue {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Empty => FormulaValue::Empty,
            CellValue::Number(n) => FormulaValue::Number(n),
            CellValue::String(s) => FormulaValue::Text(s),
            CellValue::Boolean(b) => FormulaValue::Boolean(b),
            CellValue::Error(e) => FormulaValue::Error(e),
        }
    }
}

impl From<&CellValue> for FormulaValue {
    fn from(value: &CellValue) -> Self {
        value.clone().into()
    }
}

impl From<FormulaValue> for CellValue {
    fn from(value: FormulaValue) -> Self {
        match value {
            FormulaValue::Empty => CellValue::Empty,
            FormulaValue::Number(n) => CellValue::Number(n),
            FormulaValue::Text(s) => CellValue::String(s),
            FormulaValue::Boolean(b) => CellValue::Boolean(b),
            FormulaValue::Error(e) => CellValue::Error(e),
            array @ (FormulaValue::Array1D(_) | FormulaValue::Array2D(_)) => {
                array.first().clone().into()
            }
            FormulaValue::Lambda(_) => CellValue::Error(ErrorKind::Calc),
        }
    }
}

impl From<f64> for FormulaValue {
    fn from(n: f64) -> Self {
        FormulaValue::Number(n)
    }
}

impl From<bool> for FormulaValue {
    fn from(b: bool) -> Self {
        FormulaValue::Boolean(b)
    }
}

impl From<&str> for FormulaValue {
    fn from(s: &str) -> Self {
        FormulaValue::Text(s.to_string())
    }
}

impl From<String> for FormulaValue {
    fn from(s: String) -> Self {
        FormulaValue::Text(s)
    }
}

impl From<ErrorKind> for FormulaValue {
    fn from(e: ErrorKind) -> Self {
        FormulaValue::Error(e)
    }
}
