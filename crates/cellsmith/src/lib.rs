//! # cellsmith
//!
//! Spreadsheet formula evaluation.
//!
//! cellsmith parses Excel-style formulas and evaluates them against cell data,
//! with Excel-compatible error values and type coercion.
//!
//! ## Features
//!
//! - Dynamic arrays and broadcasting operators
//! - `LAMBDA` closures, `LET`, and workbook-scoped named lambdas
//! - `MAKEARRAY`, `MAP`, `REDUCE`, `SCAN`, `BYROW`, `BYCOL`
//! - Database functions (`DSUM`, `DGET`, ...) with criteria ranges
//! - Engineering base conversions and bitwise functions
//! - Conditional formatting formulas compiled once and evaluated per cell
//!
//! ## Example
//!
//! ```rust
//! use cellsmith::prelude::*;
//!
//! let mut doc = Document::new();
//! let sheet = doc.workbook_mut().worksheet_mut(0).unwrap();
//! sheet.set_cell_value("A1", 3.0).unwrap();
//! sheet.set_cell_value("A2", 4.0).unwrap();
//!
//! let value = doc
//!     .evaluate(0, "B1", "=MAP(A1:A2, LAMBDA(x, x * x))")
//!     .unwrap();
//! assert_eq!(
//!     value,
//!     FormulaValue::Array2D(vec![
//!         vec![FormulaValue::Number(9.0)],
//!         vec![FormulaValue::Number(16.0)],
//!     ])
//! );
//! ```

pub mod document;
pub mod prelude;

pub use document::{AppliedFormat, Document, DocumentError, DocumentResult};

// Re-export core types
pub use cellsmith_core::{
    CellAddress, CellRange, CellValue, ConditionalFormatRule, Error, ErrorKind, Result, Workbook,
    Worksheet, MAX_COLS, MAX_ROWS, MAX_SHEET_NAME_LEN,
};

// Re-export formula types
pub use cellsmith_formula::{
    evaluate, evaluate_value, parse_formula, resolve, ArrayPolicy, BlankEquality, CellSource,
    CompiledFormula, ConditionalFormula, EmptySource, EngineOptions, EvaluationContext, FnSource,
    FormulaEngine, FormulaError, FormulaExpr, FormulaResult, FormulaValue, FunctionDef,
    FunctionImpl, FunctionRegistry, LambdaFunction, NamedLambdas, Reference, ReferenceShift,
    WorkbookSource,
};
