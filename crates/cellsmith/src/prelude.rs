//! Prelude module - common imports for cellsmith users
//!
//! ```rust
//! use cellsmith::prelude::*;
//! ```

pub use crate::{
    // Cell types
    CellAddress,
    CellRange,
    CellValue,
    // Conditional formatting
    ConditionalFormatRule,
    ConditionalFormula,
    // Documents
    Document,
    DocumentError,
    DocumentResult,
    EngineOptions,
    ErrorKind,
    // Formula types
    FormulaEngine,
    FormulaValue,
    LambdaFunction,
    NamedLambdas,
    Workbook,
    Worksheet,
};
