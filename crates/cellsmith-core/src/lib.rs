//! # cellsmith-core
//!
//! Core data structures shared by the cellsmith formula engine.
//!
//! This crate provides:
//! - [`CellAddress`] and [`CellRange`] - A1-style cell addressing
//! - [`ErrorKind`] - The nine Excel error literals
//! - [`CellValue`] - Values stored in a worksheet
//! - [`Worksheet`], [`Workbook`] - A sparse in-memory cell store
//! - [`ConditionalFormatRule`] - Formula-driven conditional formatting rules
//!
//! ## Example
//!
//! ```rust
//! use cellsmith_core::{CellValue, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//!
//! sheet.set_cell_value("A1", "Apple").unwrap();
//! sheet.set_cell_value("B1", 42.0).unwrap();
//! sheet.set_cell_value_at(1, 0, CellValue::Boolean(true)).unwrap();
//!
//! assert_eq!(sheet.get_value("B1").unwrap(), CellValue::Number(42.0));
//! ```

pub mod cell;
pub mod conditional_format;
pub mod error;
pub mod workbook;
pub mod worksheet;

pub use cell::{CellAddress, CellRange, CellValue, ErrorKind};
pub use conditional_format::ConditionalFormatRule;
pub use error::{Error, Result};
pub use workbook::Workbook;
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
