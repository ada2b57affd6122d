//! Evaluation context
//!
//! An [`EvaluationContext`] is built by the caller for one evaluation and
//! dropped afterwards. It bundles the read-only cell source, the cell being
//! computed, the lambda bindings in scope, the caller-owned named lambdas,
//! the function registry and the engine options.

use cellsmith_core::{CellAddress, ErrorKind, Workbook, Worksheet, MAX_COLS, MAX_ROWS};

use crate::functions::FunctionRegistry;
use crate::lambda::{Bindings, NamedLambdas};
use crate::reference::ReferenceShift;
use crate::value::FormulaValue;

/// How `=`/`<>` treat blank-like values against numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlankEquality {
    /// Excel typing: an empty cell takes the other side's type, `""` and
    /// `FALSE` never equal a number
    #[default]
    Strict,
    /// Empty, `""` and `FALSE` all equal `0`
    Loose,
}

/// Engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Maximum nesting of lambda invocations
    pub max_call_depth: usize,
    /// Largest row or column count a generated array may have
    pub max_array_dimension: usize,
    /// Largest number of cells a range or generated array may hold
    pub max_array_cells: usize,
    /// Cache compiled formulas by text
    pub cache_formulas: bool,
    /// Equality semantics for blank-like values
    pub blank_equality: BlankEquality,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_call_depth: 1000,
            max_array_dimension: 10_000,
            max_array_cells: 10_000_000,
            cache_formulas: true,
            blank_equality: BlankEquality::Strict,
        }
    }
}

/// Read-only access to cell values
pub trait CellSource {
    /// Value at `address`; `sheet` is `None` for the formula's own sheet
    fn cell_value(&self, sheet: Option<&str>, address: CellAddress) -> FormulaValue;

    /// Number of addressable rows
    fn row_count(&self) -> u32 {
        MAX_ROWS
    }

    /// Number of addressable columns
    fn column_count(&self) -> u16 {
        MAX_COLS
    }
}

/// A source with no cells; every read is empty
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySource;

impl CellSource for EmptySource {
    fn cell_value(&self, _sheet: Option<&str>, _address: CellAddress) -> FormulaValue {
        FormulaValue::Empty
    }
}

/// Adapts a closure into a single-sheet [`CellSource`]
///
/// ```rust
/// use cellsmith_core::CellAddress;
/// use cellsmith_formula::{CellSource, FnSource, FormulaValue};
///
/// let source = FnSource::new(|addr: CellAddress| FormulaValue::Number(addr.row as f64));
/// assert_eq!(source.cell_value(None, CellAddress::new(4, 0)), FormulaValue::Number(4.0));
/// ```
#[derive(Debug, Clone)]
pub struct FnSource<F> {
    accessor: F,
    rows: u32,
    cols: u16,
}

impl<F> FnSource<F>
where
    F: Fn(CellAddress) -> FormulaValue,
{
    pub fn new(accessor: F) -> Self {
        Self {
            accessor,
            rows: MAX_ROWS,
            cols: MAX_COLS,
        }
    }

    /// Limit the addressable area
    pub fn with_bounds(mut self, rows: u32, cols: u16) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }
}

impl<F> CellSource for FnSource<F>
where
    F: Fn(CellAddress) -> FormulaValue,
{
    fn cell_value(&self, _sheet: Option<&str>, address: CellAddress) -> FormulaValue {
        (self.accessor)(address)
    }

    fn row_count(&self) -> u32 {
        self.rows
    }

    fn column_count(&self) -> u16 {
        self.cols
    }
}

impl CellSource for Worksheet {
    fn cell_value(&self, sheet: Option<&str>, address: CellAddress) -> FormulaValue {
        match sheet {
            Some(name) if !name.eq_ignore_ascii_case(self.name()) => {
                FormulaValue::Error(ErrorKind::Ref)
            }
            _ => self
                .value_ref(address.row, address.col)
                .map(FormulaValue::from)
                .unwrap_or_default(),
        }
    }
}

/// A workbook viewed from one of its sheets
#[derive(Debug, Clone, Copy)]
pub struct WorkbookSource<'a> {
    workbook: &'a Workbook,
    sheet: usize,
}

impl<'a> WorkbookSource<'a> {
    pub fn new(workbook: &'a Workbook, sheet: usize) -> Self {
        Self { workbook, sheet }
    }
}

impl CellSource for WorkbookSource<'_> {
    fn cell_value(&self, sheet: Option<&str>, address: CellAddress) -> FormulaValue {
        let worksheet = match sheet {
            Some(name) => self.workbook.worksheet_by_name(name),
            None => self.workbook.worksheet(self.sheet),
        };
        match worksheet {
            Some(ws) => ws
                .value_ref(address.row, address.col)
                .map(FormulaValue::from)
                .unwrap_or_default(),
            None => FormulaValue::Error(ErrorKind::Ref),
        }
    }
}

/// Context for formula evaluation
pub struct EvaluationContext<'a> {
    /// Where cell values come from
    pub source: &'a dyn CellSource,
    /// The cell being computed
    pub current_cell: CellAddress,
    /// Lambda parameters and `LET` names in scope
    pub bindings: Bindings,
    /// Workbook-scoped named lambdas
    pub named_lambdas: &'a NamedLambdas,
    /// Function table
    pub registry: &'a FunctionRegistry,
    pub options: EngineOptions,
    /// Anchor/target shift applied to every reference, if any
    pub shift: Option<ReferenceShift>,
    pub(crate) depth: usize,
}

impl<'a> EvaluationContext<'a> {
    /// Create a context with the shared registry, no named lambdas and
    /// default options
    pub fn new(source: &'a dyn CellSource, current_cell: CellAddress) -> Self {
        Self {
            source,
            current_cell,
            bindings: Bindings::new(),
            named_lambdas: NamedLambdas::empty(),
            registry: FunctionRegistry::shared(),
            options: EngineOptions::default(),
            shift: None,
            depth: 0,
        }
    }

    pub fn with_named_lambdas(mut self, named_lambdas: &'a NamedLambdas) -> Self {
        self.named_lambdas = named_lambdas;
        self
    }

    pub fn with_registry(mut self, registry: &'a FunctionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_shift(mut self, shift: ReferenceShift) -> Self {
        self.shift = Some(shift);
        self
    }

    pub fn with_bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// Current lambda nesting depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Same context with a different scope
    pub(crate) fn scoped(&self, bindings: Bindings, depth: usize) -> EvaluationContext<'a> {
        EvaluationContext {
            source: self.source,
            current_cell: self.current_cell,
            bindings,
            named_lambdas: self.named_lambdas,
            registry: self.registry,
            options: self.options,
            shift: self.shift,
            depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellsmith_core::CellValue;

    #[test]
    fn test_worksheet_source() {
        let mut ws = Worksheet::new("Data");
        ws.set_cell_value("B2", 5).unwrap();

        let addr = CellAddress::new(1, 1);
        assert_eq!(ws.cell_value(None, addr), FormulaValue::Number(5.0));
        assert_eq!(ws.cell_value(Some("data"), addr), FormulaValue::Number(5.0));
        assert_eq!(
            ws.cell_value(Some("Other"), addr),
            FormulaValue::Error(ErrorKind::Ref)
        );
        assert_eq!(ws.cell_value(None, CellAddress::new(0, 0)), FormulaValue::Empty);
    }

    #[test]
    fn test_workbook_source_cross_sheet() {
        let mut wb = Workbook::new();
        wb.add_worksheet_with_name("Rates").unwrap();
        wb.worksheet_mut(1)
            .unwrap()
            .set_cell_value("A1", CellValue::from("x"))
            .unwrap();

        let source = WorkbookSource::new(&wb, 0);
        let a1 = CellAddress::new(0, 0);
        assert_eq!(source.cell_value(None, a1), FormulaValue::Empty);
        assert_eq!(source.cell_value(Some("RATES"), a1), FormulaValue::from("x"));
        assert_eq!(
            source.cell_value(Some("Missing"), a1),
            FormulaValue::Error(ErrorKind::Ref)
        );
    }

    #[test]
    fn test_default_options() {
        let options = EngineOptions::default();
        assert_eq!(options.max_call_depth, 1000);
        assert_eq!(options.max_array_dimension, 10_000);
        assert!(options.cache_formulas);
        assert_eq!(options.blank_equality, BlankEquality::Strict);
    }
}
