//! Documents: a workbook with its named lambdas and formula engine
//!
//! The formula subsystem never owns workbook state. A [`Document`] is the
//! caller that does: it holds the cells, the workbook-scoped named lambdas and
//! the engine, and passes them to each evaluation.
//!
//! # Example
//!
//! ```rust
//! use cellsmith::prelude::*;
//!
//! let mut doc = Document::new();
//! doc.workbook_mut().worksheet_mut(0).unwrap().set_cell_value("A1", 20.0).unwrap();
//! doc.define_named_lambda_formula("HALF", "=LAMBDA(x, x / 2)").unwrap();
//!
//! assert_eq!(doc.evaluate(0, "B1", "=HALF(A1)").unwrap(), FormulaValue::Number(10.0));
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use cellsmith_core::{CellAddress, ConditionalFormatRule, Workbook};
use cellsmith_formula::{
    ConditionalFormula, EngineOptions, FormulaEngine, FormulaError, FormulaValue, LambdaFunction,
    NamedLambdas, WorkbookSource,
};
use thiserror::Error;

/// Result type for document operations
pub type DocumentResult<T> = std::result::Result<T, DocumentError>;

/// Errors raised by [`Document`] operations
///
/// Formula evaluation itself never fails; these cover bad addresses, missing
/// sheets and invalid definitions.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Core(#[from] cellsmith_core::Error),

    #[error(transparent)]
    Formula(#[from] FormulaError),
}

/// A conditional format that applies to a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedFormat {
    pub cell: CellAddress,
    /// Priority of the rule that matched
    pub priority: u32,
    pub format_id: Option<u32>,
}

/// A workbook together with its named lambdas and formula engine
#[derive(Debug)]
pub struct Document {
    workbook: Workbook,
    named_lambdas: NamedLambdas,
    engine: FormulaEngine,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document with one empty sheet
    pub fn new() -> Self {
        Self::from_workbook(Workbook::new())
    }

    pub fn from_workbook(workbook: Workbook) -> Self {
        Self {
            workbook,
            named_lambdas: NamedLambdas::new(),
            engine: FormulaEngine::new(),
        }
    }

    /// Replace the engine with one using `options`
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.engine = FormulaEngine::with_options(options);
        self
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    pub fn workbook_mut(&mut self) -> &mut Workbook {
        &mut self.workbook
    }

    pub fn engine(&self) -> &FormulaEngine {
        &self.engine
    }

    /// Mutable engine access, for registering custom functions
    pub fn engine_mut(&mut self) -> &mut FormulaEngine {
        &mut self.engine
    }

    pub fn named_lambdas(&self) -> &NamedLambdas {
        &self.named_lambdas
    }

    /// Define or replace a workbook-scoped named lambda
    pub fn define_named_lambda(&mut self, name: &str, lambda: LambdaFunction) -> DocumentResult<()> {
        self.named_lambdas.define(name, lambda)?;
        Ok(())
    }

    /// Define a named lambda from formula text such as `=LAMBDA(x, x*2)`
    pub fn define_named_lambda_formula(&mut self, name: &str, formula: &str) -> DocumentResult<()> {
        self.named_lambdas.define_formula(name, formula)?;
        Ok(())
    }

    pub fn remove_named_lambda(&mut self, name: &str) -> Option<Arc<LambdaFunction>> {
        self.named_lambdas.remove(name)
    }

    /// Evaluate `formula` as if it were entered at `cell` on sheet `sheet`
    pub fn evaluate(&self, sheet: usize, cell: &str, formula: &str) -> DocumentResult<FormulaValue> {
        let address = CellAddress::parse(cell)?;
        self.evaluate_at(sheet, address, formula)
    }

    pub fn evaluate_at(
        &self,
        sheet: usize,
        address: CellAddress,
        formula: &str,
    ) -> DocumentResult<FormulaValue> {
        self.check_sheet(sheet)?;
        let source = WorkbookSource::new(&self.workbook, sheet);
        Ok(self
            .engine
            .evaluate_with(formula, &source, address, &self.named_lambdas))
    }

    /// Every cell covered by `rule` where its formula holds
    pub fn conditional_matches(
        &self,
        sheet: usize,
        rule: &ConditionalFormatRule,
    ) -> DocumentResult<Vec<CellAddress>> {
        self.check_sheet(sheet)?;
        let formula = ConditionalFormula::from_rule(rule)?.with_options(self.engine.options());
        let source = WorkbookSource::new(&self.workbook, sheet);
        Ok(rule
            .cells()
            .filter(|&cell| {
                formula.matches_with(cell, &source, &self.named_lambdas, self.engine.registry())
            })
            .collect())
    }

    /// Apply every rule on `sheet` in priority order
    ///
    /// A matching rule with stop-if-true set keeps lower-priority rules from
    /// applying to that cell. Rules whose formula does not compile match
    /// nothing.
    pub fn evaluate_conditional_formats(&self, sheet: usize) -> DocumentResult<Vec<AppliedFormat>> {
        let worksheet = self
            .workbook
            .worksheet(sheet)
            .ok_or(cellsmith_core::Error::SheetOutOfBounds(sheet, self.workbook.sheet_count()))?;
        let source = WorkbookSource::new(&self.workbook, sheet);

        let mut applied = Vec::new();
        let mut stopped: HashSet<CellAddress> = HashSet::new();
        for rule in worksheet.conditional_formats() {
            let formula = match ConditionalFormula::from_rule(rule) {
                Ok(formula) => formula.with_options(self.engine.options()),
                Err(e) => {
                    log::warn!("skipping conditional format {:?}: {}", rule.formula, e);
                    continue;
                }
            };
            let mut newly_stopped = Vec::new();
            for cell in rule.cells() {
                if stopped.contains(&cell) {
                    continue;
                }
                if formula.matches_with(cell, &source, &self.named_lambdas, self.engine.registry()) {
                    applied.push(AppliedFormat {
                        cell,
                        priority: rule.priority,
                        format_id: rule.format_id,
                    });
                    if rule.stop_if_true {
                        newly_stopped.push(cell);
                    }
                }
            }
            stopped.extend(newly_stopped);
        }
        Ok(applied)
    }

    fn check_sheet(&self, sheet: usize) -> DocumentResult<()> {
        if sheet >= self.workbook.sheet_count() {
            let count = self.workbook.sheet_count();
            return Err(cellsmith_core::Error::SheetOutOfBounds(sheet, count).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellsmith_core::{CellRange, ErrorKind};
    use pretty_assertions::assert_eq;

    fn document() -> Document {
        let mut doc = Document::new();
        let sheet = doc.workbook_mut().worksheet_mut(0).unwrap();
        for row in 0..5u32 {
            sheet.set_cell_value_at(row, 0, (row + 1) as f64 * 10.0).unwrap();
        }
        doc
    }

    #[test]
    fn test_evaluate() {
        let doc = document();
        assert_eq!(doc.evaluate(0, "B1", "=SUM(A1:A5)").unwrap(), FormulaValue::Number(150.0));
        assert_eq!(doc.evaluate(0, "B1", "=A6").unwrap(), FormulaValue::Empty);
    }

    #[test]
    fn test_evaluate_rejects_bad_input() {
        let doc = document();
        assert!(matches!(
            doc.evaluate(3, "A1", "=1"),
            Err(DocumentError::Core(cellsmith_core::Error::SheetOutOfBounds(3, 1)))
        ));
        assert!(matches!(
            doc.evaluate(0, "not a cell", "=1"),
            Err(DocumentError::Core(_))
        ));
    }

    #[test]
    fn test_named_lambda_lifecycle() {
        let mut doc = document();
        doc.define_named_lambda_formula("TRIPLE", "=LAMBDA(x, x*3)").unwrap();
        assert_eq!(doc.evaluate(0, "B1", "=TRIPLE(A2)").unwrap(), FormulaValue::Number(60.0));

        assert!(doc.remove_named_lambda("triple").is_some());
        assert_eq!(
            doc.evaluate(0, "B1", "=TRIPLE(A2)").unwrap(),
            FormulaValue::Error(ErrorKind::Name)
        );

        let lambda = LambdaFunction::parse("=LAMBDA(a, b, a-b)").unwrap();
        doc.define_named_lambda("MINUS", lambda).unwrap();
        assert_eq!(doc.evaluate(0, "B1", "=MINUS(A3, A1)").unwrap(), FormulaValue::Number(20.0));
    }

    #[test]
    fn test_conditional_matches() {
        let doc = document();
        let rule = ConditionalFormatRule::expression("=A1>25")
            .with_range(CellRange::parse("A1:A5").unwrap());
        let cells = doc.conditional_matches(0, &rule).unwrap();
        assert_eq!(
            cells,
            vec![CellAddress::new(2, 0), CellAddress::new(3, 0), CellAddress::new(4, 0)]
        );
    }

    #[test]
    fn test_stop_if_true() {
        let mut doc = document();
        let sheet = doc.workbook_mut().worksheet_mut(0).unwrap();
        sheet.add_conditional_format(
            ConditionalFormatRule::expression("=A1>=40")
                .with_range(CellRange::parse("A1:A5").unwrap())
                .with_priority(1)
                .with_stop_if_true(true)
                .with_format_id(7),
        );
        sheet.add_conditional_format(
            ConditionalFormatRule::expression("=A1>=20")
                .with_range(CellRange::parse("A1:A5").unwrap())
                .with_priority(2)
                .with_format_id(8),
        );
        sheet.add_conditional_format(
            ConditionalFormatRule::expression("=A1>")
                .with_range(CellRange::parse("A1:A5").unwrap())
                .with_priority(3),
        );

        let applied = doc.evaluate_conditional_formats(0).unwrap();
        let summary: Vec<(u32, Option<u32>)> = applied
            .iter()
            .map(|a| (a.cell.row, a.format_id))
            .collect();
        assert_eq!(
            summary,
            vec![(3, Some(7)), (4, Some(7)), (1, Some(8)), (2, Some(8))]
        );
    }
}
