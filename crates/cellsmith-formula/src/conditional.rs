//! Conditional formatting formula compiler
//!
//! A conditional formatting rule is written once, relative to its rule base
//! (the top-left cell of the first range it applies to), and evaluated at
//! every cell the rule covers. [`ConditionalFormula`] parses the text once and
//! evaluates the cached AST at each target with every reference shifted by
//! `target - rule_base`; nothing is re-parsed or cloned per cell.
//!
//! ## Example
//!
//! ```rust
//! use cellsmith_core::CellAddress;
//! use cellsmith_formula::{ConditionalFormula, FnSource, FormulaValue};
//!
//! // Written at B2, so at C5 the reference A1 reads B4
//! let formula = ConditionalFormula::compile("=A1>10", CellAddress::new(1, 1)).unwrap();
//! let source = FnSource::new(|addr: CellAddress| {
//!     if addr == CellAddress::new(3, 1) {
//!         FormulaValue::Number(11.0)
//!     } else {
//!         FormulaValue::Empty
//!     }
//! });
//!
//! assert!(formula.matches(CellAddress::new(4, 2), &source));
//! assert!(!formula.matches(CellAddress::new(1, 1), &source));
//! ```

use cellsmith_core::{CellAddress, ConditionalFormatRule};

use crate::context::{BlankEquality, CellSource, EngineOptions, EvaluationContext};
use crate::engine::CompiledFormula;
use crate::error::{FormulaError, FormulaResult};
use crate::functions::FunctionRegistry;
use crate::lambda::NamedLambdas;
use crate::reference::{Reference, ReferenceShift};
use crate::value::FormulaValue;

/// A conditional formatting formula compiled against its rule base
#[derive(Debug, Clone)]
pub struct ConditionalFormula {
    formula: CompiledFormula,
    rule_base: CellAddress,
    options: EngineOptions,
}

impl ConditionalFormula {
    /// Parse `text` once for evaluation relative to `rule_base`
    pub fn compile(text: &str, rule_base: CellAddress) -> FormulaResult<Self> {
        let formula = CompiledFormula::compile(text).map_err(|e| {
            log::warn!("conditional format formula {:?} failed to compile: {}", text, e);
            e
        })?;
        log::debug!(
            "compiled conditional format formula {:?} at {} with {} references",
            text,
            rule_base,
            formula.references().len()
        );
        Ok(Self {
            formula,
            rule_base: rule_base.relative(),
            options: EngineOptions {
                blank_equality: BlankEquality::Loose,
                ..EngineOptions::default()
            },
        })
    }

    /// Compile a rule's formula against the rule's base cell
    pub fn from_rule(rule: &ConditionalFormatRule) -> FormulaResult<Self> {
        let base = rule.rule_base().ok_or_else(|| {
            FormulaError::InvalidReference(format!("rule {:?} has no ranges", rule.formula))
        })?;
        Self::compile(&rule.formula, base)
    }

    /// Override the engine options; blank equality stays loose
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = EngineOptions {
            blank_equality: BlankEquality::Loose,
            ..options
        };
        self
    }

    pub fn rule_base(&self) -> CellAddress {
        self.rule_base
    }

    pub fn text(&self) -> &str {
        self.formula.text()
    }

    /// References in formula order, as written at the rule base
    pub fn references(&self) -> &[Reference] {
        self.formula.references()
    }

    /// Value of the formula at `target`
    pub fn evaluate(&self, target: CellAddress, source: &dyn CellSource) -> FormulaValue {
        self.evaluate_with(
            target,
            source,
            NamedLambdas::empty(),
            FunctionRegistry::shared(),
        )
    }

    /// Value of the formula at `target` with the caller's named lambdas and
    /// function table
    pub fn evaluate_with(
        &self,
        target: CellAddress,
        source: &dyn CellSource,
        named_lambdas: &NamedLambdas,
        registry: &FunctionRegistry,
    ) -> FormulaValue {
        let ctx = EvaluationContext::new(source, target)
            .with_shift(ReferenceShift::new(self.rule_base, target))
            .with_named_lambdas(named_lambdas)
            .with_registry(registry)
            .with_options(self.options);
        self.formula.evaluate(&ctx)
    }

    /// Whether the rule applies at `target`
    pub fn matches(&self, target: CellAddress, source: &dyn CellSource) -> bool {
        is_truthy(&self.evaluate(target, source))
    }

    /// [`matches`](Self::matches) with named lambdas and a function table
    pub fn matches_with(
        &self,
        target: CellAddress,
        source: &dyn CellSource,
        named_lambdas: &NamedLambdas,
        registry: &FunctionRegistry,
    ) -> bool {
        is_truthy(&self.evaluate_with(target, source, named_lambdas, registry))
    }
}

/// `TRUE` or a non-zero number; arrays look at their top-left element
pub fn is_truthy(value: &FormulaValue) -> bool {
    match value.first() {
        FormulaValue::Boolean(b) => *b,
        FormulaValue::Number(n) => *n != 0.0,
        _ => false,
    }
}
