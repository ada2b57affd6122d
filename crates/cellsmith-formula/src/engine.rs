//! Formula engine facade
//!
//! [`FormulaEngine`] ties parsing and evaluation together: it owns a function
//! registry and the engine options, and keeps compiled formulas in a cache
//! keyed by formula text so repeated evaluation skips the parser.

use std::sync::{Arc, RwLock};

use ahash::AHashMap;
use cellsmith_core::{CellAddress, ErrorKind};

use crate::ast::FormulaExpr;
use crate::context::{CellSource, EngineOptions, EvaluationContext};
use crate::error::FormulaResult;
use crate::evaluator::evaluate_value;
use crate::functions::{FunctionDef, FunctionRegistry};
use crate::lambda::NamedLambdas;
use crate::parser::parse_formula;
use crate::reference::Reference;
use crate::value::FormulaValue;

/// A parsed formula together with the references it contains
///
/// Immutable once built, so one instance can be evaluated repeatedly and
/// from several threads at once.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFormula {
    text: String,
    ast: FormulaExpr,
    references: Vec<Reference>,
}

impl CompiledFormula {
    /// Parse `text` and record its references in formula order
    pub fn compile(text: &str) -> FormulaResult<Self> {
        let ast = parse_formula(text)?;
        let references = ast.references();
        Ok(Self {
            text: text.to_string(),
            ast,
            references,
        })
    }

    /// The formula text this was compiled from
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn ast(&self) -> &FormulaExpr {
        &self.ast
    }

    /// Every reference, a range contributing its `from` then its `to`
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Evaluate against an already-built context
    pub fn evaluate(&self, ctx: &EvaluationContext) -> FormulaValue {
        finish(evaluate_value(&self.ast, ctx))
    }
}

/// A closure cannot be displayed in a cell
pub(crate) fn finish(value: FormulaValue) -> FormulaValue {
    match value {
        FormulaValue::Lambda(_) => FormulaValue::Error(ErrorKind::Calc),
        other => other,
    }
}

/// Parses, caches and evaluates formulas
///
/// # Example
///
/// ```rust
/// use cellsmith_core::CellAddress;
/// use cellsmith_formula::{EmptySource, FormulaEngine, FormulaValue};
///
/// let engine = FormulaEngine::new();
/// let value = engine.evaluate("=SUM(1, 2, 3)", &EmptySource, CellAddress::new(0, 0));
/// assert_eq!(value, FormulaValue::Number(6.0));
/// ```
#[derive(Debug)]
pub struct FormulaEngine {
    registry: FunctionRegistry,
    options: EngineOptions,
    cache: RwLock<AHashMap<String, Arc<CompiledFormula>>>,
}

impl Default for FormulaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FormulaEngine {
    /// Engine with every built-in function and default options
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            registry: FunctionRegistry::new(),
            options,
            cache: RwLock::new(AHashMap::new()),
        }
    }

    /// Replace the function table
    pub fn with_registry(mut self, registry: FunctionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Add or replace a function
    pub fn register_function(&mut self, def: FunctionDef) {
        self.registry.register(def);
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Compile `text`, reusing a cached compilation when caching is enabled
    pub fn compile(&self, text: &str) -> FormulaResult<Arc<CompiledFormula>> {
        if !self.options.cache_formulas {
            return CompiledFormula::compile(text).map(Arc::new);
        }

        if let Some(hit) = self
            .cache
            .read()
            .ok()
            .and_then(|cache| cache.get(text).cloned())
        {
            return Ok(hit);
        }

        log::debug!("compiling formula {:?}", text);
        let compiled = Arc::new(CompiledFormula::compile(text)?);
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(text.to_string(), Arc::clone(&compiled));
        }
        Ok(compiled)
    }

    /// Evaluate `text` at `current_cell` with no named lambdas
    pub fn evaluate(
        &self,
        text: &str,
        source: &dyn CellSource,
        current_cell: CellAddress,
    ) -> FormulaValue {
        self.evaluate_with(text, source, current_cell, NamedLambdas::empty())
    }

    /// Evaluate `text` at `current_cell` with the caller's named lambdas
    ///
    /// Parse failures come back as the error value their kind maps to.
    pub fn evaluate_with(
        &self,
        text: &str,
        source: &dyn CellSource,
        current_cell: CellAddress,
        named_lambdas: &NamedLambdas,
    ) -> FormulaValue {
        let compiled = match self.compile(text) {
            Ok(compiled) => compiled,
            Err(e) => {
                log::debug!("formula {:?} failed to parse: {}", text, e);
                return FormulaValue::Error(e.error_kind());
            }
        };
        let ctx = self.context(source, current_cell, named_lambdas);
        compiled.evaluate(&ctx)
    }

    /// Build an evaluation context that uses this engine's registry and options
    pub fn context<'a>(
        &'a self,
        source: &'a dyn CellSource,
        current_cell: CellAddress,
        named_lambdas: &'a NamedLambdas,
    ) -> EvaluationContext<'a> {
        EvaluationContext::new(source, current_cell)
            .with_registry(&self.registry)
            .with_named_lambdas(named_lambdas)
            .with_options(self.options)
    }

    /// Drop every cached compilation
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }

    /// Number of cached compilations
    pub fn cache_len(&self) -> usize {
        self.cache.read().map(|cache| cache.len()).unwrap_or(0)
    }
}
