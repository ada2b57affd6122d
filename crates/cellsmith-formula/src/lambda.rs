//! Lambda closures and workbook-scoped named lambdas

use std::sync::Arc;

use ahash::AHashMap;
use once_cell::sync::Lazy;
use cellsmith_core::{CellAddress, ErrorKind};

use crate::ast::FormulaExpr;
use crate::context::{EmptySource, EvaluationContext};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::evaluate;
use crate::lexer::is_cell_reference;
use crate::parser::parse_formula;
use crate::value::FormulaValue;

/// Names in scope during evaluation (lambda parameters and `LET` names)
///
/// A persistent scope chain: binding names pushes a frame that points at the
/// previous one, so every earlier snapshot stays untouched and a closure never
/// observes bindings made after it was created. Binding is O(1) in the number
/// of names already in scope. Names are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct Bindings(Option<Arc<Frame>>);

#[derive(Debug)]
struct Frame {
    entries: Vec<(String, FormulaValue)>,
    parent: Option<Arc<Frame>>,
}

impl Drop for Frame {
    // Unlink long chains iteratively
    fn drop(&mut self) {
        let mut parent = self.parent.take();
        while let Some(frame) = parent {
            parent = match Arc::try_unwrap(frame) {
                Ok(mut frame) => frame.parent.take(),
                Err(_) => None,
            };
        }
    }
}

impl Bindings {
    pub fn new() -> Self {
        Self(None)
    }

    /// Look up a name
    pub fn get(&self, name: &str) -> Option<&FormulaValue> {
        let upper;
        let key = if name.bytes().any(|b| b.is_ascii_lowercase()) {
            upper = name.to_ascii_uppercase();
            upper.as_str()
        } else {
            name
        };
        self.frames()
            .find_map(|frame| frame.entries.iter().rev().find(|(k, _)| k == key))
            .map(|(_, value)| value)
    }

    /// New snapshot with one more binding
    pub fn with(&self, name: &str, value: FormulaValue) -> Self {
        self.extend([(name, value)])
    }

    /// New snapshot with several more bindings
    pub fn extend<'n, I>(&self, entries: I) -> Self
    where
        I: IntoIterator<Item = (&'n str, FormulaValue)>,
    {
        let entries: Vec<_> = entries
            .into_iter()
            .map(|(name, value)| (name.to_ascii_uppercase(), value))
            .collect();
        if entries.is_empty() {
            return self.clone();
        }
        Self(Some(Arc::new(Frame {
            entries,
            parent: self.0.clone(),
        })))
    }

    /// Number of distinct names in scope
    pub fn len(&self) -> usize {
        self.visible().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    fn frames(&self) -> impl Iterator<Item = &Frame> {
        std::iter::successors(self.0.as_deref(), |frame| frame.parent.as_deref())
    }

    /// Innermost value for each name
    fn visible(&self) -> AHashMap<&str, &FormulaValue> {
        let mut names = AHashMap::new();
        for frame in self.frames() {
            for (name, value) in frame.entries.iter().rev() {
                names.entry(name.as_str()).or_insert(value);
            }
        }
        names
    }
}

impl PartialEq for Bindings {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) if Arc::ptr_eq(a, b) => true,
            (None, None) => true,
            _ => self.visible() == other.visible(),
        }
    }
}

/// A closure produced by evaluating `LAMBDA(...)`
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaFunction {
    pub parameters: Vec<String>,
    pub body: Arc<FormulaExpr>,
    /// Bindings in scope when the closure was created
    pub captured: Bindings,
}

impl LambdaFunction {
    pub fn new(parameters: Vec<String>, body: Arc<FormulaExpr>, captured: Bindings) -> Self {
        Self {
            parameters,
            body,
            captured,
        }
    }

    /// Build a closure from `LAMBDA(...)` text with nothing captured
    pub fn parse(formula: &str) -> FormulaResult<Self> {
        match parse_formula(formula)? {
            FormulaExpr::Lambda { params, body } => Ok(Self::new(params, body, Bindings::new())),
            _ => Err(FormulaError::Argument(format!(
                "'{}' is not a LAMBDA expression",
                formula
            ))),
        }
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}

/// Workbook-scoped lambdas callable by name
///
/// Owned by the document, never global: each workbook (and each test) has
/// its own set, passed to evaluation through the context.
#[derive(Debug, Clone, Default)]
pub struct NamedLambdas {
    lambdas: AHashMap<String, Arc<LambdaFunction>>,
}

static EMPTY: Lazy<NamedLambdas> = Lazy::new(NamedLambdas::new);

impl NamedLambdas {
    pub fn new() -> Self {
        Self::default()
    }

    /// A shared set with no definitions
    pub fn empty() -> &'static NamedLambdas {
        &EMPTY
    }

    /// Register a lambda under `name`, replacing any previous definition
    pub fn define(&mut self, name: &str, lambda: LambdaFunction) -> FormulaResult<()> {
        validate_name(name)?;
        log::debug!("defining named lambda {}", name);
        self.lambdas
            .insert(name.to_ascii_uppercase(), Arc::new(lambda));
        Ok(())
    }

    /// Register the closure produced by evaluating `formula`
    ///
    /// The formula may be a plain `LAMBDA(...)` or anything evaluating to one,
    /// such as `LET(rate, 0.2, LAMBDA(x, x*rate))`. It may call other named
    /// lambdas, including itself.
    pub fn define_formula(&mut self, name: &str, formula: &str) -> FormulaResult<()> {
        validate_name(name)?;
        let expr = parse_formula(formula)?;
        let value = {
            let ctx = EvaluationContext::new(&EmptySource, CellAddress::new(0, 0))
                .with_named_lambdas(self);
            evaluate(&expr, &ctx)?
        };
        match value {
            FormulaValue::Lambda(lambda) => {
                log::debug!("defining named lambda {} from formula", name);
                self.lambdas.insert(name.to_ascii_uppercase(), lambda);
                Ok(())
            }
            FormulaValue::Error(kind) => Err(FormulaError::Value(kind)),
            other => Err(FormulaError::Argument(format!(
                "'{}' evaluates to {}, not a LAMBDA",
                formula,
                other.type_name()
            ))),
        }
    }

    /// Remove a definition
    pub fn remove(&mut self, name: &str) -> Option<Arc<LambdaFunction>> {
        self.lambdas.remove(&name.to_ascii_uppercase())
    }

    /// Look up a definition (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&Arc<LambdaFunction>> {
        if self.lambdas.is_empty() {
            return None;
        }
        self.lambdas.get(&name.to_ascii_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.lambdas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lambdas.is_empty()
    }

    /// Defined names, upper-cased
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.lambdas.keys().map(String::as_str)
    }
}

fn validate_name(name: &str) -> FormulaResult<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map_or(false, |c| c.is_alphabetic() || c == '_' || c == '\\');
    let valid_rest = chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.');
    let reserved = name.eq_ignore_ascii_case("TRUE")
        || name.eq_ignore_ascii_case("FALSE")
        || is_cell_reference(name);

    if valid_start && valid_rest && !reserved {
        Ok(())
    } else {
        Err(FormulaError::parse(
            ErrorKind::Name,
            format!("'{}' is not a valid lambda name", name),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bindings_are_snapshots() {
        let outer = Bindings::new().with("x", FormulaValue::Number(1.0));
        let inner = outer.with("y", FormulaValue::Number(2.0));
        let shadowed = inner.with("X", FormulaValue::Number(3.0));

        assert_eq!(outer.len(), 1);
        assert_eq!(outer.get("y"), None);
        assert_eq!(inner.get("X"), Some(&FormulaValue::Number(1.0)));
        assert_eq!(shadowed.get("x"), Some(&FormulaValue::Number(3.0)));
        assert_eq!(inner.get("x"), Some(&FormulaValue::Number(1.0)));
    }

    #[test]
    fn test_bindings_equality() {
        let a = Bindings::new().with("x", FormulaValue::Number(1.0));
        let b = Bindings::new().with("X", FormulaValue::Number(1.0));
        assert_eq!(a, b);
        assert_ne!(a, Bindings::new());
        assert_eq!(Bindings::new(), Bindings::new());
        assert_eq!(a.with("x", FormulaValue::Number(1.0)), a);
    }

    #[test]
    fn test_long_let_chain() {
        let mut bindings = Bindings::new();
        for i in 0..100_000 {
            bindings = bindings.with(&format!("n{}", i), FormulaValue::Number(i as f64));
        }
        assert_eq!(bindings.get("N0"), Some(&FormulaValue::Number(0.0)));
        assert_eq!(bindings.get("n99999"), Some(&FormulaValue::Number(99999.0)));
        assert_eq!(bindings.len(), 100_000);
        drop(bindings);
    }

    #[test]
    fn test_shared_empty_set() {
        assert!(NamedLambdas::empty().is_empty());
        assert!(std::ptr::eq(NamedLambdas::empty(), NamedLambdas::empty()));
        assert!(NamedLambdas::empty().get("ANY").is_none());
    }

    #[test]
    fn test_parse_lambda() {
        let lambda = LambdaFunction::parse("=LAMBDA(a, b, a*b)").unwrap();
        assert_eq!(lambda.arity(), 2);
        assert_eq!(lambda.parameters, vec!["a", "b"]);
        assert!(LambdaFunction::parse("=1+2").is_err());
    }

    #[test]
    fn test_define_and_lookup_case_insensitive() {
        let mut named = NamedLambdas::new();
        named
            .define("Double", LambdaFunction::parse("=LAMBDA(x, x*2)").unwrap())
            .unwrap();

        assert!(named.contains("DOUBLE"));
        assert!(named.get("double").is_some());
        assert_eq!(named.len(), 1);
        assert!(named.remove("dOuBlE").is_some());
        assert!(named.is_empty());
    }

    #[test]
    fn test_define_formula_captures_let() {
        let mut named = NamedLambdas::new();
        named
            .define_formula("TAX", "=LET(rate, 0.2, LAMBDA(x, x*rate))")
            .unwrap();
        let lambda = named.get("tax").unwrap();
        assert_eq!(lambda.captured.get("RATE"), Some(&FormulaValue::Number(0.2)));
    }

    #[test]
    fn test_invalid_names_rejected() {
        let mut named = NamedLambdas::new();
        let lambda = LambdaFunction::parse("=LAMBDA(x, x)").unwrap();
        assert!(named.define("A1", lambda.clone()).is_err());
        assert!(named.define("TRUE", lambda.clone()).is_err());
        assert!(named.define("1ABC", lambda.clone()).is_err());
        assert!(named.define("", lambda).is_err());
        assert!(named.define_formula("ONE", "=1").is_err());
    }
}
