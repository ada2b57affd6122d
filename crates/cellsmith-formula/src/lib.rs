//! # cellsmith-formula
//!
//! Formula parser and evaluator for cellsmith.
//!
//! This crate provides:
//! - Formula lexing and parsing (text → AST)
//! - Formula evaluation (AST → value) with dynamic arrays and `LAMBDA` closures
//! - Built-in functions: math, logical, text, criteria aggregates, database,
//!   engineering and array helpers
//! - [`FormulaEngine`], a facade with a compiled-formula cache
//! - [`ConditionalFormula`], the conditional formatting formula compiler
//!
//! ## Example
//!
//! ```rust
//! use cellsmith_core::CellAddress;
//! use cellsmith_formula::{evaluate, parse_formula, EvaluationContext, FnSource, FormulaValue};
//!
//! let source = FnSource::new(|addr: CellAddress| FormulaValue::Number(addr.row as f64 + 1.0));
//! let ctx = EvaluationContext::new(&source, CellAddress::new(0, 3));
//!
//! let ast = parse_formula("=MAKEARRAY(2, 2, LAMBDA(r, c, r * c))").unwrap();
//! assert_eq!(evaluate(&ast, &ctx).unwrap().dimensions(), (2, 2));
//!
//! let ast = parse_formula("=SUM(A1:A10)").unwrap();
//! assert_eq!(evaluate(&ast, &ctx).unwrap(), FormulaValue::Number(55.0));
//! ```

pub mod ast;
pub mod conditional;
pub mod context;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lambda;
pub mod lexer;
pub mod parser;
pub mod reference;
mod stack;
pub mod value;

pub use ast::{BinaryOperator, CellReference, FormulaExpr, RangeReference, UnaryOperator};
pub use conditional::{is_truthy, ConditionalFormula};
pub use context::{
    BlankEquality, CellSource, EmptySource, EngineOptions, EvaluationContext, FnSource,
    WorkbookSource,
};
pub use engine::{CompiledFormula, FormulaEngine};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{call_function, compare_values, evaluate, evaluate_value, values_equal};
pub use functions::{ArrayPolicy, FunctionDef, FunctionImpl, FunctionRegistry};
pub use lambda::{Bindings, LambdaFunction, NamedLambdas};
pub use lexer::{tokenize, Token};
pub use parser::parse_formula;
pub use reference::{resolve, Reference, ReferenceShift};
pub use value::FormulaValue;
