//! Formula Abstract Syntax Tree types

use std::sync::Arc;

use cellsmith_core::ErrorKind;

use crate::reference::Reference;
use crate::stack::with_headroom;

/// Formula expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaExpr {
    // === Literals ===
    /// Numeric literal
    Number(f64),
    /// String literal
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// Error literal
    Error(ErrorKind),
    /// Omitted function argument, as in `IF(A1,,1)`
    Missing,

    // === References ===
    /// Single cell reference
    CellRef(CellReference),
    /// Range reference
    RangeRef(RangeReference),
    /// Bare identifier: a lambda parameter, `LET` name or named lambda
    NameRef(String),

    // === Operators ===
    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },
    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<FormulaExpr>,
    },

    // === Calls ===
    /// Call by name (built-in, named lambda or bound lambda)
    Function { name: String, args: Vec<FormulaExpr> },
    /// Call of a computed callee, as in `LAMBDA(x,x+1)(41)`
    Call {
        callee: Box<FormulaExpr>,
        args: Vec<FormulaExpr>,
    },

    // === Array ===
    Array(Vec<Vec<FormulaExpr>>),

    // === Closures ===
    /// `LAMBDA(params..., body)`; the body is evaluated only on invocation
    Lambda {
        params: Vec<String>,
        body: Arc<FormulaExpr>,
    },
}

/// Cell reference with optional sheet
#[derive(Debug, Clone, PartialEq)]
pub struct CellReference {
    pub sheet: Option<String>,
    pub reference: Reference,
}

/// Range reference with optional sheet; endpoints are kept as written
#[derive(Debug, Clone, PartialEq)]
pub struct RangeReference {
    pub sheet: Option<String>,
    pub from: Reference,
    pub to: Reference,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Text
    Concat,

    // Reference union `(A1:A2,B5)`
    Union,
}

impl BinaryOperator {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterEqual
        )
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Percent,
}

impl FormulaExpr {
    /// Every reference in the order it appears in the formula text
    ///
    /// A range contributes its `from` endpoint and then its `to` endpoint.
    pub fn references(&self) -> Vec<Reference> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut Vec<Reference>) {
        with_headroom(|| self.collect_references_here(out))
    }

    fn collect_references_here(&self, out: &mut Vec<Reference>) {
        match self {
            FormulaExpr::CellRef(cell) => out.push(cell.reference),
            FormulaExpr::RangeRef(range) => {
                out.push(range.from);
                out.push(range.to);
            }
            FormulaExpr::BinaryOp { left, right, .. } => {
                left.collect_references(out);
                right.collect_references(out);
            }
            FormulaExpr::UnaryOp { operand, .. } => operand.collect_references(out),
            FormulaExpr::Function { args, .. } => {
                for arg in args {
                    arg.collect_references(out);
                }
            }
            FormulaExpr::Call { callee, args } => {
                callee.collect_references(out);
                for arg in args {
                    arg.collect_references(out);
                }
            }
            FormulaExpr::Array(rows) => {
                for item in rows.iter().flatten() {
                    item.collect_references(out);
                }
            }
            FormulaExpr::Lambda { body, .. } => body.collect_references(out),
            FormulaExpr::Number(_)
            | FormulaExpr::String(_)
            | FormulaExpr::Boolean(_)
            | FormulaExpr::Error(_)
            | FormulaExpr::Missing
            | FormulaExpr::NameRef(_) => {}
        }
    }
}
