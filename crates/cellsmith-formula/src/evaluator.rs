//! Formula evaluator
//!
//! Evaluates formula ASTs to produce values.
//!
//! Internally every step returns [`FormulaResult`]; hard failures such as an
//! unknown function or an exceeded call depth travel as `Err` until the next
//! function-argument boundary or the top of the evaluation, where they become
//! ordinary error values. [`evaluate_value`] is the total entry point.

use std::cmp::Ordering;
use std::sync::Arc;

use cellsmith_core::{CellAddress, ErrorKind};

use crate::ast::{BinaryOperator, CellReference, FormulaExpr, RangeReference, UnaryOperator};
use crate::context::{BlankEquality, EvaluationContext};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::{ArrayPolicy, FunctionDef};
use crate::lambda::LambdaFunction;
use crate::reference::Reference;
use crate::stack::with_headroom;
use crate::value::FormulaValue;

/// Lambda depth past which invocations are traced
const TRACE_DEPTH: usize = 100;

/// Evaluate a formula expression
pub fn evaluate(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    with_headroom(|| evaluate_expr(expr, ctx))
}

fn evaluate_expr(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    match expr {
        // === Literals ===
        FormulaExpr::Number(n) => Ok(FormulaValue::Number(*n)),
        FormulaExpr::String(s) => Ok(FormulaValue::Text(s.clone())),
        FormulaExpr::Boolean(b) => Ok(FormulaValue::Boolean(*b)),
        FormulaExpr::Error(e) => Ok(FormulaValue::Error(*e)),
        FormulaExpr::Missing => Ok(FormulaValue::Empty),

        // === References ===
        FormulaExpr::CellRef(cell_ref) => Ok(read_cell(cell_ref, ctx)),
        FormulaExpr::RangeRef(range_ref) => read_range(range_ref, ctx),
        FormulaExpr::NameRef(name) => resolve_name(name, ctx),

        // === Operators ===
        FormulaExpr::BinaryOp { op, left, right } => evaluate_binary_op(*op, left, right, ctx),
        FormulaExpr::UnaryOp { op, operand } => evaluate_unary_op(*op, operand, ctx),

        // === Calls ===
        FormulaExpr::Function { name, args } => evaluate_function(name, args, ctx),
        FormulaExpr::Call { callee, args } => match evaluate(callee, ctx)? {
            FormulaValue::Lambda(lambda) => {
                let values = evaluate_args(args, ctx);
                ctx.call_lambda(&lambda, values)
            }
            FormulaValue::Error(e) => Ok(FormulaValue::Error(e)),
            _ => Ok(FormulaValue::Error(ErrorKind::Value)),
        },

        // === Arrays ===
        FormulaExpr::Array(rows) => {
            let mut result_rows: Vec<Vec<FormulaValue>> = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|item| evaluate_lenient(item, ctx).first().clone())
                        .collect()
                })
                .collect();
            if result_rows.len() == 1 {
                Ok(FormulaValue::Array1D(result_rows.remove(0)))
            } else {
                Ok(FormulaValue::Array2D(result_rows))
            }
        }

        // === Closures ===
        FormulaExpr::Lambda { params, body } => Ok(FormulaValue::Lambda(Arc::new(
            LambdaFunction::new(params.clone(), Arc::clone(body), ctx.bindings.clone()),
        ))),
    }
}

/// Evaluate an expression, turning any failure into an error value
pub fn evaluate_value(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaValue {
    evaluate(expr, ctx).unwrap_or_else(|e| {
        log::debug!("evaluation failed at {}: {}", ctx.current_cell, e);
        FormulaValue::Error(e.error_kind())
    })
}

fn evaluate_lenient(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaValue {
    evaluate(expr, ctx).unwrap_or_else(|e| FormulaValue::Error(e.error_kind()))
}

fn evaluate_args(args: &[FormulaExpr], ctx: &EvaluationContext) -> Vec<FormulaValue> {
    args.iter().map(|arg| evaluate_lenient(arg, ctx)).collect()
}

impl<'a> EvaluationContext<'a> {
    /// Invoke a closure with positional arguments
    ///
    /// Parameters are bound in a new scope chained to the closure's captured
    /// bindings. Arity mismatch and exceeding the call-depth limit are errors.
    pub fn call_lambda(
        &self,
        lambda: &LambdaFunction,
        args: Vec<FormulaValue>,
    ) -> FormulaResult<FormulaValue> {
        if args.len() != lambda.arity() {
            return Err(FormulaError::ArgumentCount {
                function: "LAMBDA".into(),
                expected: lambda.arity().to_string(),
                actual: args.len(),
            });
        }

        let depth = self.depth + 1;
        if depth > self.options.max_call_depth {
            log::warn!(
                "lambda call depth limit of {} exceeded at {}",
                self.options.max_call_depth,
                self.current_cell
            );
            return Err(FormulaError::DepthExceeded {
                limit: self.options.max_call_depth,
            });
        }
        if depth > TRACE_DEPTH {
            log::trace!("lambda call at depth {}", depth);
        }

        let bindings = lambda
            .captured
            .extend(lambda.parameters.iter().map(String::as_str).zip(args));
        let scope = self.scoped(bindings, depth);
        evaluate(&lambda.body, &scope)
    }

    /// Resolve a parsed reference for this evaluation, honoring any shift
    /// and the source bounds
    pub fn resolve_reference(&self, reference: &Reference) -> Option<CellAddress> {
        let address = match &self.shift {
            Some(shift) => shift.apply(reference)?,
            None => reference.literal()?,
        };
        if address.row >= self.source.row_count() || address.col >= self.source.column_count() {
            return None;
        }
        Some(address)
    }
}

// === References ===

fn read_cell(cell_ref: &CellReference, ctx: &EvaluationContext) -> FormulaValue {
    match ctx.resolve_reference(&cell_ref.reference) {
        Some(address) => ctx.source.cell_value(cell_ref.sheet.as_deref(), address),
        None => FormulaValue::Error(ErrorKind::Ref),
    }
}

fn read_range(range_ref: &RangeReference, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (from, to) = match (
        ctx.resolve_reference(&range_ref.from),
        ctx.resolve_reference(&range_ref.to),
    ) {
        (Some(from), Some(to)) => (from, to),
        _ => return Ok(FormulaValue::Error(ErrorKind::Ref)),
    };

    let (top, bottom) = (from.row.min(to.row), from.row.max(to.row));
    let (left, right) = (from.col.min(to.col), from.col.max(to.col));
    let rows = (bottom - top + 1) as usize;
    let cols = (right - left + 1) as usize;
    if rows.saturating_mul(cols) > ctx.options.max_array_cells {
        log::warn!("range of {}x{} cells exceeds the array size limit", rows, cols);
        return Err(FormulaError::ArrayTooLarge { rows, cols });
    }

    let sheet = range_ref.sheet.as_deref();
    let values = (top..=bottom)
        .map(|row| {
            (left..=right)
                .map(|col| ctx.source.cell_value(sheet, CellAddress::new(row, col)))
                .collect()
        })
        .collect();
    Ok(FormulaValue::Array2D(values))
}

fn resolve_name(name: &str, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    if let Some(value) = ctx.bindings.get(name) {
        return Ok(value.clone());
    }
    if let Some(lambda) = ctx.named_lambdas.get(name) {
        return Ok(FormulaValue::Lambda(Arc::clone(lambda)));
    }
    Err(FormulaError::UnknownName(name.to_string()))
}

// === Operators ===

/// Evaluate a binary operation
fn evaluate_binary_op(
    op: BinaryOperator,
    left: &FormulaExpr,
    right: &FormulaExpr,
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    // Both sides are evaluated; the left error wins
    let left_val = evaluate(left, ctx)?;
    let right_val = evaluate(right, ctx)?;

    if op == BinaryOperator::Union {
        let items = left_val.values().chain(right_val.values()).cloned().collect();
        return Ok(FormulaValue::Array1D(items));
    }

    if let Some(e) = left_val.error() {
        return Ok(FormulaValue::Error(e));
    }
    if let Some(e) = right_val.error() {
        return Ok(FormulaValue::Error(e));
    }

    let equality = ctx.options.blank_equality;
    if left_val.is_array() || right_val.is_array() {
        return broadcast(&[left_val, right_val], |pair| {
            Ok(apply_binary(op, &pair[0], &pair[1], equality))
        });
    }
    Ok(apply_binary(op, &left_val, &right_val, equality))
}

/// Apply a binary operator to two scalars
fn apply_binary(
    op: BinaryOperator,
    left: &FormulaValue,
    right: &FormulaValue,
    equality: BlankEquality,
) -> FormulaValue {
    if let Some(e) = left.error().or_else(|| right.error()) {
        return FormulaValue::Error(e);
    }

    match op {
        BinaryOperator::Add
        | BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Power => {
            let (l, r) = match (left.to_number(), right.to_number()) {
                (Ok(l), Ok(r)) => (l, r),
                (Err(e), _) | (_, Err(e)) => return FormulaValue::Error(e.error_kind()),
            };
            arithmetic(op, l, r)
        }

        BinaryOperator::Equal => FormulaValue::Boolean(values_equal(left, right, equality)),
        BinaryOperator::NotEqual => FormulaValue::Boolean(!values_equal(left, right, equality)),
        BinaryOperator::LessThan => {
            FormulaValue::Boolean(compare_values(left, right) == Ordering::Less)
        }
        BinaryOperator::LessEqual => {
            FormulaValue::Boolean(compare_values(left, right) != Ordering::Greater)
        }
        BinaryOperator::GreaterThan => {
            FormulaValue::Boolean(compare_values(left, right) == Ordering::Greater)
        }
        BinaryOperator::GreaterEqual => {
            FormulaValue::Boolean(compare_values(left, right) != Ordering::Less)
        }

        BinaryOperator::Concat => match (left.to_text(), right.to_text()) {
            (Ok(l), Ok(r)) => FormulaValue::Text(l + &r),
            (Err(e), _) | (_, Err(e)) => FormulaValue::Error(e.error_kind()),
        },

        BinaryOperator::Union => FormulaValue::Error(ErrorKind::Value),
    }
}

fn arithmetic(op: BinaryOperator, l: f64, r: f64) -> FormulaValue {
    let result = match op {
        BinaryOperator::Add => l + r,
        BinaryOperator::Subtract => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide => {
            if r == 0.0 {
                return FormulaValue::Error(ErrorKind::DivZero);
            }
            l / r
        }
        BinaryOperator::Power => {
            if l == 0.0 && r == 0.0 {
                return FormulaValue::Error(ErrorKind::Num);
            }
            if l == 0.0 && r < 0.0 {
                return FormulaValue::Error(ErrorKind::DivZero);
            }
            l.powf(r)
        }
        _ => return FormulaValue::Error(ErrorKind::Value),
    };

    if result.is_finite() {
        FormulaValue::Number(result)
    } else {
        FormulaValue::Error(ErrorKind::Num)
    }
}

/// Evaluate a unary operation
fn evaluate_unary_op(
    op: UnaryOperator,
    operand: &FormulaExpr,
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let val = evaluate(operand, ctx)?;

    let apply = |v: &FormulaValue| -> FormulaValue {
        match v.to_number() {
            Ok(n) => match op {
                UnaryOperator::Negate => FormulaValue::Number(-n),
                UnaryOperator::Percent => FormulaValue::Number(n / 100.0),
            },
            Err(e) => FormulaValue::Error(e.error_kind()),
        }
    };

    if val.is_array() {
        return broadcast(std::slice::from_ref(&val), |item| Ok(apply(&item[0])));
    }
    Ok(apply(&val))
}

// === Comparison ===

/// Compare two scalars for ordering (Excel-style comparison)
///
/// Numbers sort before text, text before booleans. Text compares
/// case-insensitively. An empty value takes the type of the other side.
pub fn compare_values(left: &FormulaValue, right: &FormulaValue) -> Ordering {
    fn blank_as(other: &FormulaValue) -> FormulaValue {
        match other {
            FormulaValue::Text(_) => FormulaValue::Text(String::new()),
            FormulaValue::Boolean(_) => FormulaValue::Boolean(false),
            _ => FormulaValue::Number(0.0),
        }
    }

    fn rank(v: &FormulaValue) -> u8 {
        match v {
            FormulaValue::Number(_) | FormulaValue::Empty => 0,
            FormulaValue::Text(_) => 1,
            FormulaValue::Boolean(_) => 2,
            _ => 3,
        }
    }

    match (left, right) {
        (FormulaValue::Empty, FormulaValue::Empty) => Ordering::Equal,
        (FormulaValue::Empty, other) => compare_values(&blank_as(other), other),
        (other, FormulaValue::Empty) => compare_values(other, &blank_as(other)),
        (FormulaValue::Number(l), FormulaValue::Number(r)) => {
            l.partial_cmp(r).unwrap_or(Ordering::Equal)
        }
        (FormulaValue::Text(l), FormulaValue::Text(r)) => compare_text(l, r),
        (FormulaValue::Boolean(l), FormulaValue::Boolean(r)) => l.cmp(r),
        (l, r) => rank(l).cmp(&rank(r)),
    }
}

/// Case-insensitive text ordering
pub fn compare_text(left: &str, right: &str) -> Ordering {
    left.to_lowercase().cmp(&right.to_lowercase())
}

/// Equality for `=` and `<>` under the configured blank semantics
pub fn values_equal(left: &FormulaValue, right: &FormulaValue, equality: BlankEquality) -> bool {
    if equality == BlankEquality::Loose {
        match (left, right) {
            (FormulaValue::Number(n), other) | (other, FormulaValue::Number(n))
                if loosely_zero(other) =>
            {
                return *n == 0.0;
            }
            _ => {}
        }
    }
    compare_values(left, right) == Ordering::Equal
}

fn loosely_zero(value: &FormulaValue) -> bool {
    match value {
        FormulaValue::Empty | FormulaValue::Boolean(false) => true,
        FormulaValue::Text(s) => s.is_empty(),
        _ => false,
    }
}

// === Arrays ===

/// Apply `f` elementwise over arguments of compatible shapes
///
/// Scalars and single-row/single-column arrays stretch to the common shape;
/// cells missing from a smaller array become `#N/A`. The result is an
/// `Array1D` when it is a single row built only from scalars and `Array1D`s.
pub(crate) fn broadcast<F>(args: &[FormulaValue], mut f: F) -> FormulaResult<FormulaValue>
where
    F: FnMut(&[FormulaValue]) -> FormulaResult<FormulaValue>,
{
    let shapes: Vec<Option<(usize, usize)>> = args
        .iter()
        .map(|a| a.is_array().then(|| a.dimensions()))
        .collect();
    let stretch = |pick: fn(&(usize, usize)) -> usize| {
        shapes
            .iter()
            .flatten()
            .map(pick)
            .filter(|&n| n != 1)
            .max()
            .unwrap_or(1)
    };
    let rows = stretch(|s| s.0);
    let cols = stretch(|s| s.1);
    let has_2d = args.iter().any(|a| matches!(a, FormulaValue::Array2D(_)));

    let mut out = Vec::with_capacity(rows);
    let mut scalars = Vec::with_capacity(args.len());
    for r in 0..rows {
        let mut row = Vec::with_capacity(cols);
        for c in 0..cols {
            scalars.clear();
            for (arg, shape) in args.iter().zip(&shapes) {
                let item = match shape {
                    None => arg.clone(),
                    Some((ar, ac)) => {
                        let rr = if *ar == 1 { 0 } else { r };
                        let cc = if *ac == 1 { 0 } else { c };
                        arg.get(rr, cc)
                            .cloned()
                            .unwrap_or(FormulaValue::Error(ErrorKind::NA))
                    }
                };
                scalars.push(item);
            }
            row.push(f(&scalars).unwrap_or_else(|e| FormulaValue::Error(e.error_kind())));
        }
        out.push(row);
    }

    if rows == 1 && !has_2d {
        Ok(FormulaValue::Array1D(out.pop().unwrap_or_default()))
    } else {
        Ok(FormulaValue::Array2D(out))
    }
}

// === Functions ===

/// Evaluate a function call
fn evaluate_function(
    name: &str,
    args: &[FormulaExpr],
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    if let Some(result) = evaluate_special_form(name, args, ctx) {
        return result;
    }

    // Local names shadow named lambdas, which shadow built-ins
    let lambda = match ctx.bindings.get(name) {
        Some(FormulaValue::Lambda(lambda)) => Some(Arc::clone(lambda)),
        Some(FormulaValue::Error(e)) => return Ok(FormulaValue::Error(*e)),
        Some(_) => return Ok(FormulaValue::Error(ErrorKind::Value)),
        None => ctx.named_lambdas.get(name).cloned(),
    };
    if let Some(lambda) = lambda {
        let values = evaluate_args(args, ctx);
        return ctx.call_lambda(&lambda, values);
    }

    let func = ctx
        .registry
        .get(name)
        .ok_or_else(|| FormulaError::UnknownFunction(name.to_string()))?;
    check_arg_count(func, args.len())?;

    let values = evaluate_args(args, ctx);
    call_function(func, &values, ctx)
}

fn check_arg_count(func: &FunctionDef, actual: usize) -> FormulaResult<()> {
    if actual < func.min_args {
        return Err(FormulaError::ArgumentCount {
            function: func.name.to_string(),
            expected: format!("at least {}", func.min_args),
            actual,
        });
    }
    if let Some(max) = func.max_args {
        if actual > max {
            return Err(FormulaError::ArgumentCount {
                function: func.name.to_string(),
                expected: format!("at most {}", max),
                actual,
            });
        }
    }
    Ok(())
}

/// Call a registered function with already-evaluated arguments
pub fn call_function(
    func: &FunctionDef,
    args: &[FormulaValue],
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    if !func.accepts_errors {
        if let Some(e) = args.iter().find_map(FormulaValue::error) {
            return Ok(FormulaValue::Error(e));
        }
    }

    match func.policy {
        ArrayPolicy::Aggregate => (func.implementation)(args, ctx),
        ArrayPolicy::Scalar if args.iter().any(FormulaValue::is_array) => {
            Ok(FormulaValue::Error(ErrorKind::Value))
        }
        ArrayPolicy::Scalar => (func.implementation)(args, ctx),
        ArrayPolicy::Elementwise if args.iter().any(FormulaValue::is_array) => {
            broadcast(args, |scalars| {
                if !func.accepts_errors {
                    if let Some(e) = scalars.iter().find_map(FormulaValue::error) {
                        return Ok(FormulaValue::Error(e));
                    }
                }
                (func.implementation)(scalars, ctx)
            })
        }
        ArrayPolicy::Elementwise => (func.implementation)(args, ctx),
    }
}

/// Functions whose arguments are evaluated lazily or read as references
fn evaluate_special_form(
    name: &str,
    args: &[FormulaExpr],
    ctx: &EvaluationContext,
) -> Option<FormulaResult<FormulaValue>> {
    let result = match name {
        "IF" => evaluate_if(args, ctx),
        "IFERROR" => evaluate_iferror(name, args, ctx, |_| true),
        "IFNA" => evaluate_iferror(name, args, ctx, |e| e == ErrorKind::NA),
        "LET" => evaluate_let(args, ctx),
        "ROW" => evaluate_position(name, args, ctx, |addr| addr.row as f64 + 1.0),
        "COLUMN" => evaluate_position(name, args, ctx, |addr| addr.col as f64 + 1.0),
        _ => return None,
    };
    Some(result)
}

fn special_arity(name: &str, args: &[FormulaExpr], min: usize, max: usize) -> FormulaResult<()> {
    if args.len() < min || args.len() > max {
        return Err(FormulaError::ArgumentCount {
            function: name.to_string(),
            expected: if min == max {
                min.to_string()
            } else {
                format!("{} to {}", min, max)
            },
            actual: args.len(),
        });
    }
    Ok(())
}

/// `IF(condition, [then], [else])`; only the chosen branch is evaluated
fn evaluate_if(args: &[FormulaExpr], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    special_arity("IF", args, 2, 3)?;

    let branch = |index: usize| -> FormulaValue {
        match args.get(index) {
            Some(expr) => evaluate_lenient(expr, ctx),
            None => FormulaValue::Boolean(false),
        }
    };

    let condition = evaluate(&args[0], ctx)?;
    if condition.is_array() {
        let then_val = branch(1);
        let else_val = branch(2);
        return broadcast(&[condition, then_val, else_val], |items| {
            Ok(match items[0].to_bool() {
                Ok(true) => items[1].clone(),
                Ok(false) => items[2].clone(),
                Err(e) => FormulaValue::Error(e.error_kind()),
            })
        });
    }

    match condition.to_bool() {
        Ok(true) => Ok(branch(1)),
        Ok(false) => Ok(branch(2)),
        Err(e) => Ok(FormulaValue::Error(e.error_kind())),
    }
}

/// `IFERROR(value, fallback)` and `IFNA(value, fallback)`
fn evaluate_iferror(
    name: &str,
    args: &[FormulaExpr],
    ctx: &EvaluationContext,
    catches: fn(ErrorKind) -> bool,
) -> FormulaResult<FormulaValue> {
    special_arity(name, args, 2, 2)?;

    let value = evaluate_lenient(&args[0], ctx);
    let caught = |v: &FormulaValue| v.error().map_or(false, catches);

    match value {
        FormulaValue::Array1D(items) if items.iter().any(caught) => {
            let fallback = evaluate_lenient(&args[1], ctx);
            Ok(FormulaValue::Array1D(
                items
                    .into_iter()
                    .map(|v| if caught(&v) { fallback.first().clone() } else { v })
                    .collect(),
            ))
        }
        FormulaValue::Array2D(rows) if rows.iter().flatten().any(caught) => {
            let fallback = evaluate_lenient(&args[1], ctx);
            Ok(FormulaValue::Array2D(
                rows.into_iter()
                    .map(|row| {
                        row.into_iter()
                            .map(|v| if caught(&v) { fallback.first().clone() } else { v })
                            .collect()
                    })
                    .collect(),
            ))
        }
        v if caught(&v) => Ok(evaluate_lenient(&args[1], ctx)),
        v => Ok(v),
    }
}

/// `LET(name1, value1, ..., body)`; each value sees the names before it
fn evaluate_let(args: &[FormulaExpr], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    if args.len() < 3 || args.len() % 2 == 0 {
        return Err(FormulaError::ArgumentCount {
            function: "LET".into(),
            expected: "an odd number, at least 3".into(),
            actual: args.len(),
        });
    }

    let mut bindings = ctx.bindings.clone();
    for pair in args[..args.len() - 1].chunks(2) {
        let name = match &pair[0] {
            FormulaExpr::NameRef(name) => name,
            other => {
                return Err(FormulaError::Argument(format!(
                    "LET name must be an identifier, got {:?}",
                    other
                )))
            }
        };
        let scope = ctx.scoped(bindings.clone(), ctx.depth);
        let value = evaluate_lenient(&pair[1], &scope);
        bindings = bindings.with(name, value);
    }

    let scope = ctx.scoped(bindings, ctx.depth);
    evaluate(&args[args.len() - 1], &scope)
}

/// `ROW([reference])` and `COLUMN([reference])`
fn evaluate_position(
    name: &str,
    args: &[FormulaExpr],
    ctx: &EvaluationContext,
    project: fn(CellAddress) -> f64,
) -> FormulaResult<FormulaValue> {
    special_arity(name, args, 0, 1)?;

    let reference = match args.first() {
        None => return Ok(FormulaValue::Number(project(ctx.current_cell))),
        Some(FormulaExpr::CellRef(cell)) => &cell.reference,
        Some(FormulaExpr::RangeRef(range)) => &range.from,
        Some(_) => {
            return Err(FormulaError::Argument(format!(
                "{} expects a reference",
                name
            )))
        }
    };
    Ok(match ctx.resolve_reference(reference) {
        Some(address) => FormulaValue::Number(project(address)),
        None => FormulaValue::Error(ErrorKind::Ref),
    })
}
