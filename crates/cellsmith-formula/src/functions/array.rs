//! Array construction and lambda helper functions
//!
//! `MAKEARRAY`, `MAP`, `REDUCE`, `SCAN`, `BYROW` and `BYCOL` invoke a lambda
//! argument through the evaluation context, so call depth and scoping apply.
//! The first error value a lambda produces becomes the function's result.

use cellsmith_core::ErrorKind;

use super::number_arg;
use crate::context::EvaluationContext;
use crate::error::{FormulaError, FormulaResult};
use crate::lambda::LambdaFunction;
use crate::value::FormulaValue;

fn lambda_arg(value: &FormulaValue) -> FormulaResult<&LambdaFunction> {
    match value {
        FormulaValue::Lambda(lambda) => Ok(&**lambda),
        FormulaValue::Error(e) => Err((*e).into()),
        other => Err(FormulaError::Argument(format!(
            "expected a LAMBDA, got {}",
            other.type_name()
        ))),
    }
}

/// Validate generated-array dimensions against the engine limits
fn check_shape(rows: f64, cols: f64, ctx: &EvaluationContext) -> FormulaResult<(usize, usize)> {
    let (rows, cols) = (rows.trunc(), cols.trunc());
    if rows < 1.0 || cols < 1.0 {
        return Err(FormulaError::Argument(
            "array dimensions must be at least 1".into(),
        ));
    }

    let limit = ctx.options.max_array_dimension as f64;
    let too_large = rows > limit
        || cols > limit
        || rows * cols > ctx.options.max_array_cells as f64;
    if too_large {
        log::warn!("refusing to build a {}x{} array", rows, cols);
        return Err(FormulaError::ArrayTooLarge {
            rows: rows as usize,
            cols: cols as usize,
        });
    }
    Ok((rows as usize, cols as usize))
}

/// A lambda result stored as an array element
fn element(value: FormulaValue) -> FormulaValue {
    if value.is_array() || matches!(value, FormulaValue::Lambda(_)) {
        FormulaValue::Error(ErrorKind::Calc)
    } else {
        value
    }
}

/// MAKEARRAY(rows, cols, lambda(r, c))
pub fn fn_makearray(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (rows, cols) = check_shape(args[0].to_number()?, args[1].to_number()?, ctx)?;
    let lambda = lambda_arg(&args[2])?;

    let mut result = Vec::with_capacity(rows);
    for r in 1..=rows {
        let mut row = Vec::with_capacity(cols);
        for c in 1..=cols {
            let value = ctx.call_lambda(
                lambda,
                vec![FormulaValue::Number(r as f64), FormulaValue::Number(c as f64)],
            )?;
            if value.is_error() {
                return Ok(value);
            }
            row.push(element(value));
        }
        result.push(row);
    }
    Ok(FormulaValue::Array2D(result))
}

/// MAP(array1, ..., lambda); the result has the first array's shape
pub fn fn_map(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (lambda, arrays) = args.split_last().ok_or_else(|| FormulaError::Argument("MAP".into()))?;
    let lambda = lambda_arg(lambda)?;
    let shape = &arrays[0];

    let pick = |array: &FormulaValue, r: usize, c: usize| -> FormulaValue {
        if array.is_array() {
            array.get(r, c).cloned().unwrap_or(FormulaValue::Error(ErrorKind::NA))
        } else {
            array.clone()
        }
    };

    let (rows, cols) = shape.dimensions();
    let mut result = Vec::with_capacity(rows);
    for r in 0..rows {
        let mut row = Vec::with_capacity(cols);
        for c in 0..cols {
            let values = arrays.iter().map(|a| pick(a, r, c)).collect();
            let value = ctx.call_lambda(lambda, values)?;
            if value.is_error() {
                return Ok(value);
            }
            row.push(element(value));
        }
        result.push(row);
    }

    Ok(reshape_like(shape, result))
}

/// Rebuild `rows` in the variant of `template`
fn reshape_like(template: &FormulaValue, mut rows: Vec<Vec<FormulaValue>>) -> FormulaValue {
    match template {
        FormulaValue::Array2D(_) => FormulaValue::Array2D(rows),
        FormulaValue::Array1D(_) => FormulaValue::Array1D(rows.pop().unwrap_or_default()),
        _ => rows
            .pop()
            .and_then(|mut row| row.pop())
            .unwrap_or_default(),
    }
}

/// REDUCE(initial, array, lambda(accumulator, value))
pub fn fn_reduce(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let lambda = lambda_arg(&args[2])?;
    let mut accumulator = args[0].clone();
    for value in args[1].values() {
        accumulator = ctx.call_lambda(lambda, vec![accumulator, value.clone()])?;
        if accumulator.is_error() {
            break;
        }
    }
    Ok(accumulator)
}

/// SCAN(initial, array, lambda(accumulator, value)); every intermediate
/// accumulator, in the array's shape
pub fn fn_scan(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let lambda = lambda_arg(&args[2])?;
    let array = &args[1];
    let (rows, cols) = array.dimensions();

    let mut accumulator = args[0].clone();
    let mut result = Vec::with_capacity(rows);
    for r in 0..rows {
        let mut row = Vec::with_capacity(cols);
        for c in 0..cols {
            let value = array.get(r, c).cloned().unwrap_or_default();
            accumulator = ctx.call_lambda(lambda, vec![accumulator, value])?;
            if accumulator.is_error() {
                return Ok(accumulator);
            }
            row.push(element(accumulator.clone()));
        }
        result.push(row);
    }
    Ok(reshape_like(array, result))
}

fn rows_of(value: &FormulaValue) -> Vec<Vec<FormulaValue>> {
    value.clone().into_rows()
}

/// BYROW(array, lambda(row)); each row is passed as a one-row array and the
/// result is a single column
pub fn fn_byrow(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let lambda = lambda_arg(&args[1])?;
    let mut result = Vec::new();
    for row in rows_of(&args[0]) {
        let value = ctx.call_lambda(lambda, vec![FormulaValue::Array1D(row)])?;
        if value.is_error() {
            return Ok(value);
        }
        result.push(vec![element(value)]);
    }
    Ok(FormulaValue::Array2D(result))
}

/// BYCOL(array, lambda(column)); each column is passed as a one-column array
/// and the result is a single row
pub fn fn_bycol(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let lambda = lambda_arg(&args[1])?;
    let rows = rows_of(&args[0]);
    let cols = rows.first().map_or(0, Vec::len);

    let mut result = Vec::with_capacity(cols);
    for c in 0..cols {
        let column = rows
            .iter()
            .map(|row| vec![row.get(c).cloned().unwrap_or_default()])
            .collect();
        let value = ctx.call_lambda(lambda, vec![FormulaValue::Array2D(column)])?;
        if value.is_error() {
            return Ok(value);
        }
        result.push(element(value));
    }
    Ok(FormulaValue::Array1D(result))
}

/// SEQUENCE(rows, [cols], [start], [step])
pub fn fn_sequence(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (rows, cols) = check_shape(args[0].to_number()?, number_arg(args, 1, 1.0)?, ctx)?;
    let start = number_arg(args, 2, 1.0)?;
    let step = number_arg(args, 3, 1.0)?;

    let result = (0..rows)
        .map(|r| {
            (0..cols)
                .map(|c| FormulaValue::Number(start + step * (r * cols + c) as f64))
                .collect()
        })
        .collect();
    Ok(FormulaValue::Array2D(result))
}

/// TRANSPOSE(array)
pub fn fn_transpose(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let array = &args[0];
    if !array.is_array() {
        return Ok(array.clone());
    }
    let (rows, cols) = array.dimensions();
    let result = (0..cols)
        .map(|c| {
            (0..rows)
                .map(|r| array.get(r, c).cloned().unwrap_or_default())
                .collect()
        })
        .collect();
    Ok(FormulaValue::Array2D(result))
}

/// ROWS(array)
pub fn fn_rows(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(args[0].dimensions().0 as f64))
}

/// COLUMNS(array)
pub fn fn_columns(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(args[0].dimensions().1 as f64))
}

/// INDEX(array, row, [col]), 1-based; 0 selects a whole row or column
pub fn fn_index(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let array = &args[0];
    let (rows, cols) = array.dimensions();

    let index = |value: f64| -> FormulaResult<usize> {
        if value < 0.0 {
            return Err(FormulaError::Argument("INDEX position must not be negative".into()));
        }
        Ok(value.trunc() as usize)
    };
    let mut row = index(args[1].to_number()?)?;
    let mut col = index(number_arg(args, 2, 0.0)?)?;

    // A single row is indexed by its only dimension
    if rows == 1 && args.len() < 3 {
        col = row;
        row = 1;
    } else if cols == 1 && args.len() < 3 {
        col = 1;
    }

    if row > rows || col > cols {
        return Ok(FormulaValue::Error(ErrorKind::Ref));
    }

    Ok(match (row, col) {
        (0, 0) => array.clone(),
        (0, c) => FormulaValue::Array2D(
            (0..rows)
                .map(|r| vec![array.get(r, c - 1).cloned().unwrap_or_default()])
                .collect(),
        ),
        (r, 0) => FormulaValue::Array1D(
            (0..cols)
                .map(|c| array.get(r - 1, c).cloned().unwrap_or_default())
                .collect(),
        ),
        (r, c) => array.get(r - 1, c - 1).cloned().unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use cellsmith_core::{CellAddress, ErrorKind};
    use pretty_assertions::assert_eq;

    use crate::context::{EngineOptions, EvaluationContext, FnSource};
    use crate::evaluator::evaluate_value;
    use crate::parser::parse_formula;
    use crate::value::FormulaValue;

    fn eval_with_options(formula: &str, options: EngineOptions) -> FormulaValue {
        // A1:B3 = 1..6 row by row
        let source = FnSource::new(|addr: CellAddress| {
            if addr.row < 3 && addr.col < 2 {
                FormulaValue::Number((addr.row * 2 + addr.col as u32 + 1) as f64)
            } else {
                FormulaValue::Empty
            }
        });
        let ast = parse_formula(formula).unwrap();
        let ctx = EvaluationContext::new(&source, CellAddress::new(0, 0)).with_options(options);
        evaluate_value(&ast, &ctx)
    }

    fn eval(formula: &str) -> FormulaValue {
        eval_with_options(formula, EngineOptions::default())
    }

    fn n(v: f64) -> FormulaValue {
        FormulaValue::Number(v)
    }

    fn grid(rows: &[&[f64]]) -> FormulaValue {
        FormulaValue::Array2D(rows.iter().map(|r| r.iter().map(|v| n(*v)).collect()).collect())
    }

    #[test]
    fn test_makearray_multiplication_table() {
        assert_eq!(
            eval("=MAKEARRAY(3, 3, LAMBDA(r, c, r*c))"),
            grid(&[&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0], &[3.0, 6.0, 9.0]])
        );
        assert_eq!(eval("=MAKEARRAY(2.9, 1, LAMBDA(r, c, r))"), grid(&[&[1.0], &[2.0]]));
    }

    #[test]
    fn test_makearray_validation() {
        assert_eq!(eval("=MAKEARRAY(0, 3, LAMBDA(r, c, 1))"), FormulaValue::Error(ErrorKind::Value));
        assert_eq!(eval("=MAKEARRAY(-1, 3, LAMBDA(r, c, 1))"), FormulaValue::Error(ErrorKind::Value));
        assert_eq!(
            eval("=MAKEARRAY(10001, 1, LAMBDA(r, c, 1))"),
            FormulaValue::Error(ErrorKind::Value)
        );
        assert_eq!(eval("=MAKEARRAY(2, 2, 5)"), FormulaValue::Error(ErrorKind::Value));
        assert_eq!(
            eval("=MAKEARRAY(2, 2, LAMBDA(r, r))"),
            FormulaValue::Error(ErrorKind::Value),
            "arity mismatch"
        );

        let options = EngineOptions {
            max_array_cells: 50,
            ..EngineOptions::default()
        };
        assert_eq!(
            eval_with_options("=MAKEARRAY(10, 10, LAMBDA(r, c, 1))", options),
            FormulaValue::Error(ErrorKind::Value)
        );
    }

    #[test]
    fn test_makearray_propagates_first_error() {
        assert_eq!(
            eval("=MAKEARRAY(3, 3, LAMBDA(r, c, IF(c=2, 1/0, IF(r=3, NA(), r))))"),
            FormulaValue::Error(ErrorKind::DivZero)
        );
        assert_eq!(
            eval("=MAKEARRAY(1, 2, LAMBDA(r, c, {1,2}))"),
            FormulaValue::Array2D(vec![vec![FormulaValue::Error(ErrorKind::Calc); 2]])
        );
    }

    #[test]
    fn test_map() {
        assert_eq!(
            eval("=MAP({1,2,3}, LAMBDA(x, x*10))"),
            FormulaValue::Array1D(vec![n(10.0), n(20.0), n(30.0)])
        );
        assert_eq!(eval("=MAP(A1:B2, {10,20;30,40}, LAMBDA(a, b, a+b))"), grid(&[&[11.0, 22.0], &[33.0, 44.0]]));
        assert_eq!(eval("=MAP(5, LAMBDA(x, x+1))"), n(6.0));
        assert_eq!(
            eval("=MAP({1,0}, LAMBDA(x, 1/x))"),
            FormulaValue::Error(ErrorKind::DivZero)
        );
        assert_eq!(
            eval("=MAP({1,#N/A}, LAMBDA(x, IFERROR(x, 0)))"),
            FormulaValue::Array1D(vec![n(1.0), n(0.0)])
        );
    }

    #[test]
    fn test_reduce_and_scan() {
        assert_eq!(eval("=REDUCE(0, A1:B3, LAMBDA(acc, v, acc+v))"), n(21.0));
        assert_eq!(eval("=REDUCE(1, {1,2,3,4}, LAMBDA(acc, v, acc*v))"), n(24.0));
        assert_eq!(eval("=REDUCE(\"\", {\"a\",\"b\"}, LAMBDA(acc, v, acc&v))"), FormulaValue::from("ab"));
        assert_eq!(
            eval("=SCAN(0, {1,2,3}, LAMBDA(acc, v, acc+v))"),
            FormulaValue::Array1D(vec![n(1.0), n(3.0), n(6.0)])
        );
        assert_eq!(eval("=SCAN(0, A1:B2, LAMBDA(acc, v, acc+v))"), grid(&[&[1.0, 3.0], &[6.0, 10.0]]));
    }

    #[test]
    fn test_byrow_and_bycol() {
        assert_eq!(eval("=BYROW(A1:B3, LAMBDA(row, SUM(row)))"), grid(&[&[3.0], &[7.0], &[11.0]]));
        assert_eq!(
            eval("=BYCOL(A1:B3, LAMBDA(col, MAX(col)))"),
            FormulaValue::Array1D(vec![n(5.0), n(6.0)])
        );
        assert_eq!(eval("=BYCOL(A1:B3, LAMBDA(col, ROWS(col)))"), FormulaValue::Array1D(vec![n(3.0), n(3.0)]));
        assert_eq!(eval("=BYROW(A1:B3, LAMBDA(row, COLUMNS(row)))"), grid(&[&[2.0], &[2.0], &[2.0]]));
    }

    #[test]
    fn test_sequence() {
        assert_eq!(eval("=SEQUENCE(3)"), grid(&[&[1.0], &[2.0], &[3.0]]));
        assert_eq!(eval("=SEQUENCE(2, 3, 0, 5)"), grid(&[&[0.0, 5.0, 10.0], &[15.0, 20.0, 25.0]]));
        assert_eq!(eval("=SEQUENCE(2, , 10)"), grid(&[&[10.0], &[11.0]]));
        assert_eq!(eval("=SEQUENCE(0)"), FormulaValue::Error(ErrorKind::Value));
    }

    #[test]
    fn test_shape_functions() {
        assert_eq!(eval("=TRANSPOSE({1,2,3})"), grid(&[&[1.0], &[2.0], &[3.0]]));
        assert_eq!(eval("=TRANSPOSE(A1:B2)"), grid(&[&[1.0, 3.0], &[2.0, 4.0]]));
        assert_eq!(eval("=ROWS(A1:B3)"), n(3.0));
        assert_eq!(eval("=COLUMNS(A1:B3)"), n(2.0));
        assert_eq!(eval("=COLUMNS({1,2,3})"), n(3.0));
        assert_eq!(eval("=ROWS(7)"), n(1.0));
    }

    #[test]
    fn test_index() {
        assert_eq!(eval("=INDEX(A1:B3, 3, 2)"), n(6.0));
        assert_eq!(eval("=INDEX({10,20,30}, 2)"), n(20.0));
        assert_eq!(eval("=INDEX(A1:A3, 2)"), n(3.0));
        assert_eq!(eval("=INDEX(A1:B3, 2, 0)"), FormulaValue::Array1D(vec![n(3.0), n(4.0)]));
        assert_eq!(eval("=INDEX(A1:B3, 0, 1)"), grid(&[&[1.0], &[3.0], &[5.0]]));
        assert_eq!(eval("=INDEX(A1:B3, 4, 1)"), FormulaValue::Error(ErrorKind::Ref));
        assert_eq!(eval("=INDEX(A1:B3, -1, 1)"), FormulaValue::Error(ErrorKind::Value));
    }
}
