//! Logical functions

use cellsmith_core::ErrorKind;

use crate::context::EvaluationContext;
use crate::error::FormulaResult;
use crate::value::FormulaValue;

/// Truth values of the arguments
///
/// Inside arrays, text and blanks are skipped; a direct text argument that
/// is not TRUE/FALSE is `#VALUE!`.
fn collect_bools(args: &[FormulaValue]) -> FormulaResult<Vec<bool>> {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            FormulaValue::Array1D(_) | FormulaValue::Array2D(_) => {
                for v in arg.values() {
                    match v {
                        FormulaValue::Boolean(b) => out.push(*b),
                        FormulaValue::Number(n) => out.push(*n != 0.0),
                        FormulaValue::Error(e) => return Err((*e).into()),
                        _ => {}
                    }
                }
            }
            FormulaValue::Empty => {}
            other => out.push(other.to_bool()?),
        }
    }
    Ok(out)
}

fn reduce_bools(args: &[FormulaValue], f: fn(&[bool]) -> bool) -> FormulaResult<FormulaValue> {
    let values = collect_bools(args)?;
    if values.is_empty() {
        return Ok(FormulaValue::Error(ErrorKind::Value));
    }
    Ok(FormulaValue::Boolean(f(&values)))
}

/// AND function
pub fn fn_and(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    reduce_bools(args, |values| values.iter().all(|b| *b))
}

/// OR function
pub fn fn_or(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    reduce_bools(args, |values| values.iter().any(|b| *b))
}

/// XOR function: TRUE when an odd number of arguments are TRUE
pub fn fn_xor(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    reduce_bools(args, |values| values.iter().filter(|b| **b).count() % 2 == 1)
}

/// NOT function
pub fn fn_not(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(!args[0].to_bool()?))
}

/// TRUE function
pub fn fn_true(_args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(true))
}

/// FALSE function
pub fn fn_false(_args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(false))
}
