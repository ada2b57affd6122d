//! Math functions

use cellsmith_core::ErrorKind;

use super::{collect_numbers, number_arg};
use crate::context::EvaluationContext;
use crate::error::FormulaResult;
use crate::value::FormulaValue;

/// SUM function
pub fn fn_sum(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = collect_numbers(args)?;
    Ok(FormulaValue::Number(numbers.iter().sum()))
}

/// AVERAGE function
pub fn fn_average(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = collect_numbers(args)?;
    if numbers.is_empty() {
        return Ok(FormulaValue::Error(ErrorKind::DivZero));
    }
    Ok(FormulaValue::Number(
        numbers.iter().sum::<f64>() / numbers.len() as f64,
    ))
}

/// MIN function; 0 when there is nothing to compare
pub fn fn_min(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = collect_numbers(args)?;
    let min = numbers.into_iter().reduce(f64::min).unwrap_or(0.0);
    Ok(FormulaValue::Number(min))
}

/// MAX function; 0 when there is nothing to compare
pub fn fn_max(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = collect_numbers(args)?;
    let max = numbers.into_iter().reduce(f64::max).unwrap_or(0.0);
    Ok(FormulaValue::Number(max))
}

/// COUNT function
///
/// Counts numbers; direct arguments that are not numbers are ignored rather
/// than rejected.
pub fn fn_count(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let count = args
        .iter()
        .map(|arg| match arg {
            FormulaValue::Array1D(_) | FormulaValue::Array2D(_) => arg
                .values()
                .filter(|v| matches!(v, FormulaValue::Number(_)))
                .count(),
            FormulaValue::Number(_) | FormulaValue::Boolean(_) => 1,
            FormulaValue::Text(s) => usize::from(crate::value::parse_number(s).is_some()),
            _ => 0,
        })
        .sum::<usize>();
    Ok(FormulaValue::Number(count as f64))
}

/// PRODUCT function; 0 when there is nothing to multiply
pub fn fn_product(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = collect_numbers(args)?;
    if numbers.is_empty() {
        return Ok(FormulaValue::Number(0.0));
    }
    finite(numbers.iter().product())
}

/// ABS function
pub fn fn_abs(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(args[0].to_number()?.abs()))
}

/// ROUND function, halves away from zero
pub fn fn_round(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = args[0].to_number()?;
    let digits = number_arg(args, 1, 0.0)?.trunc() as i32;
    Ok(FormulaValue::Number(round_to(n, digits)))
}

pub(crate) fn round_to(n: f64, digits: i32) -> f64 {
    let digits = digits.clamp(-15, 15);
    if digits < 0 {
        let factor = 10f64.powi(-digits);
        return (n / factor).round() * factor;
    }
    let factor = 10f64.powi(digits);
    let scaled = n * factor;
    // Nudge out representation error such as 2.675 * 100 = 267.49999...
    let nudged = scaled + scaled * f64::EPSILON * 4.0;
    nudged.round() / factor
}

/// INT function (rounds toward negative infinity)
pub fn fn_int(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(args[0].to_number()?.floor()))
}

/// MOD function; the result takes the divisor's sign
pub fn fn_mod(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = args[0].to_number()?;
    let d = args[1].to_number()?;
    if d == 0.0 {
        return Ok(FormulaValue::Error(ErrorKind::DivZero));
    }
    Ok(FormulaValue::Number(n - d * (n / d).floor()))
}

/// SQRT function
pub fn fn_sqrt(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = args[0].to_number()?;
    if n < 0.0 {
        return Ok(FormulaValue::Error(ErrorKind::Num));
    }
    Ok(FormulaValue::Number(n.sqrt()))
}

/// POWER function
pub fn fn_power(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let base = args[0].to_number()?;
    let exponent = args[1].to_number()?;
    if base == 0.0 && exponent == 0.0 {
        return Ok(FormulaValue::Error(ErrorKind::Num));
    }
    if base == 0.0 && exponent < 0.0 {
        return Ok(FormulaValue::Error(ErrorKind::DivZero));
    }
    finite(base.powf(exponent))
}

/// SIGN function
pub fn fn_sign(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = args[0].to_number()?;
    let sign = if n > 0.0 {
        1.0
    } else if n < 0.0 {
        -1.0
    } else {
        0.0
    };
    Ok(FormulaValue::Number(sign))
}

fn finite(n: f64) -> FormulaResult<FormulaValue> {
    if n.is_finite() {
        Ok(FormulaValue::Number(n))
    } else {
        Ok(FormulaValue::Error(ErrorKind::Num))
    }
}
