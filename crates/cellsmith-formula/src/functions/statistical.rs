//! Counting and conditional aggregation

use cellsmith_core::ErrorKind;

use super::criteria::CriteriaMatcher;
use crate::context::EvaluationContext;
use crate::error::FormulaResult;
use crate::value::FormulaValue;

/// COUNTA function: counts everything that is not empty, errors included
pub fn fn_counta(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let count = args
        .iter()
        .flat_map(|arg| arg.values())
        .filter(|v| !v.is_empty())
        .count();
    Ok(FormulaValue::Number(count as f64))
}

/// COUNTIF(range, criteria)
pub fn fn_countif(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let matcher = CriteriaMatcher::new(&args[1]);
    let count = args[0].values().filter(|v| matcher.matches(v)).count();
    Ok(FormulaValue::Number(count as f64))
}

/// Numbers from `sum_range` at the positions where `range` matches
fn matched_numbers(args: &[FormulaValue]) -> Vec<f64> {
    let range = &args[0];
    let matcher = CriteriaMatcher::new(&args[1]);
    let sum_range = args.get(2).unwrap_or(range);

    let (rows, cols) = range.dimensions();
    let mut numbers = Vec::new();
    for r in 0..rows {
        for c in 0..cols {
            let Some(value) = range.get(r, c) else {
                continue;
            };
            if !matcher.matches(value) {
                continue;
            }
            if let Some(FormulaValue::Number(n)) = sum_range.get(r, c) {
                numbers.push(*n);
            }
        }
    }
    numbers
}

/// SUMIF(range, criteria, [sum_range])
pub fn fn_sumif(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(matched_numbers(args).iter().sum()))
}

/// AVERAGEIF(range, criteria, [average_range])
pub fn fn_averageif(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let numbers = matched_numbers(args);
    if numbers.is_empty() {
        return Ok(FormulaValue::Error(ErrorKind::DivZero));
    }
    Ok(FormulaValue::Number(
        numbers.iter().sum::<f64>() / numbers.len() as f64,
    ))
}
