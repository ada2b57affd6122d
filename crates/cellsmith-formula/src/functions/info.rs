//! Information functions
//!
//! The `IS*` predicates receive error arguments and are applied per element
//! to arrays.

use cellsmith_core::ErrorKind;

use crate::context::EvaluationContext;
use crate::error::FormulaResult;
use crate::value::FormulaValue;

/// ISERROR(value)
pub fn fn_iserror(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(args[0].is_error()))
}

/// ISNA(value)
pub fn fn_isna(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(args[0].error() == Some(ErrorKind::NA)))
}

/// ISNUMBER(value)
pub fn fn_isnumber(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(matches!(args[0], FormulaValue::Number(_))))
}

/// ISTEXT(value)
pub fn fn_istext(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(matches!(args[0], FormulaValue::Text(_))))
}

/// ISBLANK(value); only a truly empty value counts, not `""`
pub fn fn_isblank(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(args[0].is_empty()))
}

/// ISLOGICAL(value)
pub fn fn_islogical(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(matches!(args[0], FormulaValue::Boolean(_))))
}

/// NA()
pub fn fn_na(_args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Error(ErrorKind::NA))
}
