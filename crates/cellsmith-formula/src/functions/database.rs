//! Database functions (DSUM, DAVERAGE, DGET, ...)
//!
//! Every database function takes `(database, field, criteria)`:
//! - `database` is a 2-D array whose first row holds column headers
//! - `field` names a column by header (case-insensitive) or 1-based index
//! - `criteria` is a 2-D array whose first row holds database headers and
//!   whose remaining rows hold criteria cells
//!
//! Conditions in one criteria row must all hold (AND); a database row is
//! selected when any criteria row holds for it (OR). A blank criteria cell
//! places no condition, so a header-only criteria table selects every row.

use cellsmith_core::ErrorKind;

use super::criteria::CriteriaMatcher;
use crate::context::EvaluationContext;
use crate::error::{FormulaError, FormulaResult};
use crate::value::FormulaValue;

fn value_error() -> FormulaError {
    FormulaError::Value(ErrorKind::Value)
}

/// The rows of a 2-D array argument
fn table(value: &FormulaValue) -> Option<&[Vec<FormulaValue>]> {
    match value {
        FormulaValue::Array2D(rows) => Some(rows),
        _ => None,
    }
}

fn header_text(header: &FormulaValue) -> String {
    header.as_text().trim().to_lowercase()
}

fn find_column(headers: &[FormulaValue], name: &str) -> Option<usize> {
    let name = name.trim().to_lowercase();
    headers.iter().position(|h| header_text(h) == name)
}

/// Resolve `field` to a column index
fn resolve_field(headers: &[FormulaValue], field: &FormulaValue) -> Option<usize> {
    match field {
        FormulaValue::Text(name) => find_column(headers, name),
        FormulaValue::Number(n) => {
            let index = n.trunc();
            if index >= 1.0 && index <= headers.len() as f64 {
                Some(index as usize - 1)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// One criteria row: conditions that must all hold
///
/// `None` as the column marks a criteria header absent from the database,
/// which no row can satisfy.
type CriteriaRow = Vec<(Option<usize>, CriteriaMatcher)>;

fn compile_criteria(headers: &[FormulaValue], criteria: &[Vec<FormulaValue>]) -> Vec<CriteriaRow> {
    let Some((criteria_headers, rows)) = criteria.split_first() else {
        return Vec::new();
    };

    let columns: Vec<Option<Option<usize>>> = criteria_headers
        .iter()
        .map(|h| {
            if h.is_blank() {
                None
            } else {
                Some(find_column(headers, &h.as_text()))
            }
        })
        .collect();

    rows.iter()
        .map(|row| {
            columns
                .iter()
                .zip(row)
                .filter_map(|(column, cell)| {
                    let column = (*column)?;
                    CriteriaMatcher::for_database(cell).map(|matcher| (column, matcher))
                })
                .collect()
        })
        .collect()
}

fn row_matches(row: &[FormulaValue], criteria: &[CriteriaRow]) -> bool {
    if criteria.is_empty() {
        return true;
    }
    criteria.iter().any(|conditions| {
        conditions.iter().all(|(column, matcher)| match column {
            Some(col) => matcher.matches(row.get(*col).unwrap_or(&FormulaValue::Empty)),
            None => false,
        })
    })
}

/// Field values of the rows selected by the criteria
fn select(args: &[FormulaValue]) -> FormulaResult<Vec<FormulaValue>> {
    let database = table(&args[0]).filter(|rows| rows.len() >= 2).ok_or_else(value_error)?;
    let criteria = table(&args[2]).ok_or_else(value_error)?;

    let (headers, records) = database.split_first().ok_or_else(value_error)?;
    let column = resolve_field(headers, &args[1]).ok_or_else(value_error)?;
    let criteria = compile_criteria(headers, criteria);

    Ok(records
        .iter()
        .filter(|row| row_matches(row, &criteria))
        .map(|row| row.get(column).cloned().unwrap_or_default())
        .collect())
}

fn select_numbers(args: &[FormulaValue]) -> FormulaResult<Vec<f64>> {
    Ok(select(args)?
        .into_iter()
        .filter_map(|v| match v {
            FormulaValue::Number(n) => Some(n),
            _ => None,
        })
        .collect())
}

/// DSUM
pub fn fn_dsum(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(select_numbers(args)?.iter().sum()))
}

/// DAVERAGE
pub fn fn_daverage(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = select_numbers(args)?;
    if numbers.is_empty() {
        return Ok(FormulaValue::Error(ErrorKind::DivZero));
    }
    Ok(FormulaValue::Number(mean(&numbers)))
}

/// DCOUNT: numeric cells only
pub fn fn_dcount(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(select_numbers(args)?.len() as f64))
}

/// DCOUNTA: any non-blank cell
pub fn fn_dcounta(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let count = select(args)?.iter().filter(|v| !v.is_blank()).count();
    Ok(FormulaValue::Number(count as f64))
}

/// DMAX; 0 when nothing matches
pub fn fn_dmax(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let max = select_numbers(args)?.into_iter().reduce(f64::max);
    Ok(FormulaValue::Number(max.unwrap_or(0.0)))
}

/// DMIN; 0 when nothing matches
pub fn fn_dmin(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let min = select_numbers(args)?.into_iter().reduce(f64::min);
    Ok(FormulaValue::Number(min.unwrap_or(0.0)))
}

/// DGET: the field of the single matching row
pub fn fn_dget(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut selected = select(args)?;
    match selected.len() {
        0 => Ok(FormulaValue::Error(ErrorKind::Value)),
        1 => Ok(selected.remove(0)),
        _ => Ok(FormulaValue::Error(ErrorKind::Num)),
    }
}

/// DPRODUCT; 0 when nothing matches
pub fn fn_dproduct(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = select_numbers(args)?;
    if numbers.is_empty() {
        return Ok(FormulaValue::Number(0.0));
    }
    Ok(FormulaValue::Number(numbers.iter().product()))
}

/// DSTDEV: sample standard deviation
pub fn fn_dstdev(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(variance(&select_numbers(args)?, true).map_or(
        FormulaValue::Error(ErrorKind::DivZero),
        |v| FormulaValue::Number(v.sqrt()),
    ))
}

/// DSTDEVP: population standard deviation
pub fn fn_dstdevp(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(variance(&select_numbers(args)?, false).map_or(
        FormulaValue::Error(ErrorKind::DivZero),
        |v| FormulaValue::Number(v.sqrt()),
    ))
}

/// DVAR: sample variance
pub fn fn_dvar(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(variance(&select_numbers(args)?, true)
        .map_or(FormulaValue::Error(ErrorKind::DivZero), FormulaValue::Number))
}

/// DVARP: population variance
pub fn fn_dvarp(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(variance(&select_numbers(args)?, false)
        .map_or(FormulaValue::Error(ErrorKind::DivZero), FormulaValue::Number))
}

fn mean(numbers: &[f64]) -> f64 {
    numbers.iter().sum::<f64>() / numbers.len() as f64
}

/// Variance; a sample needs two values, a population one
fn variance(numbers: &[f64], sample: bool) -> Option<f64> {
    let needed = if sample { 2 } else { 1 };
    if numbers.len() < needed {
        return None;
    }
    let m = mean(numbers);
    let squares: f64 = numbers.iter().map(|x| (x - m) * (x - m)).sum();
    let divisor = if sample { numbers.len() - 1 } else { numbers.len() };
    Some(squares / divisor as f64)
}
