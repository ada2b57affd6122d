//! Text functions

use crate::context::EvaluationContext;
use crate::error::{FormulaError, FormulaResult};
use crate::value::FormulaValue;

use super::number_arg;

/// LEN(text)
pub fn fn_len(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let text = args[0].to_text()?;
    Ok(FormulaValue::Number(text.chars().count() as f64))
}

/// UPPER(text)
pub fn fn_upper(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Text(args[0].to_text()?.to_uppercase()))
}

/// LOWER(text)
pub fn fn_lower(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Text(args[0].to_text()?.to_lowercase()))
}

fn char_count(args: &[FormulaValue]) -> FormulaResult<usize> {
    let count = number_arg(args, 1, 1.0)?;
    if count < 0.0 {
        return Err(FormulaError::Argument("character count must not be negative".into()));
    }
    Ok(count as usize)
}

/// LEFT(text, [num_chars])
pub fn fn_left(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let text = args[0].to_text()?;
    let count = char_count(args)?;
    Ok(FormulaValue::Text(text.chars().take(count).collect()))
}

/// RIGHT(text, [num_chars])
pub fn fn_right(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let text = args[0].to_text()?;
    let count = char_count(args)?;
    let skip = text.chars().count().saturating_sub(count);
    Ok(FormulaValue::Text(text.chars().skip(skip).collect()))
}

/// CONCAT(text1, ...); arrays contribute every element in row-major order
pub fn fn_concat(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut result = String::new();
    for arg in args {
        for value in arg.values() {
            result.push_str(&value.to_text()?);
        }
    }
    Ok(FormulaValue::Text(result))
}

#[cfg(test)]
mod tests {
    use cellsmith_core::{CellAddress, ErrorKind};
    use pretty_assertions::assert_eq;

    use crate::context::{EmptySource, EvaluationContext};
    use crate::evaluator::evaluate_value;
    use crate::parser::parse_formula;
    use crate::value::FormulaValue;

    fn eval(formula: &str) -> FormulaValue {
        let ast = parse_formula(formula).unwrap();
        let ctx = EvaluationContext::new(&EmptySource, CellAddress::new(0, 0));
        evaluate_value(&ast, &ctx)
    }

    #[test]
    fn test_len_and_case() {
        assert_eq!(eval("=LEN(\"héllo\")"), FormulaValue::Number(5.0));
        assert_eq!(eval("=LEN(12.5)"), FormulaValue::Number(4.0));
        assert_eq!(eval("=UPPER(\"abc\")"), FormulaValue::from("ABC"));
        assert_eq!(eval("=LOWER(TRUE)"), FormulaValue::from("true"));
    }

    #[test]
    fn test_left_right() {
        assert_eq!(eval("=LEFT(\"Hello\", 2)"), FormulaValue::from("He"));
        assert_eq!(eval("=LEFT(\"Hello\")"), FormulaValue::from("H"));
        assert_eq!(eval("=RIGHT(\"Hello\", 3)"), FormulaValue::from("llo"));
        assert_eq!(eval("=RIGHT(\"Hi\", 10)"), FormulaValue::from("Hi"));
        assert_eq!(eval("=LEFT(\"Hi\", -1)"), FormulaValue::Error(ErrorKind::Value));
    }

    #[test]
    fn test_concat() {
        assert_eq!(eval("=CONCAT(\"a\", {1,2;3,4}, TRUE)"), FormulaValue::from("a1234TRUE"));
        assert_eq!(eval("=CONCAT(\"a\", {1,#N/A})"), FormulaValue::Error(ErrorKind::NA));
    }
}
