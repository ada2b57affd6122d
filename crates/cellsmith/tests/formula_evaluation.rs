//! Tests for formula evaluation against workbook data

use cellsmith::prelude::*;
use cellsmith::{EmptySource, FunctionDef, FormulaResult, EvaluationContext};
use pretty_assertions::assert_eq;

fn n(v: f64) -> FormulaValue {
    FormulaValue::Number(v)
}

fn t(s: &str) -> FormulaValue {
    FormulaValue::from(s)
}

fn err(kind: ErrorKind) -> FormulaValue {
    FormulaValue::Error(kind)
}

/// Sheet1 holds numbers in A1:A5, names in B1:B5; "Data" holds a second block
fn document() -> Document {
    let mut doc = Document::new();
    let sheet = doc.workbook_mut().worksheet_mut(0).unwrap();
    sheet.set_range_values("A1", [[10.0], [20.0], [30.0], [40.0], [50.0]]).unwrap();
    sheet
        .set_range_values("B1", [["apple"], ["banana"], ["Apple"], ["cherry"], ["date"]])
        .unwrap();
    sheet.set_cell_value("C1", true).unwrap();
    sheet.set_cell_value("C2", "12").unwrap();
    sheet.set_cell_value("C3", ErrorKind::NA).unwrap();

    let data = doc.workbook_mut().add_worksheet_with_name("Data").unwrap();
    let data = doc.workbook_mut().worksheet_mut(data).unwrap();
    data.set_range_values("A1", [[1.0, 2.0], [3.0, 4.0]]).unwrap();
    doc
}

fn eval(doc: &Document, formula: &str) -> FormulaValue {
    doc.evaluate(0, "F1", formula).unwrap()
}

#[test]
fn test_arithmetic_and_precedence() {
    let doc = document();
    assert_eq!(eval(&doc, "=1+2*3"), n(7.0));
    assert_eq!(eval(&doc, "=(1+2)*3"), n(9.0));
    assert_eq!(eval(&doc, "=2^3^2"), n(512.0));
    assert_eq!(eval(&doc, "=-2^2"), n(-4.0));
    assert_eq!(eval(&doc, "=50%"), n(0.5));
    assert_eq!(eval(&doc, "=\"Hello \"&\"World\""), t("Hello World"));
    assert_eq!(eval(&doc, "1+1"), n(2.0));
}

#[test]
fn test_cell_and_range_references() {
    let doc = document();
    assert_eq!(eval(&doc, "=A1+A2"), n(30.0));
    assert_eq!(eval(&doc, "=SUM(A1:A5)"), n(150.0));
    assert_eq!(eval(&doc, "=AVERAGE(A1:A5)"), n(30.0));
    assert_eq!(eval(&doc, "=MAX(A1:A5)-MIN(A1:A5)"), n(40.0));
    assert_eq!(eval(&doc, "=COUNT(A1:C5)"), n(5.0));
    assert_eq!(eval(&doc, "=COUNTA(A1:C5)"), n(13.0));
    assert_eq!(eval(&doc, "=$A$1*2"), n(20.0));
}

#[test]
fn test_sheet_qualified_references() {
    let doc = document();
    assert_eq!(eval(&doc, "=Data!A1+Data!B2"), n(5.0));
    assert_eq!(eval(&doc, "=SUM(Data!A1:B2)"), n(10.0));
    assert_eq!(eval(&doc, "=SUM('Data'!A1:A2)"), n(4.0));
    assert_eq!(doc.evaluate(1, "C1", "=A1+B1").unwrap(), n(3.0));
    assert_eq!(eval(&doc, "=Missing!A1"), err(ErrorKind::Ref));
}

#[test]
fn test_coercion() {
    let doc = document();
    assert_eq!(eval(&doc, "=C1+1"), n(2.0));
    assert_eq!(eval(&doc, "=C2*2"), n(24.0));
    assert_eq!(eval(&doc, "=Z99+1"), n(1.0));
    assert_eq!(eval(&doc, "=B1+1"), err(ErrorKind::Value));
    assert_eq!(eval(&doc, "=\"3\"&4"), t("34"));
}

#[test]
fn test_error_values() {
    let doc = document();
    assert_eq!(eval(&doc, "=1/0"), err(ErrorKind::DivZero));
    assert_eq!(eval(&doc, "=C3+1"), err(ErrorKind::NA));
    assert_eq!(eval(&doc, "=NOSUCHFUNCTION(1)"), err(ErrorKind::Name));
    assert_eq!(eval(&doc, "=unknown_name"), err(ErrorKind::Name));
    assert_eq!(eval(&doc, "=SQRT(-1)"), err(ErrorKind::Num));
    assert_eq!(eval(&doc, "=(1"), err(ErrorKind::Value));
    assert_eq!(eval(&doc, "=#REF!"), err(ErrorKind::Ref));
    // The left operand's error wins
    assert_eq!(eval(&doc, "=(1/0)+C3"), err(ErrorKind::DivZero));
    assert_eq!(eval(&doc, "=IFERROR(1/0, \"fallback\")"), t("fallback"));
    assert_eq!(eval(&doc, "=IFNA(C3, 0)"), n(0.0));
    assert_eq!(eval(&doc, "=IFNA(1/0, 0)"), err(ErrorKind::DivZero));
    assert_eq!(eval(&doc, "=ISERROR(C3)"), FormulaValue::Boolean(true));
}

#[test]
fn test_comparisons() {
    let doc = document();
    assert_eq!(eval(&doc, "=A1>A2"), FormulaValue::Boolean(false));
    assert_eq!(eval(&doc, "=B1=B3"), FormulaValue::Boolean(true));
    assert_eq!(eval(&doc, "=\"b\">\"A\""), FormulaValue::Boolean(true));
    assert_eq!(eval(&doc, "=1<\"a\""), FormulaValue::Boolean(true));
    assert_eq!(eval(&doc, "=\"z\"<TRUE"), FormulaValue::Boolean(true));
    assert_eq!(eval(&doc, "=Z99=0"), FormulaValue::Boolean(true));
    assert_eq!(eval(&doc, "=Z99=\"\""), FormulaValue::Boolean(true));
}

#[test]
fn test_conditional_logic() {
    let doc = document();
    assert_eq!(eval(&doc, "=IF(A1>5, \"big\", \"small\")"), t("big"));
    assert_eq!(eval(&doc, "=IF(A1>500, \"big\")"), FormulaValue::Boolean(false));
    // The branch not taken is never evaluated
    assert_eq!(eval(&doc, "=IF(TRUE, 1, 1/0)"), n(1.0));
    assert_eq!(eval(&doc, "=AND(A1>5, A2>5)"), FormulaValue::Boolean(true));
    assert_eq!(eval(&doc, "=OR(A1>50, NOT(TRUE))"), FormulaValue::Boolean(false));
}

#[test]
fn test_criteria_aggregates() {
    let doc = document();
    assert_eq!(eval(&doc, "=COUNTIF(B1:B5, \"apple\")"), n(2.0));
    assert_eq!(eval(&doc, "=COUNTIF(A1:A5, \">=30\")"), n(3.0));
    assert_eq!(eval(&doc, "=SUMIF(B1:B5, \"a*\", A1:A5)"), n(40.0));
    assert_eq!(eval(&doc, "=AVERAGEIF(A1:A5, \"<>30\")"), n(30.0));
}

#[test]
fn test_dynamic_arrays() {
    let doc = document();
    assert_eq!(
        eval(&doc, "=A1:A2*2"),
        FormulaValue::Array2D(vec![vec![n(20.0)], vec![n(40.0)]])
    );
    assert_eq!(
        eval(&doc, "={1,2,3}+{10,20,30}"),
        FormulaValue::Array1D(vec![n(11.0), n(22.0), n(33.0)])
    );
    assert_eq!(
        eval(&doc, "={1,2,3}+{10,20}"),
        FormulaValue::Array1D(vec![n(11.0), n(22.0), err(ErrorKind::NA)])
    );
    assert_eq!(eval(&doc, "=SUM({1,2;3,4})"), n(10.0));
    assert_eq!(eval(&doc, "=ROWS(SEQUENCE(4, 2))"), n(4.0));
    assert_eq!(eval(&doc, "=INDEX(A1:B5, 3, 2)"), t("Apple"));
    assert_eq!(eval(&doc, "=SUM(TRANSPOSE(A1:A5))"), n(150.0));
}

#[test]
fn test_position_functions() {
    let doc = document();
    assert_eq!(doc.evaluate(0, "D7", "=ROW()").unwrap(), n(7.0));
    assert_eq!(doc.evaluate(0, "D7", "=COLUMN()").unwrap(), n(4.0));
    assert_eq!(eval(&doc, "=ROW(B3)"), n(3.0));
}

#[test]
fn test_custom_function() {
    fn cube(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
        Ok(FormulaValue::Number(args[0].to_number()?.powi(3)))
    }

    let mut doc = document();
    doc.engine_mut()
        .register_function(FunctionDef::new("CUBE", 1, Some(1), cube).elementwise());
    assert_eq!(eval(&doc, "=CUBE(3)"), n(27.0));
    assert_eq!(
        eval(&doc, "=CUBE({1,2})"),
        FormulaValue::Array1D(vec![n(1.0), n(8.0)])
    );
    assert_eq!(eval(&doc, "=CUBE(1, 2)"), err(ErrorKind::Value));
}

#[test]
fn test_engine_caches_compiled_formulas() {
    let engine = FormulaEngine::new();
    let at = CellAddress::new(0, 0);
    for _ in 0..3 {
        assert_eq!(engine.evaluate("=SUM(1,2)", &EmptySource, at), n(3.0));
    }
    assert_eq!(engine.cache_len(), 1);
}

#[test]
fn test_range_operator_binds_before_arithmetic() {
    let doc = document();
    assert_eq!(eval(&doc, "=SUM(1+A1:A3)"), n(63.0));
    assert_eq!(eval(&doc, "=SUM(-A1:A2^2)"), n(-500.0));
    assert_eq!(eval(&doc, "=COUNTIF(A1:A5, \">\"&A2)"), n(3.0));
}

#[test]
fn test_pathological_formulas_are_errors() {
    let doc = document();
    let nested = format!("={}1{}", "(".repeat(5_000), ")".repeat(5_000));
    assert_eq!(eval(&doc, &nested), err(ErrorKind::Value));
    let negations = format!("={}A1", "-".repeat(200_000));
    assert_eq!(eval(&doc, &negations), err(ErrorKind::Value));
    let shallow = format!("={}A1{}", "(".repeat(100), ")".repeat(100));
    assert_eq!(eval(&doc, &shallow), n(10.0));
}
