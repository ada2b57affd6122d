//! Database functions over a worksheet table and criteria range

use cellsmith::prelude::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn n(v: f64) -> FormulaValue {
    FormulaValue::Number(v)
}

fn err(kind: ErrorKind) -> FormulaValue {
    FormulaValue::Error(kind)
}

/// The orchard table lives in A1:E7; criteria blocks are written per test
/// starting at G1
fn orchard() -> Document {
    let mut doc = Document::new();
    let sheet = doc.workbook_mut().worksheet_mut(0).unwrap();
    let header = ["Tree", "Height", "Age", "Yield", "Profit"].map(CellValue::from);
    sheet.set_range_values("A1", [header]).unwrap();

    let rows = [
        ("Apple", 18.0, 20.0, 14.0, 105.0),
        ("Pear", 12.0, 12.0, 10.0, 96.0),
        ("Cherry", 13.0, 14.0, 9.0, 105.0),
        ("Apple", 14.0, 15.0, 10.0, 75.0),
        ("Pear", 9.0, 8.0, 8.0, 76.8),
        ("Apple", 8.0, 9.0, 6.0, 45.0),
    ];
    for (i, (tree, height, age, yield_, profit)) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        sheet.set_cell_value_at(r, 0, *tree).unwrap();
        sheet.set_cell_value_at(r, 1, *height).unwrap();
        sheet.set_cell_value_at(r, 2, *age).unwrap();
        sheet.set_cell_value_at(r, 3, *yield_).unwrap();
        sheet.set_cell_value_at(r, 4, *profit).unwrap();
    }
    doc
}

fn with_criteria(rows: &[&[&str]]) -> Document {
    let mut doc = orchard();
    let sheet = doc.workbook_mut().worksheet_mut(0).unwrap();
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            sheet.set_cell_value_at(r as u32, 6 + c as u16, *value).unwrap();
        }
    }
    doc
}

fn eval(doc: &Document, formula: &str) -> FormulaValue {
    doc.evaluate(0, "K1", formula).unwrap()
}

#[test]
fn test_dsum_with_inline_criteria() {
    let doc = orchard();
    assert_eq!(eval(&doc, "=DSUM(A1:E7, \"Yield\", {\"Tree\";\"Apple\"})"), n(30.0));
    assert_eq!(eval(&doc, "=DSUM(A1:E7, 4, {\"Tree\";\"Apple\"})"), n(30.0));
}

#[test]
fn test_criteria_range_on_sheet() {
    let doc = with_criteria(&[&["Tree", "Height"], &["Apple", ">10"], &["Pear", ""]]);
    // (Apple AND Height>10) OR Pear
    assert_eq!(eval(&doc, "=DCOUNT(A1:E7, \"Age\", G1:H3)"), n(4.0));
    assert_eq!(eval(&doc, "=DSUM(A1:E7, \"Height\", G1:H3)"), n(53.0));
    assert_eq!(eval(&doc, "=DMAX(A1:E7, \"Height\", G1:H3)"), n(18.0));
    assert_eq!(eval(&doc, "=DMIN(A1:E7, \"Height\", G1:H3)"), n(9.0));
}

#[test]
fn test_header_only_criteria_match_everything() {
    let doc = with_criteria(&[&["Tree"]]);
    assert_eq!(eval(&doc, "=DCOUNT(A1:E7, \"Yield\", G1:G1)"), n(6.0));
    assert_eq!(eval(&doc, "=DCOUNTA(A1:E7, \"Tree\", G1:G1)"), n(6.0));
}

#[test]
fn test_wildcard_and_comparator_criteria() {
    let doc = orchard();
    assert_eq!(eval(&doc, "=DCOUNT(A1:E7, \"Yield\", {\"Tree\";\"P*\"})"), n(2.0));
    assert_eq!(eval(&doc, "=DAVERAGE(A1:E7, \"Yield\", {\"Tree\";\"<>Apple\"})"), n(9.0));
    assert_eq!(eval(&doc, "=DSUM(A1:E7, \"Yield\", {\"Age\";\">=15\"})"), n(24.0));
}

#[test]
fn test_dget() {
    let doc = orchard();
    assert_eq!(eval(&doc, "=DGET(A1:E7, \"Yield\", {\"Tree\";\"Cherry\"})"), n(9.0));
    assert_eq!(
        eval(&doc, "=DGET(A1:E7, \"Yield\", {\"Tree\";\"Pear\"})"),
        err(ErrorKind::Num)
    );
    assert_eq!(
        eval(&doc, "=DGET(A1:E7, \"Yield\", {\"Tree\";\"Plum\"})"),
        err(ErrorKind::Value)
    );
}

#[test]
fn test_spread_functions() {
    let doc = orchard();
    // Apple yields 14, 10, 6: mean 10, squared deviations 16 + 0 + 16
    assert_eq!(eval(&doc, "=DVAR(A1:E7, \"Yield\", {\"Tree\";\"Apple\"})"), n(16.0));
    assert_eq!(eval(&doc, "=DSTDEV(A1:E7, \"Yield\", {\"Tree\";\"Apple\"})"), n(4.0));
    assert_eq!(
        eval(&doc, "=DVARP(A1:E7, \"Yield\", {\"Tree\";\"Apple\"})"),
        n(32.0 / 3.0)
    );
    assert_eq!(
        eval(&doc, "=DSTDEV(A1:E7, \"Yield\", {\"Tree\";\"Cherry\"})"),
        err(ErrorKind::DivZero)
    );
    assert_eq!(eval(&doc, "=DVARP(A1:E7, \"Yield\", {\"Tree\";\"Cherry\"})"), n(0.0));
    assert_eq!(eval(&doc, "=DPRODUCT(A1:E7, \"Age\", {\"Tree\";\"Pear\"})"), n(96.0));
}

#[test]
fn test_invalid_arguments() {
    let doc = orchard();
    assert_eq!(
        eval(&doc, "=DSUM(A1:E7, \"Colour\", {\"Tree\";\"Apple\"})"),
        err(ErrorKind::Value)
    );
    assert_eq!(
        eval(&doc, "=DSUM(A1:E7, 9, {\"Tree\";\"Apple\"})"),
        err(ErrorKind::Value)
    );
    assert_eq!(
        eval(&doc, "=DSUM(A1:E1, \"Yield\", {\"Tree\";\"Apple\"})"),
        err(ErrorKind::Value)
    );
    assert_eq!(
        eval(&doc, "=DAVERAGE(A1:E7, \"Yield\", {\"Tree\";\"Plum\"})"),
        err(ErrorKind::DivZero)
    );
    assert_eq!(eval(&doc, "=DMAX(A1:E7, \"Yield\", {\"Tree\";\"Plum\"})"), n(0.0));
}

proptest! {
    #[test]
    fn prop_dsum_over_dcount_is_daverage(threshold in 5.0f64..20.0) {
        let doc = orchard();
        let criteria = format!("{{\"Height\";\">{}\"}}", threshold);
        let sum = eval(&doc, &format!("=DSUM(A1:E7, \"Yield\", {})", criteria));
        let count = eval(&doc, &format!("=DCOUNT(A1:E7, \"Yield\", {})", criteria));
        let average = eval(&doc, &format!("=DAVERAGE(A1:E7, \"Yield\", {})", criteria));
        match count {
            FormulaValue::Number(c) if c == 0.0 => {
                prop_assert_eq!(average, FormulaValue::Error(ErrorKind::DivZero));
            }
            FormulaValue::Number(c) => match (sum, average) {
                (FormulaValue::Number(s), FormulaValue::Number(a)) => {
                    prop_assert!((s / c - a).abs() < 1e-9);
                }
                other => prop_assert!(false, "unexpected results {:?}", other),
            },
            other => prop_assert!(false, "unexpected count {:?}", other),
        }
    }
}
