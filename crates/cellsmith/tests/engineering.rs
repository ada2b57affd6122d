//! Base conversion and bitwise functions

use cellsmith::prelude::*;
use cellsmith::EmptySource;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn eval(engine: &FormulaEngine, formula: &str) -> FormulaValue {
    engine.evaluate(formula, &EmptySource, CellAddress::new(0, 0))
}

fn t(s: &str) -> FormulaValue {
    FormulaValue::from(s)
}

fn n(v: f64) -> FormulaValue {
    FormulaValue::Number(v)
}

const NUM: FormulaValue = FormulaValue::Error(ErrorKind::Num);

#[test]
fn test_twos_complement() {
    let engine = FormulaEngine::new();
    assert_eq!(eval(&engine, "=BIN2DEC(\"1111111111\")"), n(-1.0));
    assert_eq!(eval(&engine, "=BIN2DEC(\"1000000000\")"), n(-512.0));
    assert_eq!(eval(&engine, "=DEC2BIN(-1)"), t("1111111111"));
    assert_eq!(eval(&engine, "=DEC2OCT(-1)"), t("7777777777"));
    assert_eq!(eval(&engine, "=DEC2HEX(-1)"), t("FFFFFFFFFF"));
    assert_eq!(eval(&engine, "=HEX2DEC(\"FFFFFFFFFF\")"), n(-1.0));
    assert_eq!(eval(&engine, "=HEX2BIN(\"FFFFFFFFFF\")"), t("1111111111"));
}

#[test]
fn test_places() {
    let engine = FormulaEngine::new();
    assert_eq!(eval(&engine, "=DEC2HEX(255, 4)"), t("00FF"));
    assert_eq!(eval(&engine, "=DEC2BIN(5, 8)"), t("00000101"));
    assert_eq!(eval(&engine, "=DEC2BIN(5, 2)"), NUM);
    assert_eq!(eval(&engine, "=DEC2BIN(-5, 2)"), t("1111111011"));
    assert_eq!(eval(&engine, "=DEC2OCT(8, 11)"), NUM);
}

#[test]
fn test_cross_conversions() {
    let engine = FormulaEngine::new();
    assert_eq!(eval(&engine, "=BIN2HEX(\"11111111\")"), t("FF"));
    assert_eq!(eval(&engine, "=BIN2OCT(101)"), t("5"));
    assert_eq!(eval(&engine, "=OCT2HEX(\"17\")"), t("F"));
    assert_eq!(eval(&engine, "=HEX2OCT(\"ff\")"), t("377"));
    assert_eq!(eval(&engine, "=OCT2BIN(\"17\", 6)"), t("001111"));
}

#[test]
fn test_invalid_input() {
    let engine = FormulaEngine::new();
    assert_eq!(eval(&engine, "=BIN2DEC(\"102\")"), NUM);
    assert_eq!(eval(&engine, "=BIN2DEC(\"11111111111\")"), NUM);
    assert_eq!(eval(&engine, "=DEC2BIN(512)"), NUM);
    assert_eq!(eval(&engine, "=DEC2BIN(-513)"), NUM);
    assert_eq!(eval(&engine, "=HEX2BIN(\"200\")"), NUM);
    assert_eq!(eval(&engine, "=OCT2DEC(\"8\")"), NUM);
    assert_eq!(eval(&engine, "=DEC2HEX(TRUE)"), FormulaValue::Error(ErrorKind::Value));
}

#[test]
fn test_bitwise() {
    let engine = FormulaEngine::new();
    assert_eq!(eval(&engine, "=BITAND(12, 10)"), n(8.0));
    assert_eq!(eval(&engine, "=BITOR(12, 10)"), n(14.0));
    assert_eq!(eval(&engine, "=BITXOR(12, 10)"), n(6.0));
    assert_eq!(eval(&engine, "=BITLSHIFT(1, 4)"), n(16.0));
    assert_eq!(eval(&engine, "=BITRSHIFT(16, 2)"), n(4.0));
    assert_eq!(eval(&engine, "=BITRSHIFT(16, -2)"), n(64.0));
    assert_eq!(eval(&engine, "=BITLSHIFT(16, -4)"), n(1.0));
    assert_eq!(eval(&engine, "=BITAND(-1, 1)"), NUM);
    assert_eq!(eval(&engine, "=BITAND(1.5, 1)"), NUM);
    assert_eq!(eval(&engine, "=BITLSHIFT(2^47, 1)"), NUM);
    assert_eq!(eval(&engine, "=BITLSHIFT(1, 54)"), NUM);
}

#[test]
fn test_elementwise_over_arrays() {
    let engine = FormulaEngine::new();
    assert_eq!(
        eval(&engine, "=DEC2BIN({1,2,3})"),
        FormulaValue::Array1D(vec![t("1"), t("10"), t("11")])
    );
}

proptest! {
    #[test]
    fn prop_binary_round_trip(value in -512i64..=511) {
        let engine = FormulaEngine::new();
        prop_assert_eq!(
            eval(&engine, &format!("=BIN2DEC(DEC2BIN({}))", value)),
            n(value as f64)
        );
    }

    #[test]
    fn prop_octal_round_trip(value in -(1i64 << 29)..(1i64 << 29)) {
        let engine = FormulaEngine::new();
        prop_assert_eq!(
            eval(&engine, &format!("=OCT2DEC(DEC2OCT({}))", value)),
            n(value as f64)
        );
    }

    #[test]
    fn prop_hex_round_trip(value in -(1i64 << 39)..(1i64 << 39)) {
        let engine = FormulaEngine::new();
        prop_assert_eq!(
            eval(&engine, &format!("=HEX2DEC(DEC2HEX({}))", value)),
            n(value as f64)
        );
    }
}
