//! Engineering functions: base conversion and bitwise operations
//!
//! Binary, octal and hexadecimal numerals are signed, fixed-width two's
//! complement values of at most ten digits:
//!
//! | base | width   | range                 |
//! |------|---------|-----------------------|
//! | 2    | 10 bits | -512 ..= 511          |
//! | 8    | 30 bits | -2^29 ..= 2^29 - 1    |
//! | 16   | 40 bits | -2^39 ..= 2^39 - 1    |

use cellsmith_core::ErrorKind;

use crate::context::EvaluationContext;
use crate::error::{FormulaError, FormulaResult};
use crate::value::FormulaValue;

/// Longest accepted numeral
const MAX_DIGITS: usize = 10;

/// Largest operand of the bitwise functions
const BIT_MAX: u64 = (1 << 48) - 1;

/// Largest shift magnitude for BITLSHIFT/BITRSHIFT
const MAX_SHIFT: f64 = 53.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Base {
    radix: u32,
    bits: u32,
}

const BIN: Base = Base { radix: 2, bits: 10 };
const OCT: Base = Base { radix: 8, bits: 30 };
const HEX: Base = Base { radix: 16, bits: 40 };

impl Base {
    fn min(self) -> i64 {
        -(1i64 << (self.bits - 1))
    }

    fn max(self) -> i64 {
        (1i64 << (self.bits - 1)) - 1
    }

    /// Decode a numeral, reading a set top bit as a negative value
    fn decode(self, digits: &str) -> FormulaResult<i64> {
        if digits.len() > MAX_DIGITS {
            return Err(num_error());
        }
        if digits.is_empty() {
            return Ok(0);
        }
        if !digits.chars().all(|c| c.is_digit(self.radix)) {
            return Err(num_error());
        }
        let raw = i64::from_str_radix(digits, self.radix).map_err(|_| num_error())?;
        if raw > self.max() {
            Ok(raw - (1i64 << self.bits))
        } else {
            Ok(raw)
        }
    }

    /// Encode a value, padding non-negative results to `places` digits
    fn encode(self, value: i64, places: Option<usize>) -> FormulaResult<String> {
        if value < self.min() || value > self.max() {
            return Err(num_error());
        }

        if value < 0 {
            // Negative results always use the full width
            return Ok(self.digits((1i64 << self.bits) + value));
        }

        let digits = self.digits(value);
        match places {
            Some(places) if digits.len() > places => Err(num_error()),
            Some(places) => Ok(format!("{:0>width$}", digits, width = places)),
            None => Ok(digits),
        }
    }

    fn digits(self, value: i64) -> String {
        match self.radix {
            2 => format!("{:b}", value),
            8 => format!("{:o}", value),
            _ => format!("{:X}", value),
        }
    }
}

fn num_error() -> FormulaError {
    FormulaError::Value(ErrorKind::Num)
}

fn value_error() -> FormulaError {
    FormulaError::Value(ErrorKind::Value)
}

/// Numeral text from a conversion argument
///
/// Numbers are read as their digit string, so `BIN2DEC(101)` works.
fn numeral(value: &FormulaValue) -> FormulaResult<String> {
    match value {
        FormulaValue::Text(s) => Ok(s.clone()),
        FormulaValue::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n < 1e10 => {
            Ok(format!("{}", *n as i64))
        }
        FormulaValue::Number(_) => Err(num_error()),
        FormulaValue::Empty => Ok(String::new()),
        FormulaValue::Error(e) => Err((*e).into()),
        _ => Err(value_error()),
    }
}

/// Optional `places` argument
fn places(args: &[FormulaValue]) -> FormulaResult<Option<usize>> {
    match args.get(1) {
        None | Some(FormulaValue::Empty) => Ok(None),
        Some(FormulaValue::Boolean(_)) => Err(value_error()),
        Some(value) => {
            let places = value.to_number()?.trunc();
            if (1.0..=MAX_DIGITS as f64).contains(&places) {
                Ok(Some(places as usize))
            } else {
                Err(num_error())
            }
        }
    }
}

fn decimal(value: &FormulaValue) -> FormulaResult<i64> {
    match value {
        FormulaValue::Boolean(_) => Err(value_error()),
        other => {
            let n = other.to_number()?.trunc();
            if n.abs() >= 1e15 {
                return Err(num_error());
            }
            Ok(n as i64)
        }
    }
}

fn to_decimal(args: &[FormulaValue], from: Base) -> FormulaResult<FormulaValue> {
    let value = from.decode(&numeral(&args[0])?)?;
    Ok(FormulaValue::Number(value as f64))
}

fn convert(args: &[FormulaValue], from: Base, to: Base) -> FormulaResult<FormulaValue> {
    let value = from.decode(&numeral(&args[0])?)?;
    Ok(FormulaValue::Text(to.encode(value, places(args)?)?))
}

fn from_decimal(args: &[FormulaValue], to: Base) -> FormulaResult<FormulaValue> {
    let value = decimal(&args[0])?;
    Ok(FormulaValue::Text(to.encode(value, places(args)?)?))
}

/// BIN2DEC(number)
pub fn fn_bin2dec(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    to_decimal(args, BIN)
}

/// BIN2OCT(number, [places])
pub fn fn_bin2oct(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    convert(args, BIN, OCT)
}

/// BIN2HEX(number, [places])
pub fn fn_bin2hex(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    convert(args, BIN, HEX)
}

/// OCT2BIN(number, [places])
pub fn fn_oct2bin(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    convert(args, OCT, BIN)
}

/// OCT2DEC(number)
pub fn fn_oct2dec(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    to_decimal(args, OCT)
}

/// OCT2HEX(number, [places])
pub fn fn_oct2hex(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    convert(args, OCT, HEX)
}

/// HEX2BIN(number, [places])
pub fn fn_hex2bin(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    convert(args, HEX, BIN)
}

/// HEX2OCT(number, [places])
pub fn fn_hex2oct(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    convert(args, HEX, OCT)
}

/// HEX2DEC(number)
pub fn fn_hex2dec(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    to_decimal(args, HEX)
}

/// DEC2BIN(number, [places])
pub fn fn_dec2bin(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    from_decimal(args, BIN)
}

/// DEC2OCT(number, [places])
pub fn fn_dec2oct(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    from_decimal(args, OCT)
}

/// DEC2HEX(number, [places])
pub fn fn_dec2hex(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    from_decimal(args, HEX)
}

// === Bitwise ===

fn bit_operand(value: &FormulaValue) -> FormulaResult<u64> {
    if matches!(value, FormulaValue::Boolean(_)) {
        return Err(value_error());
    }
    let n = value.to_number()?;
    if n < 0.0 || n.fract() != 0.0 || n > BIT_MAX as f64 {
        return Err(num_error());
    }
    Ok(n as u64)
}

fn bitwise(args: &[FormulaValue], op: fn(u64, u64) -> u64) -> FormulaResult<FormulaValue> {
    let a = bit_operand(&args[0])?;
    let b = bit_operand(&args[1])?;
    Ok(FormulaValue::Number(op(a, b) as f64))
}

/// Shift left by `amount`; negative amounts shift right
fn shift(args: &[FormulaValue], direction: f64) -> FormulaResult<FormulaValue> {
    let n = bit_operand(&args[0])?;
    if matches!(args[1], FormulaValue::Boolean(_)) {
        return Err(value_error());
    }
    let amount = args[1].to_number()?.trunc() * direction;
    if amount.abs() > MAX_SHIFT {
        return Err(num_error());
    }

    let result = if amount >= 0.0 {
        u128::from(n) << (amount as u32)
    } else {
        u128::from(n) >> (-amount as u32)
    };
    if result > u128::from(BIT_MAX) {
        return Err(num_error());
    }
    Ok(FormulaValue::Number(result as f64))
}

/// BITAND(number1, number2)
pub fn fn_bitand(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    bitwise(args, |a, b| a & b)
}

/// BITOR(number1, number2)
pub fn fn_bitor(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    bitwise(args, |a, b| a | b)
}

/// BITXOR(number1, number2)
pub fn fn_bitxor(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    bitwise(args, |a, b| a ^ b)
}

/// BITLSHIFT(number, shift_amount)
pub fn fn_bitlshift(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    shift(args, 1.0)
}

/// BITRSHIFT(number, shift_amount)
pub fn fn_bitrshift(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    shift(args, -1.0)
}
