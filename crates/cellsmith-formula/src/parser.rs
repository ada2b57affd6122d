//! Formula parser
//!
//! A recursive descent parser for Excel formulas with proper operator precedence.

use std::sync::Arc;

use cellsmith_core::{CellAddress, ErrorKind};

use crate::ast::{BinaryOperator, CellReference, FormulaExpr, RangeReference, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::lexer::{tokenize, Token};
use crate::reference::Reference;
use crate::stack::with_headroom;

static EOF: Token = Token::Eof;

/// Deepest nesting of parentheses, arguments and prefix operators accepted
pub const MAX_NESTING: usize = 256;

/// Longest formula text accepted, in characters (Excel's limit)
pub const MAX_FORMULA_LEN: usize = 8192;

/// Parse a formula string into an AST
///
/// The leading `=` is optional. Malformed input yields
/// [`FormulaError::Parse`] with `#NAME?` for bad names or references and
/// `#VALUE!` for structural problems; the parser never panics.
///
/// # Example
/// ```rust
/// use cellsmith_formula::parse_formula;
///
/// let ast = parse_formula("=1+2").unwrap();
/// let ast = parse_formula("=SUM(A1:A10)").unwrap();
/// let ast = parse_formula("=IF(A1>0,\"Yes\",\"No\")").unwrap();
/// let ast = parse_formula("=LAMBDA(x, x*2)(21)").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    let formula = formula.trim();
    let formula = formula.strip_prefix('=').unwrap_or(formula);
    if formula.trim().is_empty() {
        return Err(FormulaError::parse(ErrorKind::Value, "empty formula"));
    }
    if formula.chars().count() > MAX_FORMULA_LEN {
        return Err(FormulaError::parse(
            ErrorKind::Value,
            format!("formula longer than {} characters", MAX_FORMULA_LEN),
        ));
    }

    let mut parser = FormulaParser::new(tokenize(formula));
    let expr = parser.parse_expression()?;

    // Make sure we consumed all input
    if !matches!(parser.current_token(), Token::Eof) {
        return Err(parser.unexpected("after expression"));
    }

    Ok(expr)
}

/// Formula parser over a token stream
struct FormulaParser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl FormulaParser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    // === Helper methods ===

    fn current_token(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&EOF)
    }

    fn consume(&mut self) -> Token {
        let token = self.current_token().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        if self.current_token() == expected {
            self.consume();
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected {:?}", expected)))
        }
    }

    fn unexpected(&self, context: &str) -> FormulaError {
        match self.current_token() {
            Token::Eof => FormulaError::parse(
                ErrorKind::Value,
                format!("unexpected end of formula ({})", context),
            ),
            Token::Invalid(text) => invalid_token(text),
            token => FormulaError::parse(
                ErrorKind::Value,
                format!("unexpected token {:?} ({})", token, context),
            ),
        }
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest), Excel's order with the reference
    // operators binding tightest:
    // 1. Comparison: =, <>, <, <=, >, >=
    // 2. Concatenation: &
    // 3. Addition/Subtraction: +, -
    // 4. Multiplication/Division: *, /
    // 5. Unary: -, +
    // 6. Exponentiation: ^ (right associative)
    // 7. Postfix percent: %
    // 8. Range: :
    // 9. Primary: literals, references, calls, parentheses (where `,` is union)

    fn parse_expression(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_concatenation()?;

        loop {
            let op = match self.current_token() {
                Token::Equal => BinaryOperator::Equal,
                Token::NotEqual => BinaryOperator::NotEqual,
                Token::LessThan => BinaryOperator::LessThan,
                Token::LessEqual => BinaryOperator::LessEqual,
                Token::GreaterThan => BinaryOperator::GreaterThan,
                Token::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };

            self.consume();
            let right = self.parse_concatenation()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_concatenation(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_additive()?;

        while matches!(self.current_token(), Token::Ampersand) {
            self.consume();
            let right = self.parse_additive()?;
            left = binary(BinaryOperator::Concat, left, right);
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.consume();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => break,
            };

            self.consume();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    // Every nesting path (parentheses, arguments, array items, prefix
    // operators, `^` chains) passes through here once per level
    fn parse_unary(&mut self) -> FormulaResult<FormulaExpr> {
        if self.depth >= MAX_NESTING {
            return Err(FormulaError::parse(
                ErrorKind::Value,
                format!("formula nests deeper than {} levels", MAX_NESTING),
            ));
        }
        self.depth += 1;
        let result = with_headroom(|| self.parse_prefix());
        self.depth -= 1;
        result
    }

    fn parse_prefix(&mut self) -> FormulaResult<FormulaExpr> {
        match self.current_token() {
            Token::Minus => {
                self.consume();
                let operand = self.parse_unary()?;
                Ok(FormulaExpr::UnaryOp {
                    op: UnaryOperator::Negate,
                    operand: Box::new(operand),
                })
            }
            // Prefix plus is a no-op
            Token::Plus => {
                self.consume();
                self.parse_unary()
            }
            _ => self.parse_exponent(),
        }
    }

    fn parse_exponent(&mut self) -> FormulaResult<FormulaExpr> {
        let left = self.parse_percent()?;

        if matches!(self.current_token(), Token::Caret) {
            self.consume();
            // Right associative, and the exponent may carry its own sign
            let right = self.parse_unary()?;
            return Ok(binary(BinaryOperator::Power, left, right));
        }

        Ok(left)
    }

    fn parse_percent(&mut self) -> FormulaResult<FormulaExpr> {
        let mut expr = self.parse_range()?;

        while matches!(self.current_token(), Token::Percent) {
            self.consume();
            expr = FormulaExpr::UnaryOp {
                op: UnaryOperator::Percent,
                operand: Box::new(expr),
            };
        }

        Ok(expr)
    }

    fn parse_range(&mut self) -> FormulaResult<FormulaExpr> {
        let left = self.parse_primary()?;

        if !matches!(self.current_token(), Token::Colon) {
            return Ok(left);
        }
        self.consume();
        let right = self.parse_primary()?;

        match (left, right) {
            (FormulaExpr::CellRef(start), FormulaExpr::CellRef(end)) => {
                let same_sheet = match (&start.sheet, &end.sheet) {
                    (_, None) => true,
                    (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                    (None, Some(_)) => false,
                };
                if !same_sheet {
                    return Err(FormulaError::parse(
                        ErrorKind::Value,
                        "range references must be on the same sheet",
                    ));
                }
                Ok(FormulaExpr::RangeRef(RangeReference {
                    sheet: start.sheet,
                    from: start.reference,
                    to: end.reference,
                }))
            }
            _ => Err(FormulaError::parse(
                ErrorKind::Value,
                "range operator requires cell references on both sides",
            )),
        }
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.current_token().clone() {
            Token::Number(n) => {
                self.consume();
                Ok(FormulaExpr::Number(n))
            }

            Token::String(s) => {
                self.consume();
                Ok(FormulaExpr::String(s))
            }

            Token::Boolean(b) => {
                self.consume();
                Ok(FormulaExpr::Boolean(b))
            }

            Token::Error(e) => {
                self.consume();
                Ok(FormulaExpr::Error(e))
            }

            Token::LeftParen => {
                self.consume();
                let expr = self.parse_parenthesized()?;
                self.parse_postfix_calls(expr)
            }

            Token::LeftBrace => self.parse_array(),

            Token::SheetPrefix(sheet) => {
                self.consume();
                match self.consume() {
                    Token::CellRef(ref_str) => parse_cell_reference(Some(sheet), &ref_str),
                    _ => Err(FormulaError::parse(
                        ErrorKind::Name,
                        format!("expected cell reference after '{}!'", sheet),
                    )),
                }
            }

            Token::CellRef(ref_str) => {
                self.consume();
                parse_cell_reference(None, &ref_str)
            }

            Token::Identifier(name) => {
                self.consume();
                if matches!(self.current_token(), Token::LeftParen) {
                    let call = self.parse_function_call(name)?;
                    self.parse_postfix_calls(call)
                } else {
                    Ok(FormulaExpr::NameRef(name))
                }
            }

            _ => Err(self.unexpected("expected a value")),
        }
    }

    /// Contents of `( ... )`; commas here are the union operator
    fn parse_parenthesized(&mut self) -> FormulaResult<FormulaExpr> {
        let mut expr = self.parse_expression()?;
        while matches!(self.current_token(), Token::Comma) {
            self.consume();
            let right = self.parse_expression()?;
            expr = binary(BinaryOperator::Union, expr, right);
        }
        self.expect(&Token::RightParen)?;
        Ok(expr)
    }

    /// Trailing argument lists invoke the value just parsed
    fn parse_postfix_calls(&mut self, mut expr: FormulaExpr) -> FormulaResult<FormulaExpr> {
        while matches!(self.current_token(), Token::LeftParen) {
            let args = self.parse_arguments()?;
            expr = FormulaExpr::Call {
                callee: Box::new(expr),
                args,
            };
        }
        Ok(expr)
    }

    fn parse_array(&mut self) -> FormulaResult<FormulaExpr> {
        self.expect(&Token::LeftBrace)?;

        let mut rows = Vec::new();
        let mut current_row = vec![self.parse_expression()?];

        loop {
            match self.current_token() {
                Token::Comma => {
                    self.consume();
                    current_row.push(self.parse_expression()?);
                }
                Token::Semicolon => {
                    self.consume();
                    rows.push(std::mem::take(&mut current_row));
                    current_row.push(self.parse_expression()?);
                }
                Token::RightBrace => break,
                _ => return Err(self.unexpected("expected ',' ';' or '}' in array")),
            }
        }
        rows.push(current_row);

        let width = rows[0].len();
        if rows.iter().any(|row| row.len() != width) {
            return Err(FormulaError::parse(
                ErrorKind::Value,
                "array literal rows must have the same length",
            ));
        }

        self.expect(&Token::RightBrace)?;
        Ok(FormulaExpr::Array(rows))
    }

    fn parse_arguments(&mut self) -> FormulaResult<Vec<FormulaExpr>> {
        self.expect(&Token::LeftParen)?;

        let mut args = Vec::new();
        if matches!(self.current_token(), Token::RightParen) {
            self.consume();
            return Ok(args);
        }

        loop {
            if matches!(self.current_token(), Token::Comma | Token::RightParen) {
                args.push(FormulaExpr::Missing);
            } else {
                args.push(self.parse_expression()?);
            }

            match self.current_token() {
                Token::Comma => {
                    self.consume();
                }
                Token::RightParen => {
                    self.consume();
                    return Ok(args);
                }
                _ => return Err(self.unexpected("expected ',' or ')' in argument list")),
            }
        }
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<FormulaExpr> {
        let name = name.to_uppercase();
        let args = self.parse_arguments()?;

        if name == "LAMBDA" {
            return build_lambda(args);
        }

        Ok(FormulaExpr::Function { name, args })
    }
}

fn binary(op: BinaryOperator, left: FormulaExpr, right: FormulaExpr) -> FormulaExpr {
    FormulaExpr::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn invalid_token(text: &str) -> FormulaError {
    if text.starts_with('"') || text.starts_with('\'') {
        FormulaError::parse(ErrorKind::Value, format!("unterminated quote in {}", text))
    } else {
        FormulaError::parse(ErrorKind::Name, format!("invalid name '{}'", text))
    }
}

fn parse_cell_reference(sheet: Option<String>, ref_str: &str) -> FormulaResult<FormulaExpr> {
    let address = CellAddress::parse(ref_str).map_err(|e| {
        FormulaError::parse(
            ErrorKind::Name,
            format!("invalid cell reference '{}': {}", ref_str, e),
        )
    })?;

    Ok(FormulaExpr::CellRef(CellReference {
        sheet,
        reference: Reference::from_address(address),
    }))
}

/// `LAMBDA(p1, ..., body)`: every argument but the last must be a distinct name
fn build_lambda(mut args: Vec<FormulaExpr>) -> FormulaResult<FormulaExpr> {
    let body = match args.pop() {
        Some(FormulaExpr::Missing) | None => {
            return Err(FormulaError::parse(
                ErrorKind::Value,
                "LAMBDA requires a body",
            ))
        }
        Some(body) => body,
    };

    let mut params: Vec<String> = Vec::with_capacity(args.len());
    for arg in args {
        let name = match arg {
            FormulaExpr::NameRef(name) => name,
            other => {
                return Err(FormulaError::parse(
                    ErrorKind::Name,
                    format!("invalid LAMBDA parameter {:?}", other),
                ))
            }
        };
        if params.iter().any(|p| p.eq_ignore_ascii_case(&name)) {
            return Err(FormulaError::parse(
                ErrorKind::Value,
                format!("duplicate LAMBDA parameter '{}'", name),
            ));
        }
        params.push(name);
    }

    Ok(FormulaExpr::Lambda {
        params,
        body: Arc::new(body),
    })
}
