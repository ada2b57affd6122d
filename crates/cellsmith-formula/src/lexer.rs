//! Formula lexer
//!
//! Turns formula text into a flat token stream. Lexing never fails: anything
//! that cannot be a token becomes [`Token::Invalid`] and is rejected by the
//! parser with a typed error.

use cellsmith_core::ErrorKind;

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(f64),
    String(String),
    Boolean(bool),
    Error(ErrorKind),

    // Identifiers and references
    /// Function name, lambda parameter or defined name
    Identifier(String),
    /// Cell reference like `A1`, `$A$1`
    CellRef(String),
    /// Sheet prefix like `Sheet1!` or `'My Sheet'!`
    SheetPrefix(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Ampersand,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Colon,
    Comma,
    Semicolon,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,

    /// Text that is not a valid token
    Invalid(String),

    Eof,
}

/// Tokenize formula text; the result always ends with [`Token::Eof`]
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut lexer = Lexer { input, pos: 0 };
    let mut tokens = Vec::new();
    loop {
        let token = lexer.scan_token();
        let done = token == Token::Eof;
        tokens.push(token);
        if done {
            return tokens;
        }
    }
}

/// Check for A1-style text: optional `$`, column letters, optional `$`, row digits
pub fn is_cell_reference(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;

    if bytes.get(i) == Some(&b'$') {
        i += 1;
    }
    let letter_start = i;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    let letters = i - letter_start;
    if letters == 0 || letters > 3 {
        return false;
    }

    if bytes.get(i) == Some(&b'$') {
        i += 1;
    }
    let digit_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == digit_start || bytes[digit_start] == b'0' {
        return false;
    }

    i == bytes.len()
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn scan_token(&mut self) -> Token {
        self.skip_whitespace();

        let c = match self.peek_char() {
            Some(c) => c,
            None => return Token::Eof,
        };

        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '^' => Some(Token::Caret),
            '%' => Some(Token::Percent),
            '&' => Some(Token::Ampersand),
            ':' => Some(Token::Colon),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            '{' => Some(Token::LeftBrace),
            '}' => Some(Token::RightBrace),
            '=' => Some(Token::Equal),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return token;
        }

        match c {
            '<' => {
                self.advance();
                match self.peek_char() {
                    Some('=') => {
                        self.advance();
                        Token::LessEqual
                    }
                    Some('>') => {
                        self.advance();
                        Token::NotEqual
                    }
                    _ => Token::LessThan,
                }
            }
            '>' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    Token::GreaterEqual
                } else {
                    Token::GreaterThan
                }
            }
            '"' => self.scan_string(),
            '\'' => self.scan_quoted_sheet(),
            '#' => self.scan_error(),
            c if c.is_ascii_digit()
                || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit())) =>
            {
                self.scan_number()
            }
            c if c.is_alphabetic() || c == '_' || c == '$' || c == '\\' => {
                self.scan_identifier_or_ref()
            }
            other => {
                self.advance();
                Token::Invalid(other.to_string())
            }
        }
    }

    fn scan_string(&mut self) -> Token {
        self.advance(); // opening quote

        let mut s = String::new();
        loop {
            match self.peek_char() {
                Some('"') if self.peek_char_at(1) == Some('"') => {
                    s.push('"');
                    self.advance();
                    self.advance();
                }
                Some('"') => {
                    self.advance();
                    return Token::String(s);
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
                None => return Token::Invalid(format!("\"{}", s)),
            }
        }
    }

    fn scan_quoted_sheet(&mut self) -> Token {
        self.advance(); // opening quote

        let mut name = String::new();
        loop {
            match self.peek_char() {
                Some('\'') if self.peek_char_at(1) == Some('\'') => {
                    name.push('\'');
                    self.advance();
                    self.advance();
                }
                Some('\'') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    name.push(c);
                    self.advance();
                }
                None => return Token::Invalid(format!("'{}", name)),
            }
        }

        if self.peek_char() == Some('!') && !name.is_empty() {
            self.advance();
            Token::SheetPrefix(name)
        } else {
            Token::Invalid(format!("'{}'", name))
        }
    }

    fn scan_error(&mut self) -> Token {
        let start = self.pos;
        self.advance(); // '#'
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '/' {
                self.advance();
            } else if c == '!' || c == '?' {
                self.advance();
                break;
            } else {
                break;
            }
        }

        let text = &self.input[start..self.pos];
        match ErrorKind::parse(text) {
            Some(kind) => Token::Error(kind),
            None => Token::Invalid(text.to_string()),
        }
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;

        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent only when digits follow, so `1E` stays a number then identifier
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let sign = matches!(self.peek_char_at(1), Some('+' | '-'));
            let digit_at = if sign { 2 } else { 1 };
            if self
                .peek_char_at(digit_at)
                .map_or(false, |c| c.is_ascii_digit())
            {
                for _ in 0..digit_at {
                    self.advance();
                }
                while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let text = &self.input[start..self.pos];
        match text.parse::<f64>() {
            Ok(n) if n.is_finite() => Token::Number(n),
            _ => Token::Invalid(text.to_string()),
        }
    }

    fn scan_identifier_or_ref(&mut self) -> Token {
        let start = self.pos;
        while self.peek_char().map_or(false, |c| {
            c.is_alphanumeric() || c == '_' || c == '$' || c == '.' || c == '\\'
        }) {
            self.advance();
        }
        let text = &self.input[start..self.pos];

        if self.peek_char() == Some('!') {
            self.advance();
            return Token::SheetPrefix(text.to_string());
        }

        // Followed by '(' it is always a call, so LOG10( is a function, not a cell
        let is_call = self.peek_char_after_whitespace() == Some('(');
        if !is_call {
            if text.eq_ignore_ascii_case("TRUE") {
                return Token::Boolean(true);
            }
            if text.eq_ignore_ascii_case("FALSE") {
                return Token::Boolean(false);
            }
            if is_cell_reference(text) {
                return Token::CellRef(text.to_string());
            }
        }

        if text.contains('$') {
            return Token::Invalid(text.to_string());
        }
        Token::Identifier(text.to_string())
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn peek_char_after_whitespace(&self) -> Option<char> {
        self.input[self.pos..].chars().find(|c| !c.is_whitespace())
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, char::is_whitespace) {
            self.advance();
        }
    }
}
