//! Criteria matching for COUNTIF, SUMIF, AVERAGEIF and the database functions
//!
//! A criterion is an optional comparator (`>=`, `<=`, `<>`, `>`, `<`, `=`;
//! `=` when absent) followed by an operand. The operand is tested, in order:
//! - as a wildcard pattern when it contains `*` or `?`
//! - numerically, when both the operand and the cell are numbers
//! - as case-insensitive text
//!
//! An empty operand after `=` matches blank cells; after `<>` it matches
//! non-blank cells.

use std::cmp::Ordering;

use regex::Regex;

use crate::evaluator::compare_text;
use crate::value::{format_number, parse_number, FormulaValue};

/// Criteria matcher
#[derive(Debug, Clone)]
pub struct CriteriaMatcher {
    op: ComparisonOp,
    criteria_type: CriteriaType,
}

#[derive(Debug, Clone)]
enum CriteriaType {
    /// Blank cells (`=` with nothing after it)
    Blank,
    /// Non-blank cells (`<>` with nothing after it)
    NonBlank,
    /// `*`/`?` pattern, kept with its source text for ordering comparators
    Wildcard(Regex, String),
    Number(f64),
    Text(String),
    /// Matches nothing (error criteria)
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl ComparisonOp {
    fn split(s: &str) -> (Self, &str) {
        // Longer operators first
        for (prefix, op) in [
            (">=", ComparisonOp::GreaterEqual),
            ("<=", ComparisonOp::LessEqual),
            ("<>", ComparisonOp::NotEqual),
            (">", ComparisonOp::GreaterThan),
            ("<", ComparisonOp::LessThan),
            ("=", ComparisonOp::Equal),
        ] {
            if let Some(rest) = s.strip_prefix(prefix) {
                return (op, rest);
            }
        }
        (ComparisonOp::Equal, s)
    }

    fn test(self, ordering: Ordering) -> bool {
        match self {
            ComparisonOp::Equal => ordering == Ordering::Equal,
            ComparisonOp::NotEqual => ordering != Ordering::Equal,
            ComparisonOp::LessThan => ordering == Ordering::Less,
            ComparisonOp::LessEqual => ordering != Ordering::Greater,
            ComparisonOp::GreaterThan => ordering == Ordering::Greater,
            ComparisonOp::GreaterEqual => ordering != Ordering::Less,
        }
    }
}

impl CriteriaMatcher {
    /// Create a matcher from a criteria argument (COUNTIF family)
    ///
    /// An empty criterion matches blank cells.
    pub fn new(criteria: &FormulaValue) -> Self {
        match criteria {
            FormulaValue::Number(n) => Self::equal(CriteriaType::Number(*n)),
            FormulaValue::Boolean(b) => {
                Self::equal(CriteriaType::Text(if *b { "true" } else { "false" }.into()))
            }
            FormulaValue::Text(s) => Self::parse(s),
            FormulaValue::Empty => Self::equal(CriteriaType::Blank),
            FormulaValue::Array1D(_) | FormulaValue::Array2D(_) => Self::new(criteria.first()),
            FormulaValue::Error(_) | FormulaValue::Lambda(_) => Self::equal(CriteriaType::Never),
        }
    }

    /// Create a matcher from a criteria-table cell, or `None` when the cell
    /// is blank and so places no condition on the row
    pub fn for_database(criteria: &FormulaValue) -> Option<Self> {
        if criteria.is_blank() {
            None
        } else {
            Some(Self::new(criteria))
        }
    }

    fn equal(criteria_type: CriteriaType) -> Self {
        Self {
            op: ComparisonOp::Equal,
            criteria_type,
        }
    }

    /// Parse criterion text such as `">=10"`, `"<>apple"` or `"a*"`
    pub fn parse(s: &str) -> Self {
        let (op, rest) = ComparisonOp::split(s);

        let criteria_type = if rest.is_empty() {
            match op {
                ComparisonOp::Equal => CriteriaType::Blank,
                ComparisonOp::NotEqual => CriteriaType::NonBlank,
                _ => CriteriaType::Text(String::new()),
            }
        } else if rest.contains(['*', '?']) {
            match wildcard_regex(rest) {
                Some(re) => CriteriaType::Wildcard(re, rest.to_lowercase()),
                None => CriteriaType::Text(rest.to_lowercase()),
            }
        } else if let Some(n) = parse_number(rest) {
            CriteriaType::Number(n)
        } else {
            CriteriaType::Text(rest.to_lowercase())
        };

        Self { op, criteria_type }
    }

    /// Check if a value matches the criteria
    pub fn matches(&self, value: &FormulaValue) -> bool {
        match &self.criteria_type {
            CriteriaType::Blank => value.is_blank(),
            CriteriaType::NonBlank => !value.is_blank(),
            CriteriaType::Never => false,

            CriteriaType::Wildcard(re, pattern) => {
                let text = value.as_text();
                match self.op {
                    ComparisonOp::Equal => re.is_match(&text),
                    ComparisonOp::NotEqual => !re.is_match(&text),
                    op => op.test(compare_text(&text, pattern)),
                }
            }

            CriteriaType::Number(criteria_num) => match cell_number(value) {
                Some(n) => self.op.test(compare_numbers(n, *criteria_num)),
                // Blank cells only satisfy "not equal"
                None if value.is_empty() => self.op == ComparisonOp::NotEqual,
                None => {
                    let text = format_number(*criteria_num);
                    self.op.test(compare_text(&value.as_text(), &text))
                }
            },

            CriteriaType::Text(text) => {
                if value.is_empty() && !text.is_empty() {
                    return self.op == ComparisonOp::NotEqual;
                }
                self.op.test(compare_text(&value.as_text(), text))
            }
        }
    }
}

/// A cell's value as a number for criteria purposes
fn cell_number(value: &FormulaValue) -> Option<f64> {
    match value {
        FormulaValue::Number(n) => Some(*n),
        FormulaValue::Text(s) => parse_number(s),
        _ => None,
    }
}

fn compare_numbers(a: f64, b: f64) -> Ordering {
    if (a - b).abs() < 1e-10 {
        Ordering::Equal
    } else {
        a.partial_cmp(&b).unwrap_or(Ordering::Equal)
    }
}

/// Anchored, case-insensitive regex for a `*`/`?` pattern
fn wildcard_regex(pattern: &str) -> Option<Regex> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push_str("(?is)^");
    for c in pattern.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            c => source.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');
    Regex::new(&source).ok()
}
