//! Conditional formatting rules
//!
//! A rule pairs a formula with the ranges it applies to. The formula is written
//! relative to the rule base, the top-left cell of the first range, and is
//! re-evaluated at every cell of the ranges with relative references shifted.
//!
//! ## Example
//!
//! ```rust
//! use cellsmith_core::{CellAddress, CellRange, ConditionalFormatRule};
//!
//! // Highlight rows whose column A value exceeds 100
//! let rule = ConditionalFormatRule::expression("=$A1>100")
//!     .with_range(CellRange::parse("A1:D20").unwrap())
//!     .with_priority(2);
//!
//! assert_eq!(rule.rule_base(), Some(CellAddress::new(0, 0)));
//! ```

use crate::cell::{CellAddress, CellRange};

/// A formula-driven conditional formatting rule
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConditionalFormatRule {
    /// Formula text (leading `=` optional)
    pub formula: String,
    /// Cell ranges this rule applies to
    pub ranges: Vec<CellRange>,
    /// Priority (lower = higher priority)
    pub priority: u32,
    /// Stop processing further rules if this one matches
    pub stop_if_true: bool,
    /// Differential format index applied on match
    pub format_id: Option<u32>,
}

impl ConditionalFormatRule {
    /// Create an expression rule with no ranges
    pub fn expression(formula: impl Into<String>) -> Self {
        Self {
            formula: formula.into(),
            ranges: Vec::new(),
            priority: 1,
            stop_if_true: false,
            format_id: None,
        }
    }

    /// Add a range the rule applies to
    pub fn with_range(mut self, range: CellRange) -> Self {
        self.ranges.push(range);
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Set stop-if-true
    pub fn with_stop_if_true(mut self, stop: bool) -> Self {
        self.stop_if_true = stop;
        self
    }

    /// Set the format applied on match
    pub fn with_format_id(mut self, format_id: u32) -> Self {
        self.format_id = Some(format_id);
        self
    }

    /// Anchor cell the formula's relative references are written against
    pub fn rule_base(&self) -> Option<CellAddress> {
        self.ranges.first().map(|r| r.start.relative())
    }

    /// Check whether a cell is covered by the rule
    pub fn applies_to(&self, addr: &CellAddress) -> bool {
        self.ranges.iter().any(|r| r.contains(addr))
    }

    /// Every covered cell, range by range, without duplicates
    pub fn cells(&self) -> impl Iterator<Item = CellAddress> + '_ {
        self.ranges.iter().enumerate().flat_map(move |(i, range)| {
            range
                .cells()
                .filter(move |addr| !self.ranges[..i].iter().any(|r| r.contains(addr)))
        })
    }
}
