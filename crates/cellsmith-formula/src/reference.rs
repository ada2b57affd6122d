//! Reference resolution
//!
//! A parsed reference keeps the literal coordinates written in the formula
//! together with its `$` flags. Resolving it against an anchor (the cell the
//! formula was written for) and a target (the cell it is evaluated at) is done
//! per axis: absolute coordinates stay put, relative ones move by the
//! target-anchor offset.

use std::fmt;

use cellsmith_core::CellAddress;

/// A literal cell reference as written in formula text (0-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reference {
    pub row: i32,
    pub col: i32,
    pub row_absolute: bool,
    pub col_absolute: bool,
}

impl Reference {
    /// Build a reference from a parsed address, keeping its `$` flags
    pub fn from_address(address: CellAddress) -> Self {
        Self {
            row: address.row as i32,
            col: address.col as i32,
            row_absolute: address.row_absolute,
            col_absolute: address.col_absolute,
        }
    }

    /// The literal address, ignoring any shift
    pub fn literal(&self) -> Option<CellAddress> {
        CellAddress::from_coords(self.row as i64, self.col as i64)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.literal() {
            Some(addr) => {
                let addr = CellAddress::with_absolute(
                    addr.row,
                    addr.col,
                    self.row_absolute,
                    self.col_absolute,
                );
                write!(f, "{}", addr.to_a1_string())
            }
            None => f.write_str("#REF!"),
        }
    }
}

/// Resolve a reference written at `anchor` for evaluation at `target`
///
/// Returns `None` when a relative axis is shifted off the sheet.
pub fn resolve(reference: &Reference, anchor: CellAddress, target: CellAddress) -> Option<CellAddress> {
    let row = if reference.row_absolute {
        reference.row as i64
    } else {
        reference.row as i64 + (target.row as i64 - anchor.row as i64)
    };
    let col = if reference.col_absolute {
        reference.col as i64
    } else {
        reference.col as i64 + (target.col as i64 - anchor.col as i64)
    };
    CellAddress::from_coords(row, col)
}

/// Anchor/target pair applied to every reference during one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceShift {
    pub anchor: CellAddress,
    pub target: CellAddress,
}

impl ReferenceShift {
    pub fn new(anchor: CellAddress, target: CellAddress) -> Self {
        Self { anchor, target }
    }

    /// Resolve one reference under this shift
    #[inline]
    pub fn apply(&self, reference: &Reference) -> Option<CellAddress> {
        resolve(reference, self.anchor, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reference(a1: &str) -> Reference {
        Reference::from_address(CellAddress::parse(a1).unwrap())
    }

    #[test]
    fn test_relative_reference_shifts_both_axes() {
        // =A1 written for B2, evaluated at C5, reads B4
        let resolved = resolve(
            &reference("A1"),
            CellAddress::new(1, 1),
            CellAddress::new(4, 2),
        );
        assert_eq!(resolved, Some(CellAddress::new(3, 1)));
    }

    #[test]
    fn test_absolute_reference_is_fixed() {
        let resolved = resolve(
            &reference("$D$7"),
            CellAddress::new(0, 0),
            CellAddress::new(500, 30),
        );
        assert_eq!(resolved, Some(CellAddress::new(6, 3)));
    }

    #[test]
    fn test_mixed_references() {
        let anchor = CellAddress::new(0, 0);
        let target = CellAddress::new(2, 3);
        assert_eq!(
            resolve(&reference("$A1"), anchor, target),
            Some(CellAddress::new(2, 0))
        );
        assert_eq!(
            resolve(&reference("A$1"), anchor, target),
            Some(CellAddress::new(0, 3))
        );
    }

    #[test]
    fn test_shift_off_sheet() {
        let resolved = resolve(
            &reference("A1"),
            CellAddress::new(5, 5),
            CellAddress::new(4, 5),
        );
        assert_eq!(resolved, None);
    }

    #[test]
    fn test_display_keeps_flags() {
        assert_eq!(reference("$B3").to_string(), "$B3");
        assert_eq!(reference("C$10").to_string(), "C$10");
    }

    proptest! {
        #[test]
        fn prop_relative_at_anchor_is_literal(
            row in 0u32..1000, col in 0u16..500,
            arow in 0u32..1000, acol in 0u16..500,
        ) {
            let r = Reference::from_address(CellAddress::new(row, col));
            let anchor = CellAddress::new(arow, acol);
            prop_assert_eq!(resolve(&r, anchor, anchor), Some(CellAddress::new(row, col)));
        }

        #[test]
        fn prop_relative_moves_with_target(
            row in 0u32..1000, col in 0u16..500,
            dr in 0u32..1000, dc in 0u16..500,
        ) {
            let r = Reference::from_address(CellAddress::new(row, col));
            let anchor = CellAddress::new(0, 0);
            let target = CellAddress::new(dr, dc);
            prop_assert_eq!(resolve(&r, anchor, target), Some(CellAddress::new(row + dr, col + dc)));
        }

        #[test]
        fn prop_absolute_ignores_target(
            row in 0u32..1000, col in 0u16..500,
            trow in 0u32..100_000, tcol in 0u16..16_000,
        ) {
            let r = Reference::from_address(CellAddress::with_absolute(row, col, true, true));
            let resolved = resolve(&r, CellAddress::new(0, 0), CellAddress::new(trow, tcol));
            prop_assert_eq!(resolved, Some(CellAddress::new(row, col)));
        }

        #[test]
        fn prop_mixed_varies_on_relative_axis_only(
            row in 0u32..1000, col in 0u16..500,
            dr in 0u32..1000, dc in 0u16..500,
        ) {
            let r = Reference::from_address(CellAddress::with_absolute(row, col, true, false));
            let resolved = resolve(&r, CellAddress::new(0, 0), CellAddress::new(dr, dc));
            prop_assert_eq!(resolved, Some(CellAddress::new(row, col + dc)));
        }
    }
}
