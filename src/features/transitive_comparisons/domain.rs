//! `Key` (hash-consed expression identity) and the normalized `Comparison`
//! edge `lhs OP rhs + offset`.

use crate::shared::CompareResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(pub u32);

/// Raw (pre-normalization) comparison operator, as it appears in surface
/// syntax — `LT`/`GT` get folded away by `Comparison::new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// `lhs result (rhs + offset)`. Normalized so `result` is only ever one
/// of `EQ`, `LE`, `GE`, `NE` (§3, §8: "no stored edge has operator LT or
/// GT").
#[derive(Debug, Clone, Copy)]
pub struct Comparison {
    pub lhs: Key,
    pub rhs: Key,
    pub offset: i64,
    pub result: CompareResult,
}

impl Comparison {
    /// Build a normalized edge from a raw operator, tightening `LT`/`GT`
    /// into `LE`/`GE` by adjusting the offset: `lhs < rhs + c` becomes
    /// `lhs <= rhs + (c-1)`; `lhs > rhs + c` becomes `lhs >= rhs + (c+1)`.
    pub fn new(lhs: Key, rhs: Key, offset: i64, op: RawOp) -> Self {
        match op {
            RawOp::Eq => Self { lhs, rhs, offset, result: CompareResult::EQ },
            RawOp::Ne => Self { lhs, rhs, offset, result: CompareResult::NE },
            RawOp::Le => Self { lhs, rhs, offset, result: CompareResult::LE },
            RawOp::Ge => Self { lhs, rhs, offset, result: CompareResult::GE },
            RawOp::Lt => Self { lhs, rhs, offset: offset - 1, result: CompareResult::LE },
            RawOp::Gt => Self { lhs, rhs, offset: offset + 1, result: CompareResult::GE },
        }
    }

    /// Rewrite this edge to have `new_lhs` on the left, reversing operator
    /// and offset if `new_lhs` is currently the rhs. `None` if the edge
    /// touches neither side.
    pub fn with_lhs(&self, new_lhs: Key) -> Option<Comparison> {
        if self.lhs == new_lhs {
            Some(*self)
        } else if self.rhs == new_lhs {
            Some(Comparison {
                lhs: self.rhs,
                rhs: self.lhs,
                offset: -self.offset,
                result: self.result.reverse(),
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lt_normalizes_to_le_with_shifted_offset() {
        let c = Comparison::new(Key(0), Key(1), 5, RawOp::Lt);
        assert_eq!(c.result, CompareResult::LE);
        assert_eq!(c.offset, 4);
    }

    #[test]
    fn with_lhs_reverses_when_matching_rhs() {
        let c = Comparison::new(Key(0), Key(1), 3, RawOp::Le);
        let flipped = c.with_lhs(Key(1)).unwrap();
        assert_eq!(flipped.lhs, Key(1));
        assert_eq!(flipped.rhs, Key(0));
        assert_eq!(flipped.offset, -3);
        assert_eq!(flipped.result, CompareResult::GE);
    }
}
