//! `ConstIntBoundEntry`: a closed `i64` interval with ±∞ saturation.

use crate::shared::{inf_aware_add, inf_aware_mul, inf_aware_neg, is_neg_inf, is_pos_inf, DType, TypeCode, NEG_INF, POS_INF};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstIntBoundEntry {
    pub min: i64,
    pub max: i64,
}

impl ConstIntBoundEntry {
    /// Construct a new entry, normalizing `min = +inf` to `+inf - 1` and
    /// `max = -inf` to `-inf + 1` per §3's invariant.
    pub fn new(min: i64, max: i64) -> Self {
        let min = if is_pos_inf(min) { POS_INF - 1 } else { min };
        let max = if is_neg_inf(max) { NEG_INF + 1 } else { max };
        debug_assert!(min <= max, "ConstIntBoundEntry requires min <= max");
        Self { min, max }
    }

    pub fn constant(v: i64) -> Self {
        Self::new(v, v)
    }

    pub fn everything() -> Self {
        Self::new(NEG_INF, POS_INF)
    }

    /// The full range representable in `dtype`, clamped to the ±∞
    /// sentinels used throughout this crate (unbounded/128-bit integers
    /// are out of scope).
    pub fn everything_for(dtype: DType) -> Self {
        if dtype.code == TypeCode::UInt {
            let max = if dtype.bits >= 63 { POS_INF } else { (1i64 << dtype.bits) - 1 };
            Self::new(0, max)
        } else if dtype.bits >= 64 {
            Self::new(NEG_INF, POS_INF)
        } else {
            let max = (1i64 << (dtype.bits - 1)) - 1;
            let min = -(1i64 << (dtype.bits - 1));
            Self::new(min.max(NEG_INF), max.min(POS_INF))
        }
    }

    pub fn is_everything_bound(&self, dtype: DType) -> bool {
        *self == Self::everything_for(dtype)
    }

    /// `true` when this bound's range is contained in `dtype`'s range,
    /// i.e. a cast to `dtype` can never truncate it.
    pub fn fits_in(&self, dtype: DType) -> bool {
        let full = Self::everything_for(dtype);
        self.min >= full.min && self.max <= full.max
    }

    pub fn is_const(&self) -> bool {
        self.min == self.max
    }

    pub fn as_const(&self) -> Option<i64> {
        self.is_const().then_some(self.min)
    }

    pub fn intersect(&self, other: &Self) -> Self {
        Self::new(self.min.max(other.min), self.max.min(other.max))
    }

    pub fn union(&self, other: &Self) -> Self {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn add(&self, other: &Self) -> Self {
        Self::new(
            inf_aware_add(self.min, other.min),
            inf_aware_add(self.max, other.max),
        )
    }

    pub fn neg(&self) -> Self {
        Self::new(inf_aware_neg(self.max), inf_aware_neg(self.min))
    }

    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }

    pub fn mul(&self, other: &Self) -> Self {
        let corners = [
            inf_aware_mul(self.min, other.min),
            inf_aware_mul(self.min, other.max),
            inf_aware_mul(self.max, other.min),
            inf_aware_mul(self.max, other.max),
        ];
        Self::new(
            *corners.iter().min().unwrap(),
            *corners.iter().max().unwrap(),
        )
    }

    pub fn min_with(&self, other: &Self) -> Self {
        Self::new(self.min.min(other.min), self.max.min(other.max))
    }

    pub fn max_with(&self, other: &Self) -> Self {
        Self::new(self.min.max(other.min), self.max.max(other.max))
    }

    /// Exclude zero from a divisor's range per the "divide-by-zero
    /// assumption": `[a, b]` containing 0 is tightened to `[1, b]` when
    /// `b >= 1`, else left unchanged (callers should treat that case as
    /// "always zero divisor", a hard error, separately).
    fn exclude_zero_divisor(&self) -> Self {
        if self.min <= 0 && self.max >= 0 {
            if self.max >= 1 {
                Self::new(1, self.max)
            } else {
                *self
            }
        } else {
            *self
        }
    }

    pub fn trunc_div(&self, divisor: &Self) -> Self {
        let b = divisor.exclude_zero_divisor();
        if b.min < 0 && b.max > 0 {
            let neg = Self::new(b.min, -1);
            let pos = Self::new(1, b.max);
            return self.trunc_div(&neg).union(&self.trunc_div(&pos));
        }
        let corners = [
            checked_div(self.min, b.min),
            checked_div(self.min, b.max),
            checked_div(self.max, b.min),
            checked_div(self.max, b.max),
        ];
        Self::new(
            *corners.iter().min().unwrap(),
            *corners.iter().max().unwrap(),
        )
    }

    pub fn trunc_mod(&self, divisor: &Self) -> Self {
        let b = divisor.exclude_zero_divisor();
        if !(b.min > 0) {
            // Sign of divisor unknown/negative after exclusion: fall back
            // to a conservative bound from the magnitude of `b`.
            let bound = b.min.unsigned_abs().max(b.max.unsigned_abs()) as i64;
            let bound = (bound - 1).max(0);
            return Self::new(-bound, bound);
        }
        if self.min >= 0 {
            Self::new(0, self.max.min(b.max - 1).max(0))
        } else {
            let lo = (-(b.max - 1)).max(self.min);
            let hi = self.max.max(0).min(b.max - 1);
            Self::new(lo, hi)
        }
    }

    pub fn floor_div(&self, divisor: &Self) -> Self {
        let b = divisor.exclude_zero_divisor();
        if b.min < 0 && b.max > 0 {
            let neg = Self::new(b.min, -1);
            let pos = Self::new(1, b.max);
            return self.floor_div(&neg).union(&self.floor_div(&pos));
        }
        let corners = [
            checked_floor_div(self.min, b.min),
            checked_floor_div(self.min, b.max),
            checked_floor_div(self.max, b.min),
            checked_floor_div(self.max, b.max),
        ];
        Self::new(
            *corners.iter().min().unwrap(),
            *corners.iter().max().unwrap(),
        )
    }

    pub fn floor_mod(&self, divisor: &Self) -> Self {
        let b = divisor.exclude_zero_divisor();
        let bound = b.max.unsigned_abs().max(b.min.unsigned_abs()) as i64;
        let bound = (bound - 1).max(0);
        // `floor_mod` always has the sign of the divisor; with `b` positive
        // after exclusion the result is [0, b.max-1].
        let base = if b.min > 0 {
            Self::new(0, (b.max - 1).max(0))
        } else {
            Self::new(-bound, bound)
        };
        if self.min >= 0 && b.min > 0 {
            return base;
        }
        base.intersect(&Self::new(0.min(b.min + 1), 0.max(b.max - 1)))
    }

    pub fn cast_to(&self, dtype: DType) -> Self {
        self.intersect(&Self::everything_for(dtype))
    }
}

fn checked_div(a: i64, b: i64) -> i64 {
    if is_pos_inf(a) || is_neg_inf(a) || is_pos_inf(b) || is_neg_inf(b) {
        let neg = (a < 0) != (b < 0);
        if is_pos_inf(a.abs().max(1)) && !is_pos_inf(b) && b != 0 {
            // infinite dividend, finite divisor
            return if neg { NEG_INF } else { POS_INF };
        }
        if is_pos_inf(b) || is_neg_inf(b) {
            return 0;
        }
        return if neg { NEG_INF } else { POS_INF };
    }
    a / b
}

fn checked_floor_div(a: i64, b: i64) -> i64 {
    if is_pos_inf(a) || is_neg_inf(a) || is_pos_inf(b) || is_neg_inf(b) {
        return checked_div(a, b);
    }
    crate::domain::fold::floor_div(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_sentinel_overshoot() {
        let e = ConstIntBoundEntry::new(POS_INF, POS_INF);
        assert_eq!(e.max, POS_INF);
        assert_eq!(e.min, POS_INF - 1);
    }

    #[test]
    fn mul_corners_cover_sign_flip() {
        let a = ConstIntBoundEntry::new(-3, 2);
        let b = ConstIntBoundEntry::new(-5, 4);
        let r = a.mul(&b);
        // min candidate: 2 * -5 = -10; max candidate: -3 * -5 = 15
        assert_eq!(r.min, -10);
        assert_eq!(r.max, 15);
    }

    #[test]
    fn trunc_mod_with_nonneg_dividend() {
        let a = ConstIntBoundEntry::new(0, 100);
        let b = ConstIntBoundEntry::constant(4);
        let r = a.trunc_mod(&b);
        assert_eq!(r, ConstIntBoundEntry::new(0, 3));
    }

    #[test]
    fn floor_mod_always_nonneg_for_positive_divisor() {
        let a = ConstIntBoundEntry::new(-100, 100);
        let b = ConstIntBoundEntry::constant(8);
        let r = a.floor_mod(&b);
        assert_eq!(r.min, 0);
        assert_eq!(r.max, 7);
    }

    #[test]
    fn divisor_straddling_zero_is_split() {
        let a = ConstIntBoundEntry::constant(10);
        let b = ConstIntBoundEntry::new(-2, 2);
        let r = a.trunc_div(&b);
        // corners come from b excluding 0: [-2,-1] union [1,2] -> div gives
        // {-10,-5} union {10,5}
        assert_eq!(r.min, -10);
        assert_eq!(r.max, 10);
    }
}
