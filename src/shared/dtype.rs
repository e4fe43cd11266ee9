//! Shared primitive types: `DType`, `DivMode`, integer sentinels, and the
//! 3-bit `CompareResult` lattice used by every sub-analyzer.

/// Scalar/vector element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    Int,
    UInt,
    Float,
    BFloat,
    OpaqueHandle,
}

/// A dtype: element kind, bit width, and lane count. `lanes > 1` is a
/// vector dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DType {
    pub code: TypeCode,
    pub bits: u8,
    pub lanes: u16,
}

impl DType {
    pub const fn new(code: TypeCode, bits: u8, lanes: u16) -> Self {
        Self { code, bits, lanes }
    }

    pub const fn int(bits: u8) -> Self {
        Self::new(TypeCode::Int, bits, 1)
    }

    pub const fn uint(bits: u8) -> Self {
        Self::new(TypeCode::UInt, bits, 1)
    }

    pub const fn float(bits: u8) -> Self {
        Self::new(TypeCode::Float, bits, 1)
    }

    pub const I32: DType = DType::int(32);
    pub const I64: DType = DType::int(64);
    pub const U32: DType = DType::uint(32);
    pub const U64: DType = DType::uint(64);
    pub const BOOL: DType = DType::uint(1);

    pub fn is_vector(&self) -> bool {
        self.lanes > 1
    }

    pub fn is_int_like(&self) -> bool {
        matches!(self.code, TypeCode::Int | TypeCode::UInt)
    }

    /// "Index type" per the data model: int/uint scalar with bits in {32, 64}.
    pub fn is_index_type(&self) -> bool {
        self.lanes == 1 && self.is_int_like() && (self.bits == 32 || self.bits == 64)
    }

    pub fn with_lanes(&self, lanes: u16) -> Self {
        Self { lanes, ..*self }
    }

    /// The widest of two integer dtypes, promoting to float if either side
    /// is float, and rejecting mixes involving an opaque handle.
    pub fn promote(a: DType, b: DType) -> crate::errors::Result<DType> {
        if a.code == TypeCode::OpaqueHandle || b.code == TypeCode::OpaqueHandle {
            return Err(crate::errors::AnalyzerError::value(
                "cannot promote an opaque-handle dtype",
            ));
        }
        let lanes = a.lanes.max(b.lanes);
        if a.lanes != 1 && b.lanes != 1 && a.lanes != b.lanes {
            return Err(crate::errors::AnalyzerError::value(format!(
                "lane mismatch: {} vs {}",
                a.lanes, b.lanes
            )));
        }
        let is_float = a.code == TypeCode::Float || b.code == TypeCode::Float;
        if is_float {
            return Ok(DType::new(TypeCode::Float, a.bits.max(b.bits), lanes));
        }
        if a.code == TypeCode::Int || b.code == TypeCode::Int {
            return Ok(DType::new(TypeCode::Int, a.bits.max(b.bits), lanes));
        }
        Ok(DType::new(TypeCode::UInt, a.bits.max(b.bits), lanes))
    }
}

/// Integer division/modulo convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DivMode {
    /// C-style truncation toward zero.
    TruncDiv,
    /// Python-style floor division.
    FloorDiv,
}

/// Symmetric saturating sentinels. `i64::MIN` is deliberately unused so
/// that negating or adding sentinels never overflows into the other one.
pub const POS_INF: i64 = i64::MAX;
pub const NEG_INF: i64 = -i64::MAX;

pub fn is_pos_inf(v: i64) -> bool {
    v >= POS_INF
}

pub fn is_neg_inf(v: i64) -> bool {
    v <= NEG_INF
}

/// Saturating add that is aware of the `POS_INF`/`NEG_INF` sentinels: a
/// finite value added to a sentinel stays the sentinel, and finite
/// overflow saturates toward the sentinel in the overflowing direction.
pub fn inf_aware_add(a: i64, b: i64) -> i64 {
    if is_pos_inf(a) || is_pos_inf(b) {
        if is_neg_inf(a) || is_neg_inf(b) {
            // +inf + -inf is only reachable for ill-formed intervals; treat as 0.
            return 0;
        }
        return POS_INF;
    }
    if is_neg_inf(a) || is_neg_inf(b) {
        return NEG_INF;
    }
    match a.checked_add(b) {
        Some(v) if v < POS_INF && v > NEG_INF => v,
        Some(v) if v >= POS_INF => POS_INF,
        _ => NEG_INF,
    }
}

pub fn inf_aware_neg(a: i64) -> i64 {
    if is_pos_inf(a) {
        NEG_INF
    } else if is_neg_inf(a) {
        POS_INF
    } else {
        -a
    }
}

pub fn inf_aware_sub(a: i64, b: i64) -> i64 {
    inf_aware_add(a, inf_aware_neg(b))
}

/// Saturating multiply that treats either operand being a sentinel as
/// producing the correctly-signed sentinel (or 0 if either finite factor
/// is zero).
pub fn inf_aware_mul(a: i64, b: i64) -> i64 {
    if a == 0 || b == 0 {
        return 0;
    }
    if is_pos_inf(a) || is_neg_inf(a) || is_pos_inf(b) || is_neg_inf(b) {
        let neg = (a < 0) != (b < 0);
        return if neg { NEG_INF } else { POS_INF };
    }
    match a.checked_mul(b) {
        Some(v) if v < POS_INF && v > NEG_INF => v,
        Some(v) if v >= POS_INF => POS_INF,
        Some(_) => NEG_INF,
        None => {
            let neg = (a < 0) != (b < 0);
            if neg {
                NEG_INF
            } else {
                POS_INF
            }
        }
    }
}

/// Zero-aware, sign-agnostic greatest common divisor: `gcd(0, x) = |x|`.
pub fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a as i64
}

/// 3-bit comparison-result lattice. Non-strict variants are the bitwise OR
/// of the strict ones: `LE = EQ | LT`, `GE = EQ | GT`, `NE = LT | GT`,
/// `Unknown = EQ | LT | GT`, `Inconsistent = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompareResult(u8);

impl CompareResult {
    const BIT_EQ: u8 = 1 << 0;
    const BIT_LT: u8 = 1 << 1;
    const BIT_GT: u8 = 1 << 2;

    pub const INCONSISTENT: CompareResult = CompareResult(0);
    pub const EQ: CompareResult = CompareResult(Self::BIT_EQ);
    pub const LT: CompareResult = CompareResult(Self::BIT_LT);
    pub const GT: CompareResult = CompareResult(Self::BIT_GT);
    pub const LE: CompareResult = CompareResult(Self::BIT_EQ | Self::BIT_LT);
    pub const GE: CompareResult = CompareResult(Self::BIT_EQ | Self::BIT_GT);
    pub const NE: CompareResult = CompareResult(Self::BIT_LT | Self::BIT_GT);
    pub const UNKNOWN: CompareResult = CompareResult(Self::BIT_EQ | Self::BIT_LT | Self::BIT_GT);

    pub fn and(self, other: CompareResult) -> CompareResult {
        CompareResult(self.0 & other.0)
    }

    pub fn or(self, other: CompareResult) -> CompareResult {
        CompareResult(self.0 | other.0)
    }

    /// Swap `lhs`/`rhs`: `a < b` becomes `a > b`, `a <= b` becomes `a >= b`.
    pub fn reverse(self) -> CompareResult {
        let mut bits = self.0 & Self::BIT_EQ;
        if self.0 & Self::BIT_LT != 0 {
            bits |= Self::BIT_GT;
        }
        if self.0 & Self::BIT_GT != 0 {
            bits |= Self::BIT_LT;
        }
        CompareResult(bits)
    }

    /// Boolean negation of the comparison: "not (a < b)" is "a >= b".
    pub fn negate(self) -> CompareResult {
        CompareResult(!self.0 & Self::UNKNOWN.0)
    }

    pub fn is_inconsistent(self) -> bool {
        self.0 == 0
    }

    pub fn implies_true(self, query: CompareResult) -> bool {
        // `self` is known; does it guarantee `query` holds, i.e. is `self`
        // a (non-strict) subset of query's allowed outcomes?
        self.0 != 0 && (self.0 & !query.0) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_result_algebra() {
        assert_eq!(CompareResult::LE, CompareResult::EQ.or(CompareResult::LT));
        assert_eq!(CompareResult::GE, CompareResult::EQ.or(CompareResult::GT));
        assert_eq!(CompareResult::NE, CompareResult::LT.or(CompareResult::GT));
        assert_eq!(CompareResult::LT.reverse(), CompareResult::GT);
        assert_eq!(CompareResult::LE.reverse(), CompareResult::GE);
        assert_eq!(CompareResult::LT.negate(), CompareResult::GE);
        assert!(CompareResult::LT.implies_true(CompareResult::LE));
        assert!(!CompareResult::LE.implies_true(CompareResult::LT));
    }

    #[test]
    fn inf_aware_arith_saturates() {
        assert_eq!(inf_aware_add(POS_INF, 5), POS_INF);
        assert_eq!(inf_aware_add(NEG_INF, -5), NEG_INF);
        assert_eq!(inf_aware_add(i64::MAX - 1, 10), POS_INF);
        assert_eq!(inf_aware_mul(POS_INF, -1), NEG_INF);
        assert_eq!(inf_aware_mul(0, POS_INF), 0);
    }

    #[test]
    fn gcd_is_zero_aware() {
        assert_eq!(gcd(0, 7), 7);
        assert_eq!(gcd(0, -7), 7);
        assert_eq!(gcd(12, 18), 6);
        assert_eq!(gcd(0, 0), 0);
    }
}
