//! Shared primitive types used across every sub-analyzer.
//!
//! Has no dependency on `domain` or `features` — only `DType`, sentinel
//! arithmetic, and the `CompareResult` lattice live here.

pub mod dtype;

pub use dtype::{
    gcd, inf_aware_add, inf_aware_mul, inf_aware_neg, inf_aware_sub, is_neg_inf, is_pos_inf,
    CompareResult, DType, DivMode, TypeCode, NEG_INF, POS_INF,
};
