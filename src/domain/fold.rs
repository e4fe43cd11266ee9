//! Constant folding (component B): per-operator total/partial functions
//! on `IntImm`/`FloatImm` operands. Folding is attempted by every
//! operator constructor in §6 before a fresh node is returned.

use super::expr::{Expr, ExprKind, IntrinsicOp};
use crate::errors::{AnalyzerError, Result};
use crate::shared::DType;

/// Attempt to fold a binary integer/float operator over two operands.
/// `Ok(None)` means "not both constants, nothing to fold" — the caller
/// should build the ordinary node. `Err` surfaces a genuine value error
/// (divide by zero).
pub fn try_const_fold_binary(
    op: BinOp,
    dtype: DType,
    a: &Expr,
    b: &Expr,
) -> Result<Option<Expr>> {
    if let (Some(x), Some(y)) = (a.as_int_imm(), b.as_int_imm()) {
        return Ok(Some(fold_int_binary(op, dtype, x, y)?));
    }
    if let (ExprKind::FloatImm(x), ExprKind::FloatImm(y)) = (a.kind(), b.kind()) {
        return Ok(fold_float_binary(op, dtype, *x, *y).map(|v| Expr::float_imm(dtype, v)));
    }
    Ok(None)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    TruncDiv,
    TruncMod,
    FloorDiv,
    FloorMod,
    Min,
    Max,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

fn bool_imm(dtype: DType, v: bool) -> Expr {
    Expr::int_imm(dtype, v as i64)
}

fn fold_int_binary(op: BinOp, dtype: DType, x: i64, y: i64) -> Result<Expr> {
    use BinOp::*;
    let v = match op {
        Add => x.checked_add(y).ok_or_else(|| AnalyzerError::value("integer overflow in +"))?,
        Sub => x.checked_sub(y).ok_or_else(|| AnalyzerError::value("integer overflow in -"))?,
        Mul => x.checked_mul(y).ok_or_else(|| AnalyzerError::value("integer overflow in *"))?,
        TruncDiv => {
            if y == 0 {
                return Err(AnalyzerError::value("division by zero"));
            }
            x.checked_div(y).ok_or_else(|| AnalyzerError::value("integer overflow in div"))?
        }
        TruncMod => {
            if y == 0 {
                return Err(AnalyzerError::value("modulo by zero"));
            }
            x.checked_rem(y).ok_or_else(|| AnalyzerError::value("integer overflow in mod"))?
        }
        FloorDiv => {
            if y == 0 {
                return Err(AnalyzerError::value("division by zero"));
            }
            floor_div(x, y)
        }
        FloorMod => {
            if y == 0 {
                return Err(AnalyzerError::value("modulo by zero"));
            }
            floor_mod(x, y)
        }
        Min => return Ok(Expr::int_imm(dtype, x.min(y))),
        Max => return Ok(Expr::int_imm(dtype, x.max(y))),
        Eq => return Ok(bool_imm(dtype, x == y)),
        Ne => return Ok(bool_imm(dtype, x != y)),
        Lt => return Ok(bool_imm(dtype, x < y)),
        Le => return Ok(bool_imm(dtype, x <= y)),
        Gt => return Ok(bool_imm(dtype, x > y)),
        Ge => return Ok(bool_imm(dtype, x >= y)),
        And => return Ok(bool_imm(dtype, x != 0 && y != 0)),
        Or => return Ok(bool_imm(dtype, x != 0 || y != 0)),
    };
    Ok(Expr::int_imm(dtype, v))
}

pub fn floor_div(x: i64, y: i64) -> i64 {
    let q = x / y;
    let r = x % y;
    if (r != 0) && ((r < 0) != (y < 0)) {
        q - 1
    } else {
        q
    }
}

pub fn floor_mod(x: i64, y: i64) -> i64 {
    let r = x % y;
    if r != 0 && (r < 0) != (y < 0) {
        r + y
    } else {
        r
    }
}

fn fold_float_binary(op: BinOp, _dtype: DType, x: f64, y: f64) -> Option<f64> {
    use BinOp::*;
    Some(match op {
        Add => x + y,
        Sub => x - y,
        Mul => x * y,
        Min => x.min(y),
        Max => x.max(y),
        // Comparisons/truncation/modulo on float are not folded here;
        // floats are only trivially eliminated (see `try_const_fold_unary`).
        _ => return None,
    })
}

/// Fold a unary operator (`Neg`, `Not`, `Cast`, `Abs`, bitwise-not).
pub fn try_const_fold_cast(to: DType, x: &Expr) -> Option<Expr> {
    match x.kind() {
        ExprKind::IntImm(v) => Some(Expr::int_imm(to, *v)),
        ExprKind::FloatImm(v) if to.is_int_like() => Some(Expr::int_imm(to, *v as i64)),
        ExprKind::FloatImm(v) => Some(Expr::float_imm(to, *v)),
        _ => None,
    }
}

pub fn try_const_fold_not(dtype: DType, x: &Expr) -> Option<Expr> {
    x.as_int_imm().map(|v| bool_imm(dtype, v == 0))
}

pub fn try_const_fold_neg(dtype: DType, x: &Expr) -> Result<Option<Expr>> {
    if let Some(v) = x.as_int_imm() {
        let v = v.checked_neg().ok_or_else(|| AnalyzerError::value("integer overflow in neg"))?;
        return Ok(Some(Expr::int_imm(dtype, v)));
    }
    if let ExprKind::FloatImm(v) = x.kind() {
        return Ok(Some(Expr::float_imm(dtype, -v)));
    }
    Ok(None)
}

/// Fold `select(cond, t, f)` when `cond` is a known constant.
pub fn try_const_fold_select(cond: &Expr, t: &Expr, f: &Expr) -> Option<Expr> {
    match cond.as_int_imm() {
        Some(0) => Some(f.clone()),
        Some(_) => Some(t.clone()),
        None => None,
    }
}

/// Fold an intrinsic call when all arguments are constant.
pub fn try_const_fold_call(op: IntrinsicOp, dtype: DType, args: &[Expr]) -> Result<Option<Expr>> {
    let vals: Option<Vec<i64>> = args.iter().map(|a| a.as_int_imm()).collect();
    let Some(vals) = vals else { return Ok(None) };
    let v = match op {
        IntrinsicOp::LeftShift => {
            let (a, shift) = (vals[0], vals[1]);
            if shift < 0 || shift >= dtype.bits as i64 {
                return Err(AnalyzerError::value("shift amount out of range"));
            }
            if a < 0 {
                return Err(AnalyzerError::value("left_shift of a negative operand"));
            }
            a.checked_shl(shift as u32).ok_or_else(|| AnalyzerError::value("shift overflow"))?
        }
        IntrinsicOp::RightShift => {
            let (a, shift) = (vals[0], vals[1]);
            if shift < 0 || shift >= dtype.bits as i64 {
                return Err(AnalyzerError::value("shift amount out of range"));
            }
            a >> shift
        }
        IntrinsicOp::BitwiseAnd => vals[0] & vals[1],
        IntrinsicOp::BitwiseOr => vals[0] | vals[1],
        IntrinsicOp::BitwiseXor => vals[0] ^ vals[1],
        IntrinsicOp::BitwiseNot => !vals[0],
        IntrinsicOp::Abs => vals[0].checked_abs().ok_or_else(|| AnalyzerError::value("abs overflow"))?,
    };
    Ok(Some(Expr::int_imm(dtype, v)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divide_by_zero_is_a_value_error() {
        let a = Expr::int_imm(DType::I32, 7);
        let b = Expr::int_imm(DType::I32, 0);
        let err = try_const_fold_binary(BinOp::TruncDiv, DType::I32, &a, &b).unwrap_err();
        assert!(matches!(err, AnalyzerError::Value(_)));
    }

    #[test]
    fn floor_div_matches_python_semantics() {
        assert_eq!(floor_div(-7, 2), -4);
        assert_eq!(floor_mod(-7, 2), 1);
        assert_eq!(floor_div(7, 2), 3);
        assert_eq!(floor_mod(7, 2), 1);
    }

    #[test]
    fn folds_both_const_operands() {
        let a = Expr::int_imm(DType::I32, 3);
        let b = Expr::int_imm(DType::I32, 4);
        let r = try_const_fold_binary(BinOp::Add, DType::I32, &a, &b).unwrap().unwrap();
        assert_eq!(r.as_int_imm(), Some(7));
    }
}
