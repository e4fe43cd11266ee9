//! `SplitExpr`/`SumExpr`: the sum-of-split canonical form for index
//! arithmetic (§3, §4.G).

use crate::domain::expr::{Expr, ExprKind};
use crate::shared::{gcd, DType, DivMode, POS_INF};

/// `((index mod upper_factor) div lower_factor) * scale`. `upper_factor
/// == POS_INF` omits the outer `mod`; `lower_factor == 1` omits the
/// inner `div`.
#[derive(Debug, Clone)]
pub struct SplitExpr {
    pub dtype: DType,
    pub index: Expr,
    pub lower_factor: i64,
    pub upper_factor: i64,
    pub scale: i64,
    pub div_mode: DivMode,
}

impl SplitExpr {
    pub fn new(dtype: DType, index: Expr, lower_factor: i64, upper_factor: i64, scale: i64, div_mode: DivMode) -> Self {
        debug_assert!(lower_factor >= 1);
        debug_assert!(upper_factor == POS_INF || upper_factor % lower_factor == 0);
        Self { dtype, index, lower_factor, upper_factor, scale, div_mode }
    }

    pub fn identity(index: Expr, dtype: DType, div_mode: DivMode) -> Self {
        Self::new(dtype, index, 1, POS_INF, 1, div_mode)
    }

    /// `true` when `other`'s div mode is interchangeable with `self`'s:
    /// either they already match, or both degenerate cases agree
    /// (`lower_factor == 1 && upper_factor == +inf`, where trunc/floor
    /// div and mod are definitionally identical).
    pub fn div_mode_compatible_to(&self, mode: DivMode) -> bool {
        self.div_mode == mode || (self.lower_factor == 1 && self.upper_factor == POS_INF)
    }

    pub fn to_expr(&self) -> Expr {
        let mut e = self.index.clone();
        if self.upper_factor != POS_INF {
            e = Expr::new(
                self.dtype,
                match self.div_mode {
                    DivMode::TruncDiv => ExprKind::Mod(e, Expr::int_imm(self.dtype, self.upper_factor)),
                    DivMode::FloorDiv => ExprKind::FloorMod(e, Expr::int_imm(self.dtype, self.upper_factor)),
                },
            );
        }
        if self.lower_factor != 1 {
            e = Expr::new(
                self.dtype,
                match self.div_mode {
                    DivMode::TruncDiv => ExprKind::Div(e, Expr::int_imm(self.dtype, self.lower_factor)),
                    DivMode::FloorDiv => ExprKind::FloorDiv(e, Expr::int_imm(self.dtype, self.lower_factor)),
                },
            );
        }
        if self.scale != 1 {
            e = Expr::new(self.dtype, ExprKind::Mul(e, Expr::int_imm(self.dtype, self.scale)));
        }
        e
    }
}

/// `base + sum(args[i].to_expr())`. `args` is maintained sorted
/// descending by `lower_factor` within each run sharing the same
/// `index`, per the segment invariant in §3.
#[derive(Debug, Clone)]
pub struct SumExpr {
    pub dtype: DType,
    pub args: Vec<SplitExpr>,
    pub base: i64,
}

impl SumExpr {
    pub fn constant(dtype: DType, base: i64) -> Self {
        Self { dtype, args: Vec::new(), base }
    }

    pub fn single(split: SplitExpr) -> Self {
        let dtype = split.dtype;
        Self { dtype, args: vec![split], base: 0 }
    }

    pub fn to_expr(&self) -> Expr {
        let mut e: Option<Expr> = None;
        for s in &self.args {
            let t = s.to_expr();
            e = Some(match e {
                Some(acc) => Expr::new(self.dtype, ExprKind::Add(acc, t)),
                None => t,
            });
        }
        match (e, self.base) {
            (Some(acc), 0) => acc,
            (Some(acc), b) => Expr::new(self.dtype, ExprKind::Add(acc, Expr::int_imm(self.dtype, b))),
            (None, b) => Expr::int_imm(self.dtype, b),
        }
    }

    /// Fold `other` into `self`, scaled by `sign` (+1 for add, -1 for
    /// sub): locate the run of args sharing `other.index`, and within it
    /// an entry with identical `(lower_factor, upper_factor)` and a
    /// compatible div mode; merge scales there, else insert keeping the
    /// run sorted descending by `lower_factor`.
    pub fn add_to_self(&mut self, other: &SplitExpr, sign: i64) {
        let run_start = self.args.iter().position(|s| s.index.structurally_eq(&other.index));
        match run_start {
            None => {
                self.args.push(SplitExpr { scale: other.scale * sign, ..other.clone() });
            }
            Some(start) => {
                let run_end = self.args[start..]
                    .iter()
                    .position(|s| !s.index.structurally_eq(&other.index))
                    .map(|off| start + off)
                    .unwrap_or(self.args.len());
                let merge_at = self.args[start..run_end].iter().position(|s| {
                    s.lower_factor == other.lower_factor
                        && s.upper_factor == other.upper_factor
                        && s.div_mode_compatible_to(other.div_mode)
                });
                match merge_at {
                    Some(i) => {
                        self.args[start + i].scale += other.scale * sign;
                    }
                    None => {
                        let insert_at = self.args[start..run_end]
                            .iter()
                            .position(|s| s.lower_factor < other.lower_factor)
                            .map(|off| start + off)
                            .unwrap_or(run_end);
                        self.args.insert(insert_at, SplitExpr { scale: other.scale * sign, ..other.clone() });
                    }
                }
            }
        }
        self.args.retain(|s| s.scale != 0);
    }

    pub fn mul_to_self(&mut self, c: i64) {
        self.base *= c;
        for s in &mut self.args {
            s.scale *= c;
        }
    }

    /// Divide every scale and the base by `g` in place. Caller must have
    /// checked `g` evenly divides all of them.
    pub fn div_to_self(&mut self, g: i64) {
        self.base /= g;
        for s in &mut self.args {
            s.scale /= g;
        }
    }

    /// Rebuild with every split's `dtype` set to `to`, leaving the
    /// index subexpressions untouched — a coarse stand-in for pushing a
    /// widening `Cast` down to the leaves.
    pub fn retagged(&self, to: DType) -> SumExpr {
        SumExpr {
            dtype: to,
            base: self.base,
            args: self.args.iter().map(|s| SplitExpr { dtype: to, ..s.clone() }).collect(),
        }
    }

    /// `gcd(base, scale_0, .., scale_{n-1})` over every arg, used by the
    /// `LT` rewrite in §4.G. Must fold over *all* scales, including ones
    /// equal to 1: skipping those would let `div_to_self` truncate a
    /// unit-scale term to zero instead of leaving the whole sum alone.
    pub fn scale_gcd(&self) -> i64 {
        self.args.iter().fold(self.base.abs(), |acc, s| gcd(acc, s.scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::expr::VarId;

    #[test]
    fn add_to_self_merges_matching_run() {
        let x = Expr::var(VarId(0), "x", DType::I32);
        let mut sum = SumExpr::single(SplitExpr::identity(x.clone(), DType::I32, DivMode::TruncDiv));
        let other = SplitExpr::identity(x, DType::I32, DivMode::TruncDiv);
        sum.add_to_self(&other, 1);
        assert_eq!(sum.args.len(), 1);
        assert_eq!(sum.args[0].scale, 2);
    }

    #[test]
    fn add_to_self_drops_cancelled_term() {
        let x = Expr::var(VarId(0), "x", DType::I32);
        let mut sum = SumExpr::single(SplitExpr::identity(x.clone(), DType::I32, DivMode::TruncDiv));
        let other = SplitExpr::identity(x, DType::I32, DivMode::TruncDiv);
        sum.add_to_self(&other, -1);
        assert!(sum.args.is_empty());
    }
}
