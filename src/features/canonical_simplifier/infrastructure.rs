//! `CanonicalSimplifier`: Add/Sub/Mul/Div/Mod/Cast/Lt normalization via
//! the sum-of-split canonical form (§4.G).

use super::domain::{SplitExpr, SumExpr};
use crate::analyzer::Analyzer;
use crate::domain::expr::{Expr, ExprKind};
use crate::shared::DivMode;

#[derive(Debug, Default)]
pub struct CanonicalSimplifier {
    pub rewrites_performed: u64,
}

impl CanonicalSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn canonical_mutate(&mut self, analyzer: &mut Analyzer, e: &Expr) -> Expr {
        use ExprKind::*;
        match e.kind() {
            Add(a, b) => self.canonical_add(analyzer, a, b, 1),
            Sub(a, b) => self.canonical_add(analyzer, a, b, -1),
            Mul(a, b) => self.canonical_mul(analyzer, a, b),
            Div(a, b) => self.canonical_div_mod(analyzer, a, b, e.dtype(), DivMode::TruncDiv, false),
            FloorDiv(a, b) => self.canonical_div_mod(analyzer, a, b, e.dtype(), DivMode::FloorDiv, false),
            Mod(a, b) => self.canonical_div_mod(analyzer, a, b, e.dtype(), DivMode::TruncDiv, true),
            FloorMod(a, b) => self.canonical_div_mod(analyzer, a, b, e.dtype(), DivMode::FloorDiv, true),
            Cast(to, x) => self.canonical_cast(analyzer, *to, x),
            Lt(a, b) => self.canonical_lt(analyzer, a, b, e.dtype()),
            _ => analyzer.simplify_rewrite_only(e),
        }
    }

    fn canonical_add(&mut self, analyzer: &mut Analyzer, a: &Expr, b: &Expr, sign: i64) -> Expr {
        let ca = self.canonical_mutate(analyzer, a);
        let cb = self.canonical_mutate(analyzer, b);
        let mut sum = to_sum(&ca);
        let other = to_sum(&cb);
        sum.base += sign * other.base;
        for term in &other.args {
            sum.add_to_self(term, sign);
        }
        self.rewrites_performed += 1;
        sum.to_expr()
    }

    fn canonical_mul(&mut self, analyzer: &mut Analyzer, a: &Expr, b: &Expr) -> Expr {
        let ca = self.canonical_mutate(analyzer, a);
        let cb = self.canonical_mutate(analyzer, b);
        if let Some(c) = cb.as_int_imm() {
            let mut sum = to_sum(&ca);
            sum.mul_to_self(c);
            self.rewrites_performed += 1;
            return sum.to_expr();
        }
        if let Some(c) = ca.as_int_imm() {
            let mut sum = to_sum(&cb);
            sum.mul_to_self(c);
            self.rewrites_performed += 1;
            return sum.to_expr();
        }
        analyzer.simplify_rewrite_only(&Expr::new(ca.dtype(), ExprKind::Mul(ca, cb)))
    }

    /// `SplitDivConst`/`SplitModConst`: when `a` canonicalizes to a
    /// single split term `(index, lf, uf, 1) * 1` that evenly divides
    /// further by the constant `c`, fold the division/modulo into the
    /// split's own factors instead of wrapping a new `Div`/`Mod` node.
    /// Otherwise try `DistributeDivModOverSum`: peel off every term whose
    /// scale is an exact multiple of `c` (division of those is always
    /// exact, with zero remainder, regardless of sign) and recurse on the
    /// rest. `FloorDiv`/`FloorMod` distribute this way unconditionally;
    /// `Div`/`Mod` (truncating) only once the whole dividend is proven
    /// non-negative, where truncation and flooring coincide.
    fn canonical_div_mod(&mut self, analyzer: &mut Analyzer, a: &Expr, b: &Expr, dtype: crate::shared::DType, mode: DivMode, want_mod: bool) -> Expr {
        let ca = self.canonical_mutate(analyzer, a);
        let cb = self.canonical_mutate(analyzer, b);
        let Some(c) = cb.as_int_imm() else {
            return self.rebuild_div_mod(analyzer, ca, cb, dtype, mode, want_mod);
        };
        if c <= 0 {
            return self.rebuild_div_mod(analyzer, ca, cb, dtype, mode, want_mod);
        }
        let sum = to_sum(&ca);
        if sum.args.len() == 1 && sum.args[0].scale == 1 && sum.base == 0 && sum.args[0].div_mode_compatible_to(mode) {
            let split = &sum.args[0];
            if split.upper_factor == crate::shared::POS_INF || split.upper_factor % (split.lower_factor * c) == 0 {
                self.rewrites_performed += 1;
                return if want_mod {
                    SplitExpr::new(dtype, split.index.clone(), split.lower_factor, split.lower_factor * c, 1, mode).to_expr()
                } else {
                    SplitExpr::new(dtype, split.index.clone(), split.lower_factor * c, split.upper_factor, 1, mode).to_expr()
                };
            }
        }

        let (exact, residual): (Vec<SplitExpr>, Vec<SplitExpr>) = sum.args.iter().cloned().partition(|s| s.scale % c == 0);
        if !exact.is_empty() {
            let effective_mode = if mode == DivMode::TruncDiv && analyzer.query_const_int_bound(&ca).min >= 0 {
                DivMode::FloorDiv
            } else {
                mode
            };
            if effective_mode == DivMode::FloorDiv {
                let quotient = SumExpr {
                    dtype,
                    base: sum.base.div_euclid(c),
                    args: exact.iter().map(|s| SplitExpr { scale: s.scale / c, ..s.clone() }).collect(),
                };
                let leftover = SumExpr { dtype, base: sum.base.rem_euclid(c), args: residual };
                self.rewrites_performed += 1;
                let leftover_expr = leftover.to_expr();
                return if want_mod {
                    self.rebuild_div_mod(analyzer, leftover_expr, cb, dtype, effective_mode, true)
                } else {
                    let div_term = self.rebuild_div_mod(analyzer, leftover_expr, cb, dtype, effective_mode, false);
                    analyzer.simplify_rewrite_only(&Expr::new(dtype, ExprKind::Add(quotient.to_expr(), div_term)))
                };
            }
        }

        self.rebuild_div_mod(analyzer, ca, cb, dtype, mode, want_mod)
    }

    fn rebuild_div_mod(&mut self, analyzer: &mut Analyzer, a: Expr, b: Expr, dtype: crate::shared::DType, mode: DivMode, want_mod: bool) -> Expr {
        let kind = match (mode, want_mod) {
            (DivMode::TruncDiv, false) => ExprKind::Div(a, b),
            (DivMode::TruncDiv, true) => ExprKind::Mod(a, b),
            (DivMode::FloorDiv, false) => ExprKind::FloorDiv(a, b),
            (DivMode::FloorDiv, true) => ExprKind::FloorMod(a, b),
        };
        analyzer.simplify_rewrite_only(&Expr::new(dtype, kind))
    }

    /// `PushCastToChildren`: canonicalize the operand first, then, when
    /// its bound already fits `to`, retag the sum-of-splits form with
    /// `to` directly instead of wrapping a `Cast` node around it.
    fn canonical_cast(&mut self, analyzer: &mut Analyzer, to: crate::shared::DType, x: &Expr) -> Expr {
        let cx = self.canonical_mutate(analyzer, x);
        let bound = analyzer.query_const_int_bound(&cx);
        if bound.fits_in(to) {
            self.rewrites_performed += 1;
            return to_sum(&cx).retagged(to).to_expr();
        }
        Expr::new(to, ExprKind::Cast(to, cx))
    }

    /// Rewrite `a < b` to `a - b < 0`, then factor the common `gcd` of
    /// every term's scale and the base out of the comparison (§4.G):
    /// only applied when the gcd evenly divides the base too, to avoid
    /// the floor-rounding case this simplifier does not model.
    fn canonical_lt(&mut self, analyzer: &mut Analyzer, a: &Expr, b: &Expr, dtype: crate::shared::DType) -> Expr {
        let ca = self.canonical_mutate(analyzer, a);
        let cb = self.canonical_mutate(analyzer, b);
        let mut sum = to_sum(&ca);
        let other = to_sum(&cb);
        sum.base -= other.base;
        for term in &other.args {
            sum.add_to_self(term, -1);
        }
        let g = sum.scale_gcd();
        if g > 1 && sum.base % g == 0 {
            sum.div_to_self(g);
            self.rewrites_performed += 1;
        }
        analyzer.simplify_rewrite_only(&Expr::new(dtype, ExprKind::Lt(sum.to_expr(), Expr::int_imm(ca.dtype(), 0))))
    }
}

fn to_sum(e: &Expr) -> SumExpr {
    use ExprKind::*;
    match e.kind() {
        IntImm(v) => SumExpr::constant(e.dtype(), *v),
        Add(a, b) => {
            let mut sum = to_sum(a);
            let other = to_sum(b);
            sum.base += other.base;
            for term in &other.args {
                sum.add_to_self(term, 1);
            }
            sum
        }
        Sub(a, b) => {
            let mut sum = to_sum(a);
            let other = to_sum(b);
            sum.base -= other.base;
            for term in &other.args {
                sum.add_to_self(term, -1);
            }
            sum
        }
        Mul(a, b) if b.as_int_imm().is_some() => {
            let mut sum = to_sum(a);
            sum.mul_to_self(b.as_int_imm().unwrap());
            sum
        }
        Mul(a, b) if a.as_int_imm().is_some() => {
            let mut sum = to_sum(b);
            sum.mul_to_self(a.as_int_imm().unwrap());
            sum
        }
        _ => SumExpr::single(SplitExpr::identity(e.clone(), e.dtype(), DivMode::TruncDiv)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::domain::expr::VarId;
    use crate::shared::DType;

    #[test]
    fn add_then_sub_same_var_cancels() {
        let mut analyzer = Analyzer::new();
        let x = Expr::var(VarId(0), "x", DType::I32);
        let e = Expr::new(
            DType::I32,
            ExprKind::Sub(
                Expr::new(DType::I32, ExprKind::Add(x.clone(), Expr::int_imm(DType::I32, 3))),
                x,
            ),
        );
        let mut cs = CanonicalSimplifier::new();
        let simplified = cs.canonical_mutate(&mut analyzer, &e);
        assert_eq!(simplified.as_int_imm(), Some(3));
    }
}
