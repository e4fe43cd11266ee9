//! Component H: the `Analyzer` façade — routes `bind`/`simplify`/
//! `can_prove*` across the five sub-analyzers and manages scoped
//! `ConstraintContext`s.

use crate::config::AnalyzerConfig;
use crate::domain::expr::{Expr, ExprKind, VarId};
use crate::domain::mutator_with_analyzer::MutatorWithAnalyzer;
use crate::domain::visitor::ExprMutator;
use crate::errors::Result;
use crate::features::canonical_simplifier::CanonicalSimplifier;
use crate::features::const_int_bound::{ConstIntBoundAnalyzer, ConstIntBoundEntry, ConstIntBoundMark};
use crate::features::modular_set::{ModularSetAnalyzer, ModularSetEntry, ModularSetMark};
use crate::features::rewrite_simplifier::{Limits, RewriteSimplifier, RewriteSimplifierMark};
use crate::features::transitive_comparisons::{TransitiveComparisonAnalyzer, TransitiveComparisonsMark};
use crate::shared::{inf_aware_add, inf_aware_sub, CompareResult, DType, NEG_INF, POS_INF};

/// What to bind a variable to: an exact value, or a half-open range
/// `[min, min+extent)`. `Range { extent: 1, .. }` degenerates to
/// binding the exact `min` value (§4.H).
pub enum BindValue {
    Value(Expr),
    Range { min: Expr, extent: Expr },
}

/// `can_prove` strength (§4.H). `SymbolicBound` additionally tries to
/// reduce an unresolved comparison to a positive-difference bound
/// obligation before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProveStrength {
    Default,
    SymbolicBound,
}

/// Opaque token returned by `enter_constraint`, covering every
/// sub-analyzer's own mark. `IntervalSet` has no entry here: its
/// bounds are derived on demand from `ConstIntBound` rather than kept
/// as separate pushed state (see DESIGN.md).
pub struct ConstraintMark {
    const_bound: ConstIntBoundMark,
    modular: ModularSetMark,
    rewrite: RewriteSimplifierMark,
    transitive: TransitiveComparisonsMark,
}

pub struct Analyzer {
    const_bound: ConstIntBoundAnalyzer,
    modular: ModularSetAnalyzer,
    rewrite: RewriteSimplifier,
    canonical: CanonicalSimplifier,
    transitive: TransitiveComparisonAnalyzer,
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::with_config(AnalyzerConfig::default())
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        let limits = Limits {
            recursion_limit: config.rewrite_recursion_limit,
            max_rewrite_steps: config.max_rewrite_steps,
        };
        Self {
            const_bound: ConstIntBoundAnalyzer::new(),
            modular: ModularSetAnalyzer::new(),
            rewrite: RewriteSimplifier::new(config.extensions, limits),
            canonical: CanonicalSimplifier::new(),
            transitive: TransitiveComparisonAnalyzer::new(),
            config,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    // ---- binding -------------------------------------------------

    pub fn bind(&mut self, var: VarId, dtype: DType, value: BindValue, allow_override: bool) -> Result<()> {
        match value {
            BindValue::Value(e) => self.bind_value(var, dtype, &e, allow_override),
            BindValue::Range { min, extent } => {
                if extent.as_int_imm() == Some(1) {
                    return self.bind_value(var, dtype, &min, allow_override);
                }
                self.bind_range(var, dtype, &min, &extent, allow_override)
            }
        }
    }

    fn bind_value(&mut self, var: VarId, dtype: DType, value: &Expr, allow_override: bool) -> Result<()> {
        let simplified = self.simplify(value);
        tracing::trace!(?var, "bind_value");
        let bound = self.const_bound.query(&simplified);
        self.const_bound.update(var, bound, allow_override)?;
        let modular = self.modular.query(&simplified);
        self.modular.update(var, modular, allow_override)?;
        self.rewrite.update(var, &simplified, allow_override);
        self.transitive.bind_expr(var, dtype, &simplified);
        Ok(())
    }

    fn bind_range(&mut self, var: VarId, dtype: DType, min: &Expr, extent: &Expr, allow_override: bool) -> Result<()> {
        let min_s = self.simplify(min);
        let extent_s = self.simplify(extent);
        let min_c = min_s.as_int_imm().unwrap_or(NEG_INF);
        let max_c = match extent_s.as_int_imm() {
            Some(ext) => inf_aware_add(min_c, inf_aware_add(ext, -1)),
            None => POS_INF,
        };
        self.const_bound.update(var, ConstIntBoundEntry::new(min_c, max_c), allow_override)?;
        self.modular.update(var, ModularSetEntry::everything(), allow_override)?;
        self.transitive.bind_range(var, dtype, &min_s, &extent_s);
        Ok(())
    }

    /// Called by `MutatorWithAnalyzer` for `Let` bindings: binds the
    /// already-simplified value without touching `TransitiveComparisons`
    /// bookkeeping beyond an equality edge.
    pub fn bind_expr(&mut self, var: VarId, value: &Expr, allow_override: bool) {
        let bound = self.const_bound.query(value);
        let _ = self.const_bound.update(var, bound, allow_override);
        let modular = self.modular.query(value);
        let _ = self.modular.update(var, modular, allow_override);
        self.rewrite.update(var, value, allow_override);
        self.transitive.bind_expr(var, value.dtype(), value);
    }

    /// Decomposes `expr` into `symbol * c + offset`; when `c > 0` and
    /// `symbol` is a single `Var`, installs `symbol >= -offset`.
    pub fn mark_global_non_neg(&mut self, expr: &Expr) -> Result<()> {
        if let (Some(sym), c, offset) = decompose_symbol_scale_offset(expr) {
            if c > 0 {
                if let Some(var) = sym.as_var() {
                    let current = self.const_bound.query(&sym);
                    let merged = current.intersect(&ConstIntBoundEntry::new(-offset, POS_INF));
                    self.const_bound.update(var, merged, true)?;
                }
            }
        }
        Ok(())
    }

    // ---- constraint contexts --------------------------------------

    /// Installs `cond` as a scoped hypothesis on every sub-analyzer, in
    /// the order ConstIntBound, ModularSet, RewriteSimplifier,
    /// TransitiveComparisons (§4.H's ordering, minus the folded-in
    /// IntervalSet step).
    pub fn enter_constraint(&mut self, cond: &Expr) -> ConstraintMark {
        tracing::trace!(?cond, "enter_constraint");
        let const_bound = self.const_bound.enter_constraint(cond);
        let modular = self.modular.enter_constraint(cond);
        let rewrite = self.rewrite.enter_constraint(cond);
        let transitive = self.transitive.enter_constraint(cond);
        ConstraintMark { const_bound, modular, rewrite, transitive }
    }

    /// Releases in reverse order of `enter_constraint`.
    pub fn leave_constraint(&mut self, mark: ConstraintMark) {
        tracing::trace!("leave_constraint");
        self.transitive.leave_constraint(mark.transitive);
        self.rewrite.leave_constraint(mark.rewrite);
        self.modular.leave_constraint(mark.modular);
        self.const_bound.leave_constraint(mark.const_bound);
    }

    // ---- queries ---------------------------------------------------

    pub fn query_const_int_bound(&mut self, e: &Expr) -> ConstIntBoundEntry {
        self.const_bound.query(e)
    }

    pub fn query_modular_set(&mut self, e: &Expr) -> ModularSetEntry {
        self.modular.query(e)
    }

    /// `TryCompareUsingConstIntBounds(x, y)`: reduces to a ±∞-aware
    /// bound check on `x - y` (the role the reference assigns to a
    /// separate `IntervalSet`; see DESIGN.md). When `propagate`,
    /// additionally consults `TransitiveComparisons`.
    pub fn try_compare_exprs(&mut self, a: &Expr, b: &Expr, propagate: bool) -> CompareResult {
        if let (Some(x), Some(y)) = (a.as_int_imm(), b.as_int_imm()) {
            return numeric_compare(x, y);
        }
        let mut result = self.try_compare_using_const_int_bound(a, b);
        if propagate {
            result = result.and(self.transitive.try_compare(a, b, true));
        }
        result
    }

    fn try_compare_using_const_int_bound(&mut self, a: &Expr, b: &Expr) -> CompareResult {
        let ba = self.const_bound.query(a);
        let bb = self.const_bound.query(b);
        let min_diff = inf_aware_sub(ba.min, bb.max);
        let max_diff = inf_aware_sub(ba.max, bb.min);
        if max_diff < 0 {
            CompareResult::LT
        } else if min_diff > 0 {
            CompareResult::GT
        } else if max_diff == 0 && min_diff == 0 {
            CompareResult::EQ
        } else if max_diff == 0 {
            CompareResult::LE
        } else if min_diff == 0 {
            CompareResult::GE
        } else {
            CompareResult::UNKNOWN
        }
    }

    // ---- simplification ---------------------------------------------

    /// One bottom-up pass of `RewriteSimplifier` rules over the whole
    /// tree, skipping `CanonicalSimplifier`.
    pub fn simplify_rewrite_only(&mut self, e: &Expr) -> Expr {
        let mut mutator = MutatorWithAnalyzer::new(self);
        mutator.mutate(e)
    }

    /// `RewriteSimplifier::apply_node_rules` on a single already-built
    /// node, called by `MutatorWithAnalyzer` after it rebuilds a node
    /// from already-mutated children. Uses `mem::take` so the borrow of
    /// `self.rewrite` doesn't overlap with passing `self` in as the
    /// `analyzer` argument.
    pub fn rewrite_postprocess(&mut self, e: &Expr) -> Expr {
        let mut rw = std::mem::take(&mut self.rewrite);
        let r = rw.apply_node_rules(self, e, 0);
        self.rewrite = rw;
        r
    }

    fn canonical_simplify(&mut self, e: &Expr) -> Expr {
        let mut cs = std::mem::take(&mut self.canonical);
        let r = cs.canonical_mutate(self, e);
        self.canonical = cs;
        r
    }

    /// Alternates `CanonicalSimplifier` and `RewriteSimplifier` passes
    /// for `config.simplify_steps` rounds, or until a round is a no-op.
    pub fn simplify(&mut self, e: &Expr) -> Expr {
        tracing::debug!(?e, steps = self.config.simplify_steps, "simplify");
        let mut cur = e.clone();
        for _ in 0..self.config.simplify_steps.max(1) {
            let canon = self.canonical_simplify(&cur);
            let rewritten = self.simplify_rewrite_only(&canon);
            if rewritten.structurally_eq(&cur) {
                cur = rewritten;
                break;
            }
            cur = rewritten;
        }
        tracing::trace!(result = ?cur, "simplify:done");
        cur
    }

    // ---- can_prove family --------------------------------------------

    pub fn can_prove_equal(&mut self, lhs: &Expr, rhs: &Expr) -> bool {
        if let (Some(a), Some(b)) = (lhs.as_int_imm(), rhs.as_int_imm()) {
            return a == b;
        }
        let diff = Expr::new(lhs.dtype(), ExprKind::Sub(lhs.clone(), rhs.clone()));
        let cond = Expr::new(DType::BOOL, ExprKind::Eq(diff, Expr::int_imm(lhs.dtype(), 0)));
        self.can_prove(&cond, ProveStrength::Default)
    }

    pub fn can_prove_greater_equal(&mut self, lhs: &Expr, rhs: &Expr) -> bool {
        let cond = Expr::new(DType::BOOL, ExprKind::Ge(lhs.clone(), rhs.clone()));
        self.can_prove(&cond, ProveStrength::SymbolicBound)
    }

    pub fn can_prove_less(&mut self, lhs: &Expr, rhs: &Expr) -> bool {
        let cond = Expr::new(DType::BOOL, ExprKind::Lt(lhs.clone(), rhs.clone()));
        self.can_prove(&cond, ProveStrength::SymbolicBound)
    }

    /// First tries `SymbolicBound`; if `shape` isn't a constant, peels
    /// its constant multiplicative factor (`UnpackReduction<Mul>`) and
    /// retries against that factor's absolute value.
    pub fn can_prove_less_equal_than_symbolic_shape_value(&mut self, lhs: &Expr, shape: &Expr) -> bool {
        let cond = Expr::new(DType::BOOL, ExprKind::Le(lhs.clone(), shape.clone()));
        if self.can_prove(&cond, ProveStrength::SymbolicBound) {
            return true;
        }
        if shape.as_int_imm().is_some() {
            return false;
        }
        if let Some(c) = extract_mul_constant_factor(shape) {
            let bound = Expr::new(DType::BOOL, ExprKind::Le(lhs.clone(), Expr::int_imm(lhs.dtype(), c.abs())));
            return self.can_prove(&bound, ProveStrength::SymbolicBound);
        }
        false
    }

    pub fn can_prove(&mut self, cond: &Expr, strength: ProveStrength) -> bool {
        tracing::debug!(?cond, ?strength, "can_prove");
        if let Some(c) = cond.as_int_imm() {
            return c != 0;
        }
        let simplified = self.simplify(cond);
        if let Some(c) = simplified.as_int_imm() {
            return c != 0;
        }
        if strength == ProveStrength::SymbolicBound {
            if let Some(result) = self.can_prove_symbolic_bound(&simplified) {
                return result;
            }
        }
        false
    }

    /// Matches `lhs < rhs`, `lhs <= rhs`, `lhs > rhs`, `lhs >= rhs`,
    /// reduces to a positive-difference (`rhs - lhs` / `lhs - rhs`)
    /// proof obligation, and accepts when the difference's lower bound
    /// meets the required threshold (1 for strict, 0 otherwise).
    fn can_prove_symbolic_bound(&mut self, cond: &Expr) -> Option<bool> {
        let (small, big, strict) = match cond.kind() {
            ExprKind::Lt(a, b) => (a.clone(), b.clone(), true),
            ExprKind::Le(a, b) => (a.clone(), b.clone(), false),
            ExprKind::Gt(a, b) => (b.clone(), a.clone(), true),
            ExprKind::Ge(a, b) => (b.clone(), a.clone(), false),
            _ => return None,
        };
        let positive_diff = Expr::new(big.dtype(), ExprKind::Sub(big, small));
        let bound = self.const_bound.query(&positive_diff);
        let threshold = if strict { 1 } else { 0 };
        Some(bound.min >= threshold)
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn numeric_compare(a: i64, b: i64) -> CompareResult {
    match a.cmp(&b) {
        std::cmp::Ordering::Less => CompareResult::LT,
        std::cmp::Ordering::Equal => CompareResult::EQ,
        std::cmp::Ordering::Greater => CompareResult::GT,
    }
}

/// Decomposes a purely additive/multiplicative expression into
/// `(symbol, c, offset)` such that `expr == symbol * c + offset`, where
/// `symbol` is a single `Var`. Returns `(None, 0, 0)` when the shape
/// doesn't match.
fn decompose_symbol_scale_offset(e: &Expr) -> (Option<Expr>, i64, i64) {
    match e.kind() {
        ExprKind::Add(a, b) => {
            if let Some(c) = b.as_int_imm() {
                let (sym, coeff, off) = decompose_symbol_scale_offset(a);
                return (sym, coeff, off + c);
            }
            if let Some(c) = a.as_int_imm() {
                let (sym, coeff, off) = decompose_symbol_scale_offset(b);
                return (sym, coeff, off + c);
            }
            (None, 0, 0)
        }
        ExprKind::Sub(a, b) => {
            if let Some(c) = b.as_int_imm() {
                let (sym, coeff, off) = decompose_symbol_scale_offset(a);
                return (sym, coeff, off - c);
            }
            (None, 0, 0)
        }
        ExprKind::Mul(a, b) => {
            if a.as_var().is_some() {
                if let Some(c) = b.as_int_imm() {
                    return (Some(a.clone()), c, 0);
                }
            }
            if b.as_var().is_some() {
                if let Some(c) = a.as_int_imm() {
                    return (Some(b.clone()), c, 0);
                }
            }
            (None, 0, 0)
        }
        ExprKind::Var(..) => (Some(e.clone()), 1, 0),
        _ => (None, 0, 0),
    }
}

/// `UnpackReduction<Mul>`: peels nested `Mul` nodes to find a single
/// constant factor, e.g. `a * 4 * b` -> `Some(4)`.
fn extract_mul_constant_factor(e: &Expr) -> Option<i64> {
    match e.kind() {
        ExprKind::Mul(a, b) => {
            if let Some(c) = b.as_int_imm() {
                return Some(c);
            }
            if let Some(c) = a.as_int_imm() {
                return Some(c);
            }
            extract_mul_constant_factor(a).or_else(|| extract_mul_constant_factor(b))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::expr::VarId;

    #[test]
    fn bind_range_then_prove_upper_bound() {
        let mut a = Analyzer::new();
        let n = Expr::var(VarId(0), "n", DType::I32);
        a.bind(
            VarId(0),
            DType::I32,
            BindValue::Range { min: Expr::int_imm(DType::I32, 0), extent: Expr::int_imm(DType::I32, 32) },
            false,
        )
        .unwrap();
        let cond = Expr::new(
            DType::BOOL,
            ExprKind::Le(
                Expr::new(DType::I32, ExprKind::Add(n.clone(), Expr::int_imm(DType::I32, 1))),
                Expr::int_imm(DType::I32, 32),
            ),
        );
        let simplified = a.simplify(&cond);
        assert_eq!(simplified.as_int_imm(), Some(1));
    }

    #[test]
    fn can_prove_equal_const() {
        let mut a = Analyzer::new();
        assert!(a.can_prove_equal(&Expr::int_imm(DType::I32, 4), &Expr::int_imm(DType::I32, 4)));
        assert!(!a.can_prove_equal(&Expr::int_imm(DType::I32, 4), &Expr::int_imm(DType::I32, 5)));
    }
}
