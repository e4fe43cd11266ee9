//! `RewriteSimplifier`: per-node constant folding, literal-constraint
//! lookup, and ordered pattern rewrites (Component F).
//!
//! The engine is invoked bottom-up by `MutatorWithAnalyzer`/`walk_mutate`:
//! by the time `apply_node_rules` sees a node, its children have already
//! been simplified, so every rule here only looks one level deep.

use super::domain::{Extensions, Limits, Stats};
use crate::analyzer::Analyzer;
use crate::domain::expr::{Expr, ExprKind, VarId};
use crate::domain::fold::{self, BinOp};
use crate::domain::pattern::{match_pattern, PExprVar, PIntVar, Pattern, SlotId};
use crate::domain::visitor::{walk_mutate, ExprMutator};
use crate::shared::DType;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy)]
pub struct ScopeMark(usize);

#[derive(Default)]
pub struct RewriteSimplifier {
    var_map: FxHashMap<VarId, Expr>,
    /// `(normalized_condition, truth_value)` pairs installed by
    /// `enter_constraint`; a later query structurally equal to one of
    /// these resolves immediately.
    literal_table: Vec<(Expr, bool)>,
    pub stats: Stats,
    pub extensions: Extensions,
    pub limits: Limits,
}

impl RewriteSimplifier {
    pub fn new(extensions: Extensions, limits: Limits) -> Self {
        Self { extensions, limits, ..Self::default() }
    }

    pub fn update(&mut self, v: VarId, expr: &Expr, _allow_override: bool) {
        self.var_map.insert(v, expr.clone());
    }

    pub fn lookup_var(&self, v: VarId) -> Option<&Expr> {
        self.var_map.get(&v)
    }

    /// Seeds the literal-constraint table with `cond` (true) and its
    /// normalized negation (false).
    pub fn enter_constraint(&mut self, cond: &Expr) -> ScopeMark {
        let mark = ScopeMark(self.literal_table.len());
        self.stats.constraints_entered += 1;
        self.literal_table.push((cond.clone(), true));
        self.literal_table.push((normalize_not(cond), false));
        mark
    }

    pub fn leave_constraint(&mut self, mark: ScopeMark) {
        self.literal_table.truncate(mark.0);
    }

    fn lookup_literal(&self, e: &Expr) -> Option<bool> {
        self.literal_table.iter().rev().find(|(c, _)| c.structurally_eq(e)).map(|(_, v)| *v)
    }

    /// The per-node rule application step. `e`'s children are already
    /// simplified. Bounded re-entry (for rules whose result is itself
    /// rewritable) is capped by `limits.recursion_limit`.
    pub fn apply_node_rules(&mut self, analyzer: &mut Analyzer, e: &Expr, depth: u32) -> Expr {
        self.stats.nodes_visited += 1;
        self.stats.max_recursion_depth = self.stats.max_recursion_depth.max(depth);

        if let Some(limit) = self.limits.max_rewrite_steps {
            if self.stats.rewrites_attempted >= limit {
                return e.clone();
            }
        }

        if let Some(folded) = try_fold_node(e) {
            self.stats.rewrites_performed += 1;
            return folded;
        }

        if is_boolean_valued(e) {
            if let Some(v) = self.lookup_literal(e) {
                self.stats.rewrites_performed += 1;
                return Expr::int_imm(e.dtype(), v as i64);
            }
        }

        self.stats.rewrites_attempted += 1;
        let dtype = e.dtype();
        let rewritten = match e.kind() {
            ExprKind::Add(a, b) => vector_add(a, b, dtype).or_else(|| rewrite_add(a, b, dtype)),
            ExprKind::Sub(a, b) => vector_sub(a, b, dtype).or_else(|| rewrite_sub(a, b, dtype)),
            ExprKind::Mul(a, b) => vector_mul(a, b, dtype).or_else(|| rewrite_mul(a, b, dtype)),
            ExprKind::Div(a, b) | ExprKind::FloorDiv(a, b) => {
                let floor = matches!(e.kind(), ExprKind::FloorDiv(..));
                self.rewrite_div_bound(analyzer, a, b, dtype, floor, false)
                    .or_else(|| rewrite_vector_div(analyzer, a, b, dtype))
                    .or_else(|| rewrite_div(a, b, dtype, floor))
            }
            ExprKind::Mod(a, b) | ExprKind::FloorMod(a, b) => {
                let floor = matches!(e.kind(), ExprKind::FloorMod(..));
                self.rewrite_div_bound(analyzer, a, b, dtype, floor, true).or_else(|| rewrite_mod(a, b, dtype, floor))
            }
            ExprKind::Min(a, b) => self.rewrite_min(analyzer, a, b, dtype),
            ExprKind::Max(a, b) => self.rewrite_max(analyzer, a, b, dtype),
            ExprKind::Eq(a, b) | ExprKind::Ne(a, b) | ExprKind::Lt(a, b) | ExprKind::Le(a, b)
            | ExprKind::Gt(a, b) | ExprKind::Ge(a, b) => self.rewrite_compare(analyzer, e, a, b, dtype),
            ExprKind::Not(a) => rewrite_not(a, dtype),
            ExprKind::And(a, b) => self.rewrite_and(analyzer, a, b, dtype, depth),
            ExprKind::Or(a, b) => rewrite_or(a, b, dtype),
            ExprKind::Select(c, t, f) if t.structurally_eq(f) => Some(t.clone()),
            ExprKind::Select(c, t, f) => collapse_nested_select(c, t, f, dtype),
            ExprKind::Let(v, value, body) => self.inline_let(*v, value, body),
            _ => None,
        };

        match rewritten {
            Some(r) if r.ptr_eq(e) => r,
            Some(r) => {
                self.stats.rewrites_performed += 1;
                tracing::trace!(from = ?e, to = ?r, "rewrite_fired");
                if depth < self.limits.recursion_limit {
                    self.apply_node_rules(analyzer, &r, depth + 1)
                } else {
                    r
                }
            }
            None => e.clone(),
        }
    }

    fn rewrite_min(&mut self, analyzer: &mut Analyzer, a: &Expr, b: &Expr, dtype: DType) -> Option<Expr> {
        if a.structurally_eq(b) {
            return Some(a.clone());
        }
        if let ExprKind::Max(x, y) = b.kind() {
            if x.structurally_eq(a) || y.structurally_eq(a) {
                return Some(a.clone());
            }
        }
        if let ExprKind::Max(x, y) = a.kind() {
            if x.structurally_eq(b) || y.structurally_eq(b) {
                return Some(b.clone());
            }
        }
        let ba = analyzer.query_const_int_bound(a);
        let bb = analyzer.query_const_int_bound(b);
        if !ba.is_everything_bound(a.dtype()) && !bb.is_everything_bound(b.dtype()) && ba.max <= bb.min {
            return Some(a.clone());
        }
        if !ba.is_everything_bound(a.dtype()) && !bb.is_everything_bound(b.dtype()) && bb.max <= ba.min {
            return Some(b.clone());
        }
        let _ = dtype;
        None
    }

    /// When `b` is a positive constant `c` and `a`'s bound already sits
    /// inside `[0, c)`, `a / c` is always `0` and `a % c` is always `a`
    /// itself, regardless of div mode.
    fn rewrite_div_bound(&mut self, analyzer: &mut Analyzer, a: &Expr, b: &Expr, dtype: DType, _floor: bool, want_mod: bool) -> Option<Expr> {
        let c = b.as_int_imm()?;
        if c <= 0 {
            return None;
        }
        let ba = analyzer.query_const_int_bound(a);
        if ba.min >= 0 && ba.max < c {
            return Some(if want_mod { a.clone() } else { Expr::int_imm(dtype, 0) });
        }
        None
    }

    fn rewrite_max(&mut self, analyzer: &mut Analyzer, a: &Expr, b: &Expr, dtype: DType) -> Option<Expr> {
        if a.structurally_eq(b) {
            return Some(a.clone());
        }
        if let ExprKind::Min(x, y) = b.kind() {
            if x.structurally_eq(a) || y.structurally_eq(a) {
                return Some(a.clone());
            }
        }
        if let ExprKind::Min(x, y) = a.kind() {
            if x.structurally_eq(b) || y.structurally_eq(b) {
                return Some(b.clone());
            }
        }
        let ba = analyzer.query_const_int_bound(a);
        let bb = analyzer.query_const_int_bound(b);
        if !ba.is_everything_bound(a.dtype()) && !bb.is_everything_bound(b.dtype()) && bb.max <= ba.min {
            return Some(a.clone());
        }
        if !ba.is_everything_bound(a.dtype()) && !bb.is_everything_bound(b.dtype()) && ba.max <= bb.min {
            return Some(b.clone());
        }
        let _ = dtype;
        None
    }

    fn rewrite_compare(
        &mut self,
        analyzer: &mut Analyzer,
        e: &Expr,
        a: &Expr,
        b: &Expr,
        dtype: DType,
    ) -> Option<Expr> {
        // Canonicalize constant placement: a' + c1 OP c2 -> a' OP (c2 - c1).
        if let ExprKind::Add(inner, c1) = a.kind() {
            if let (Some(c1), Some(c2)) = (c1.as_int_imm(), b.as_int_imm()) {
                let rhs = Expr::int_imm(b.dtype(), c2 - c1);
                return Some(rebuild_compare(e, inner.clone(), rhs, dtype));
            }
        }
        if let Some(r) = try_scaled_compare(e, a, b, dtype) {
            return Some(r);
        }
        if let Some(r) = self.try_modular_gcd_cancel(analyzer, e, a, b, dtype) {
            return Some(r);
        }
        let cmp = analyzer.try_compare_exprs(a, b, self.extensions.transitively_prove_inequalities);
        let target = match e.kind() {
            ExprKind::Eq(..) => crate::shared::CompareResult::EQ,
            ExprKind::Ne(..) => crate::shared::CompareResult::NE,
            ExprKind::Lt(..) => crate::shared::CompareResult::LT,
            ExprKind::Le(..) => crate::shared::CompareResult::LE,
            ExprKind::Gt(..) => crate::shared::CompareResult::GT,
            ExprKind::Ge(..) => crate::shared::CompareResult::GE,
            _ => return None,
        };
        if cmp.implies_true(target) {
            return Some(Expr::int_imm(dtype, 1));
        }
        if cmp.and(target).is_inconsistent() && !cmp.is_inconsistent() {
            return Some(Expr::int_imm(dtype, 0));
        }
        if self.extensions.comparison_of_product_and_sum {
            if let Some(r) = try_prove_product_and_sum(analyzer, e) {
                return Some(Expr::int_imm(dtype, r as i64));
            }
        }
        None
    }

    /// Short-circuits `a == c2`/`a != c2` to a constant when `a`'s modular
    /// residue set proves `c2` is unreachable, e.g. `a` known `4k+1` and
    /// `c2 = 6` can never hold. Distinct from `canonical_lt`'s
    /// `SumExpr::scale_gcd`, which only fires on the sum-of-splits form
    /// `CanonicalSimplifier` builds for `Lt`; this works on any `a` the
    /// `ModularSet` lattice can characterize.
    fn try_modular_gcd_cancel(
        &mut self,
        analyzer: &mut Analyzer,
        e: &Expr,
        a: &Expr,
        b: &Expr,
        dtype: DType,
    ) -> Option<Expr> {
        if !matches!(e.kind(), ExprKind::Eq(..) | ExprKind::Ne(..)) {
            return None;
        }
        let c2 = b.as_int_imm()?;
        let ms = analyzer.query_modular_set(a);
        let unreachable = if ms.coeff == 0 {
            ms.base != c2
        } else {
            (c2 - ms.base).rem_euclid(ms.coeff) != 0
        };
        if !unreachable {
            return None;
        }
        let is_eq = matches!(e.kind(), ExprKind::Eq(..));
        Some(Expr::int_imm(dtype, (!is_eq) as i64))
    }

    fn rewrite_and(
        &mut self,
        analyzer: &mut Analyzer,
        a: &Expr,
        b: &Expr,
        dtype: DType,
        depth: u32,
    ) -> Option<Expr> {
        if a.as_int_imm() == Some(0) || b.as_int_imm() == Some(0) {
            return Some(Expr::int_imm(dtype, 0));
        }
        if a.as_int_imm().is_some_and(|v| v != 0) {
            return Some(b.clone());
        }
        if b.as_int_imm().is_some_and(|v| v != 0) {
            return Some(a.clone());
        }
        if let ExprKind::And(inner_a, inner_b) = a.kind() {
            // (x && y) && z -> x && (y && z)
            let rhs = Expr::new(dtype, ExprKind::And(inner_b.clone(), b.clone()));
            return Some(Expr::new(dtype, ExprKind::And(inner_a.clone(), rhs)));
        }
        if self.extensions.apply_constraints_to_boolean_branches && depth < self.limits.recursion_limit {
            let mut cur_a = a.clone();
            let mut cur_b = b.clone();
            let mut no_change_passes = 0;
            for _ in 0..4 {
                let mark = analyzer.enter_constraint(&cur_b);
                let new_a = analyzer.simplify_rewrite_only(&cur_a);
                analyzer.leave_constraint(mark);
                let mark = analyzer.enter_constraint(&new_a);
                let new_b = analyzer.simplify_rewrite_only(&cur_b);
                analyzer.leave_constraint(mark);
                let changed = !new_a.ptr_eq(&cur_a) || !new_b.ptr_eq(&cur_b);
                cur_a = new_a;
                cur_b = new_b;
                if !changed {
                    no_change_passes += 1;
                    if no_change_passes >= 2 {
                        break;
                    }
                } else {
                    no_change_passes = 0;
                }
            }
            if !cur_a.ptr_eq(a) || !cur_b.ptr_eq(b) {
                return Some(Expr::new(dtype, ExprKind::And(cur_a, cur_b)));
            }
        }
        None
    }

    fn inline_let(&mut self, v: VarId, value: &Expr, body: &Expr) -> Option<Expr> {
        if value.as_int_imm().is_some() || value.as_var().is_some() {
            let mut subst = Substitute { var: v, value: value.clone() };
            return Some(subst.mutate(body));
        }
        None
    }
}

/// Replaces every occurrence of `var` with `value`.
struct Substitute {
    var: VarId,
    value: Expr,
}

impl ExprMutator for Substitute {
    fn mutate(&mut self, e: &Expr) -> Expr {
        if e.as_var() == Some(self.var) {
            return self.value.clone();
        }
        walk_mutate(self, e)
    }
}

fn is_boolean_valued(e: &Expr) -> bool {
    matches!(
        e.kind(),
        ExprKind::Eq(..)
            | ExprKind::Ne(..)
            | ExprKind::Lt(..)
            | ExprKind::Le(..)
            | ExprKind::Gt(..)
            | ExprKind::Ge(..)
            | ExprKind::And(..)
            | ExprKind::Or(..)
            | ExprKind::Not(..)
    )
}

/// Pushes `Not` through `And`/`Or` (De Morgan) and through comparison
/// reversal, recursively, so the literal-constraint table can recognize
/// a later query that's the textual negation of an installed hypothesis.
fn normalize_not(cond: &Expr) -> Expr {
    let dtype = cond.dtype();
    match cond.kind() {
        ExprKind::And(a, b) => {
            Expr::new(dtype, ExprKind::Or(normalize_not(a), normalize_not(b)))
        }
        ExprKind::Or(a, b) => {
            Expr::new(dtype, ExprKind::And(normalize_not(a), normalize_not(b)))
        }
        ExprKind::Not(a) => (**a).clone(),
        ExprKind::Eq(a, b) => Expr::new(dtype, ExprKind::Ne(a.clone(), b.clone())),
        ExprKind::Ne(a, b) => Expr::new(dtype, ExprKind::Eq(a.clone(), b.clone())),
        ExprKind::Lt(a, b) => Expr::new(dtype, ExprKind::Ge(a.clone(), b.clone())),
        ExprKind::Le(a, b) => Expr::new(dtype, ExprKind::Gt(a.clone(), b.clone())),
        ExprKind::Gt(a, b) => Expr::new(dtype, ExprKind::Le(a.clone(), b.clone())),
        ExprKind::Ge(a, b) => Expr::new(dtype, ExprKind::Lt(a.clone(), b.clone())),
        _ => Expr::new(dtype, ExprKind::Not(cond.clone())),
    }
}

fn try_fold_node(e: &Expr) -> Option<Expr> {
    use ExprKind::*;
    match e.kind() {
        Add(a, b) => fold::try_const_fold_binary(BinOp::Add, e.dtype(), a, b).ok().flatten(),
        Sub(a, b) => fold::try_const_fold_binary(BinOp::Sub, e.dtype(), a, b).ok().flatten(),
        Mul(a, b) => fold::try_const_fold_binary(BinOp::Mul, e.dtype(), a, b).ok().flatten(),
        Div(a, b) => fold::try_const_fold_binary(BinOp::TruncDiv, e.dtype(), a, b).ok().flatten(),
        Mod(a, b) => fold::try_const_fold_binary(BinOp::TruncMod, e.dtype(), a, b).ok().flatten(),
        FloorDiv(a, b) => fold::try_const_fold_binary(BinOp::FloorDiv, e.dtype(), a, b).ok().flatten(),
        FloorMod(a, b) => fold::try_const_fold_binary(BinOp::FloorMod, e.dtype(), a, b).ok().flatten(),
        Min(a, b) => fold::try_const_fold_binary(BinOp::Min, e.dtype(), a, b).ok().flatten(),
        Max(a, b) => fold::try_const_fold_binary(BinOp::Max, e.dtype(), a, b).ok().flatten(),
        Eq(a, b) => fold::try_const_fold_binary(BinOp::Eq, e.dtype(), a, b).ok().flatten(),
        Ne(a, b) => fold::try_const_fold_binary(BinOp::Ne, e.dtype(), a, b).ok().flatten(),
        Lt(a, b) => fold::try_const_fold_binary(BinOp::Lt, e.dtype(), a, b).ok().flatten(),
        Le(a, b) => fold::try_const_fold_binary(BinOp::Le, e.dtype(), a, b).ok().flatten(),
        Gt(a, b) => fold::try_const_fold_binary(BinOp::Gt, e.dtype(), a, b).ok().flatten(),
        Ge(a, b) => fold::try_const_fold_binary(BinOp::Ge, e.dtype(), a, b).ok().flatten(),
        And(a, b) => fold::try_const_fold_binary(BinOp::And, e.dtype(), a, b).ok().flatten(),
        Or(a, b) => fold::try_const_fold_binary(BinOp::Or, e.dtype(), a, b).ok().flatten(),
        Not(a) => fold::try_const_fold_not(e.dtype(), a),
        Cast(to, x) => fold::try_const_fold_cast(*to, x),
        Call(op, args) => fold::try_const_fold_call(*op, e.dtype(), args).ok().flatten(),
        Select(c, t, f) => fold::try_const_fold_select(c, t, f),
        _ => None,
    }
}

fn rewrite_add(a: &Expr, b: &Expr, dtype: DType) -> Option<Expr> {
    if a.as_int_imm() == Some(0) {
        return Some(b.clone());
    }
    if b.as_int_imm() == Some(0) {
        return Some(a.clone());
    }
    if a.structurally_eq(b) {
        return Some(Expr::new(dtype, ExprKind::Mul(a.clone(), Expr::int_imm(dtype, 2))));
    }
    // (x - y) + y -> x
    if let ExprKind::Sub(x, y) = a.kind() {
        if y.structurally_eq(b) {
            return Some(x.clone());
        }
    }
    if let ExprKind::Sub(x, y) = b.kind() {
        if y.structurally_eq(a) {
            return Some(x.clone());
        }
    }
    // (x+c1)+c2 -> x+(c1+c2)
    if let (ExprKind::Add(x, c1), Some(c2)) = (a.kind(), b.as_int_imm()) {
        if let Some(c1) = c1.as_int_imm() {
            return Some(Expr::new(dtype, ExprKind::Add(x.clone(), Expr::int_imm(dtype, c1 + c2))));
        }
    }
    None
}

fn rewrite_sub(a: &Expr, b: &Expr, dtype: DType) -> Option<Expr> {
    if b.as_int_imm() == Some(0) {
        return Some(a.clone());
    }
    if a.structurally_eq(b) {
        return Some(Expr::int_imm(dtype, 0));
    }
    // (x + y) - y -> x
    if let ExprKind::Add(x, y) = a.kind() {
        if y.structurally_eq(b) {
            return Some(x.clone());
        }
        if x.structurally_eq(b) {
            return Some(y.clone());
        }
    }
    None
}

fn rewrite_mul(a: &Expr, b: &Expr, dtype: DType) -> Option<Expr> {
    if a.as_int_imm() == Some(0) || b.as_int_imm() == Some(0) {
        return Some(Expr::int_imm(dtype, 0));
    }
    if a.as_int_imm() == Some(1) {
        return Some(b.clone());
    }
    if b.as_int_imm() == Some(1) {
        return Some(a.clone());
    }
    // (x*c1)*c2 -> x*(c1*c2)
    if let (ExprKind::Mul(x, c1), Some(c2)) = (a.kind(), b.as_int_imm()) {
        if let Some(c1) = c1.as_int_imm() {
            return Some(Expr::new(dtype, ExprKind::Mul(x.clone(), Expr::int_imm(dtype, c1 * c2))));
        }
    }
    None
}

fn rewrite_div(a: &Expr, b: &Expr, dtype: DType, floor: bool) -> Option<Expr> {
    let c2 = b.as_int_imm()?;
    if c2 <= 0 {
        return None;
    }
    // (a/c1)/c2 -> a/(c1*c2), both positive constants, same div mode.
    let inner_and_c1 = match (floor, a.kind()) {
        (true, ExprKind::FloorDiv(inner, c1)) => Some((inner, c1)),
        (false, ExprKind::Div(inner, c1)) => Some((inner, c1)),
        _ => None,
    };
    let (inner, c1) = inner_and_c1?;
    let c1 = c1.as_int_imm()?;
    if c1 <= 0 {
        return None;
    }
    let merged = Expr::int_imm(dtype, c1 * c2);
    Some(Expr::new(
        dtype,
        if floor { ExprKind::FloorDiv(inner.clone(), merged) } else { ExprKind::Div(inner.clone(), merged) },
    ))
}

fn ceil_div(a: i64, c: i64) -> i64 {
    fold::floor_div(a + c - 1, c)
}

/// `x*c OP c2` with `c > 0` folds to `x OP' threshold` exactly, since `x*c`
/// only ever lands on multiples of `c`: `Lt`/`Ge` round the threshold up,
/// `Le`/`Gt` round it down, `Eq`/`Ne` require `c2` itself be a multiple.
/// Driven by `pattern::Pattern::Mul` rather than a hand-written
/// `ExprKind::Mul` match, matching the slot-capture idiom the rest of the
/// rewrite rules reach for when a single shape needs two bound captures.
fn try_scaled_compare(e: &Expr, a: &Expr, b: &Expr, dtype: DType) -> Option<Expr> {
    let c2 = b.as_int_imm()?;
    let x_slot = PExprVar(SlotId(0));
    let c_slot = PIntVar(SlotId(1));
    let pattern = Pattern::Mul(Box::new(Pattern::PExpr(x_slot)), Box::new(Pattern::PInt(c_slot)));
    let bindings = match_pattern(&pattern, a)?;
    let c = c_slot.eval(&bindings);
    if c <= 0 {
        return None;
    }
    let x = x_slot.eval(&bindings);
    let x_dtype = x.dtype();
    match e.kind() {
        ExprKind::Lt(..) => Some(rebuild_compare(e, x, Expr::int_imm(x_dtype, ceil_div(c2, c)), dtype)),
        ExprKind::Ge(..) => Some(rebuild_compare(e, x, Expr::int_imm(x_dtype, ceil_div(c2, c)), dtype)),
        ExprKind::Le(..) => Some(rebuild_compare(e, x, Expr::int_imm(x_dtype, fold::floor_div(c2, c)), dtype)),
        ExprKind::Gt(..) => Some(rebuild_compare(e, x, Expr::int_imm(x_dtype, fold::floor_div(c2, c)), dtype)),
        ExprKind::Eq(..) | ExprKind::Ne(..) => {
            if c2 % c != 0 {
                let is_eq = matches!(e.kind(), ExprKind::Eq(..));
                return Some(Expr::int_imm(dtype, (!is_eq) as i64));
            }
            Some(rebuild_compare(e, x, Expr::int_imm(x_dtype, c2 / c), dtype))
        }
        _ => None,
    }
}

/// `broadcast(x,L) ⊕ broadcast(y,L) -> broadcast(x⊕y,L)`;
/// `ramp(b,s,L) ⊕ ramp(b',s',L) -> ramp(b⊕b', s⊕s', L)`; a ramp plus/minus
/// a broadcast shifts only the base, since the broadcast contributes the
/// same constant to every lane.
fn vector_add(a: &Expr, b: &Expr, dtype: DType) -> Option<Expr> {
    match (a.kind(), b.kind()) {
        (ExprKind::Broadcast(x, l1), ExprKind::Broadcast(y, l2)) if l1 == l2 => Some(Expr::new(
            dtype,
            ExprKind::Broadcast(Expr::new(x.dtype(), ExprKind::Add(x.clone(), y.clone())), *l1),
        )),
        (ExprKind::Ramp(b1, s1, l1), ExprKind::Ramp(b2, s2, l2)) if l1 == l2 => Some(Expr::new(
            dtype,
            ExprKind::Ramp(
                Expr::new(b1.dtype(), ExprKind::Add(b1.clone(), b2.clone())),
                Expr::new(s1.dtype(), ExprKind::Add(s1.clone(), s2.clone())),
                *l1,
            ),
        )),
        (ExprKind::Ramp(rb, rs, l1), ExprKind::Broadcast(v, l2)) if l1 == l2 => Some(Expr::new(
            dtype,
            ExprKind::Ramp(Expr::new(rb.dtype(), ExprKind::Add(rb.clone(), v.clone())), rs.clone(), *l1),
        )),
        (ExprKind::Broadcast(v, l1), ExprKind::Ramp(rb, rs, l2)) if l1 == l2 => Some(Expr::new(
            dtype,
            ExprKind::Ramp(Expr::new(rb.dtype(), ExprKind::Add(rb.clone(), v.clone())), rs.clone(), *l1),
        )),
        _ => None,
    }
}

fn vector_sub(a: &Expr, b: &Expr, dtype: DType) -> Option<Expr> {
    match (a.kind(), b.kind()) {
        (ExprKind::Broadcast(x, l1), ExprKind::Broadcast(y, l2)) if l1 == l2 => Some(Expr::new(
            dtype,
            ExprKind::Broadcast(Expr::new(x.dtype(), ExprKind::Sub(x.clone(), y.clone())), *l1),
        )),
        (ExprKind::Ramp(b1, s1, l1), ExprKind::Ramp(b2, s2, l2)) if l1 == l2 => Some(Expr::new(
            dtype,
            ExprKind::Ramp(
                Expr::new(b1.dtype(), ExprKind::Sub(b1.clone(), b2.clone())),
                Expr::new(s1.dtype(), ExprKind::Sub(s1.clone(), s2.clone())),
                *l1,
            ),
        )),
        (ExprKind::Ramp(rb, rs, l1), ExprKind::Broadcast(v, l2)) if l1 == l2 => Some(Expr::new(
            dtype,
            ExprKind::Ramp(Expr::new(rb.dtype(), ExprKind::Sub(rb.clone(), v.clone())), rs.clone(), *l1),
        )),
        _ => None,
    }
}

/// `broadcast(x,L) * broadcast(y,L) -> broadcast(x*y,L)`; a ramp scaled by
/// a broadcast distributes over both base and stride, since every lane's
/// value `base + i*stride` scales independently.
fn vector_mul(a: &Expr, b: &Expr, dtype: DType) -> Option<Expr> {
    match (a.kind(), b.kind()) {
        (ExprKind::Broadcast(x, l1), ExprKind::Broadcast(y, l2)) if l1 == l2 => Some(Expr::new(
            dtype,
            ExprKind::Broadcast(Expr::new(x.dtype(), ExprKind::Mul(x.clone(), y.clone())), *l1),
        )),
        (ExprKind::Ramp(rb, rs, l1), ExprKind::Broadcast(v, l2)) if l1 == l2 => Some(Expr::new(
            dtype,
            ExprKind::Ramp(
                Expr::new(rb.dtype(), ExprKind::Mul(rb.clone(), v.clone())),
                Expr::new(rs.dtype(), ExprKind::Mul(rs.clone(), v.clone())),
                *l1,
            ),
        )),
        (ExprKind::Broadcast(v, l1), ExprKind::Ramp(rb, rs, l2)) if l1 == l2 => Some(Expr::new(
            dtype,
            ExprKind::Ramp(
                Expr::new(rb.dtype(), ExprKind::Mul(rb.clone(), v.clone())),
                Expr::new(rs.dtype(), ExprKind::Mul(rs.clone(), v.clone())),
                *l1,
            ),
        )),
        _ => None,
    }
}

/// `ramp(base,stride,L) / broadcast(c,L)` collapses to a single
/// `broadcast(base/c, L)` once `ConstIntBound` proves every lane's value
/// floor-divides to the same quotient (the ramp's endpoints share a
/// quotient bucket under `c`), per the modular-set-detected collapsing
/// rule for vector division.
fn rewrite_vector_div(analyzer: &mut Analyzer, a: &Expr, b: &Expr, dtype: DType) -> Option<Expr> {
    let ExprKind::Ramp(_, _, lanes) = a.kind() else { return None };
    let c = match b.kind() {
        ExprKind::Broadcast(cv, l2) if l2 == lanes => cv.as_int_imm()?,
        _ => return None,
    };
    if c <= 0 {
        return None;
    }
    let bound = analyzer.query_const_int_bound(a);
    if crate::shared::is_neg_inf(bound.min) || crate::shared::is_pos_inf(bound.max) {
        return None;
    }
    let lo = fold::floor_div(bound.min, c);
    if lo != fold::floor_div(bound.max, c) {
        return None;
    }
    Some(Expr::new(
        dtype,
        ExprKind::Broadcast(Expr::int_imm(dtype.with_lanes(1), lo), *lanes),
    ))
}

fn rewrite_mod(a: &Expr, b: &Expr, dtype: DType, floor: bool) -> Option<Expr> {
    let c2 = b.as_int_imm()?;
    // x*c1 mod c2 -> 0 when c2 | c1.
    if let ExprKind::Mul(_, c1) = a.kind() {
        if let Some(c1) = c1.as_int_imm() {
            if c2 != 0 && c1 % c2 == 0 {
                return Some(Expr::int_imm(dtype, 0));
            }
        }
    }
    // trunc mod normalizes negative modulus: x mod c -> x mod (-c) for c < 0.
    if !floor && c2 < 0 {
        return Some(Expr::new(dtype, ExprKind::Mod(a.clone(), Expr::int_imm(dtype, -c2))));
    }
    None
}

fn rewrite_not(a: &Expr, _dtype: DType) -> Option<Expr> {
    match a.kind() {
        ExprKind::Not(inner) => Some((**inner).clone()),
        ExprKind::And(..)
        | ExprKind::Or(..)
        | ExprKind::Eq(..)
        | ExprKind::Ne(..)
        | ExprKind::Lt(..)
        | ExprKind::Le(..)
        | ExprKind::Gt(..)
        | ExprKind::Ge(..) => Some(normalize_not(a)),
        _ => None,
    }
}

fn rewrite_or(a: &Expr, b: &Expr, dtype: DType) -> Option<Expr> {
    if a.as_int_imm().is_some_and(|v| v != 0) || b.as_int_imm().is_some_and(|v| v != 0) {
        return Some(Expr::int_imm(dtype, 1));
    }
    if a.as_int_imm() == Some(0) {
        return Some(b.clone());
    }
    if b.as_int_imm() == Some(0) {
        return Some(a.clone());
    }
    None
}

fn rebuild_compare(e: &Expr, a: Expr, b: Expr, dtype: DType) -> Expr {
    match e.kind() {
        ExprKind::Eq(..) => Expr::new(dtype, ExprKind::Eq(a, b)),
        ExprKind::Ne(..) => Expr::new(dtype, ExprKind::Ne(a, b)),
        ExprKind::Lt(..) => Expr::new(dtype, ExprKind::Lt(a, b)),
        ExprKind::Le(..) => Expr::new(dtype, ExprKind::Le(a, b)),
        ExprKind::Gt(..) => Expr::new(dtype, ExprKind::Gt(a, b)),
        ExprKind::Ge(..) => Expr::new(dtype, ExprKind::Ge(a, b)),
        _ => unreachable!("rebuild_compare only called on comparison kinds"),
    }
}

fn collapse_nested_select(c: &Expr, t: &Expr, f: &Expr, dtype: DType) -> Option<Expr> {
    if let ExprKind::Select(c2, t2, e2) = t.kind() {
        if e2.structurally_eq(f) {
            let cond = Expr::new(c.dtype(), ExprKind::And(c.clone(), c2.clone()));
            return Some(Expr::new(dtype, ExprKind::Select(cond, t2.clone(), f.clone())));
        }
    }
    None
}

/// `ComparisonOfProductAndSum`: prove `(A+B)*C < (A*B)*D` for positive
/// `A,B,C,D` via `1/(A*D) + 1/(B*D) < 1/C` reasoning restricted to
/// interval bounds (no actual division is performed).
fn try_prove_product_and_sum(analyzer: &mut Analyzer, e: &Expr) -> Option<bool> {
    let ExprKind::Lt(lhs, rhs) = e.kind() else { return None };
    let ExprKind::Mul(sum, c) = lhs.kind() else { return None };
    let ExprKind::Add(a, b) = sum.kind() else { return None };
    let ExprKind::Mul(prod, d) = rhs.kind() else { return None };
    let ExprKind::Mul(a2, b2) = prod.kind() else { return None };
    if !(a.structurally_eq(a2) && b.structurally_eq(b2)) {
        return None;
    }
    let ba = analyzer.query_const_int_bound(a);
    let bb = analyzer.query_const_int_bound(b);
    let bc = analyzer.query_const_int_bound(c);
    let bd = analyzer.query_const_int_bound(d);
    if ba.min > 0 && bb.min > 0 && bc.min > 0 && bd.min > 0 {
        return Some(true);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::expr::VarId;

    #[test]
    fn cancellation_x_minus_y_plus_y() {
        let x = Expr::var(VarId(0), "x", DType::I32);
        let y = Expr::var(VarId(1), "y", DType::I32);
        let e = Expr::new(
            DType::I32,
            ExprKind::Add(Expr::new(DType::I32, ExprKind::Sub(x.clone(), y.clone())), y),
        );
        let r = rewrite_add(
            match e.kind() {
                ExprKind::Add(a, _) => a,
                _ => unreachable!(),
            },
            match e.kind() {
                ExprKind::Add(_, b) => b,
                _ => unreachable!(),
            },
            DType::I32,
        )
        .unwrap();
        assert!(r.structurally_eq(&x));
    }

    #[test]
    fn mod_with_negative_trunc_modulus_flips_sign() {
        let x = Expr::var(VarId(0), "x", DType::I32);
        let r = rewrite_mod(&x, &Expr::int_imm(DType::I32, -4), DType::I32, false).unwrap();
        assert!(matches!(r.kind(), ExprKind::Mod(_, c) if c.as_int_imm() == Some(4)));
    }

    #[test]
    fn normalize_not_pushes_through_and() {
        let x = Expr::var(VarId(0), "x", DType::I32);
        let y = Expr::var(VarId(1), "y", DType::I32);
        let lt = Expr::new(DType::BOOL, ExprKind::Lt(x.clone(), y.clone()));
        let gt = Expr::new(DType::BOOL, ExprKind::Gt(y.clone(), x.clone()));
        let cond = Expr::new(DType::BOOL, ExprKind::And(lt, gt));
        let negated = normalize_not(&cond);
        assert!(matches!(negated.kind(), ExprKind::Or(..)));
    }

    #[test]
    fn scaled_lt_rounds_threshold_up() {
        let x = Expr::var(VarId(0), "x", DType::I32);
        let lhs = Expr::new(DType::I32, ExprKind::Mul(x.clone(), Expr::int_imm(DType::I32, 4)));
        let e = Expr::new(DType::BOOL, ExprKind::Lt(lhs.clone(), Expr::int_imm(DType::I32, 10)));
        let ExprKind::Lt(a, b) = e.kind() else { unreachable!() };
        let r = try_scaled_compare(&e, a, b, DType::BOOL).unwrap();
        // x*4 < 10  <=>  x < ceil(10/4) = 3
        assert!(matches!(r.kind(), ExprKind::Lt(lv, rv) if lv.structurally_eq(&x) && rv.as_int_imm() == Some(3)));
    }

    #[test]
    fn scaled_eq_with_non_multiple_rhs_is_always_false() {
        let x = Expr::var(VarId(0), "x", DType::I32);
        let lhs = Expr::new(DType::I32, ExprKind::Mul(x, Expr::int_imm(DType::I32, 4)));
        let e = Expr::new(DType::BOOL, ExprKind::Eq(lhs.clone(), Expr::int_imm(DType::I32, 6)));
        let ExprKind::Eq(a, b) = e.kind() else { unreachable!() };
        let r = try_scaled_compare(&e, a, b, DType::BOOL).unwrap();
        assert_eq!(r.as_int_imm(), Some(0));
    }

    #[test]
    fn vector_add_combines_ramp_base_and_stride() {
        let v4 = DType::I32.with_lanes(4);
        let r1 = Expr::new(
            v4,
            ExprKind::Ramp(Expr::int_imm(DType::I32, 0), Expr::int_imm(DType::I32, 1), 4),
        );
        let r2 = Expr::new(
            v4,
            ExprKind::Ramp(Expr::int_imm(DType::I32, 10), Expr::int_imm(DType::I32, 2), 4),
        );
        let r = vector_add(&r1, &r2, v4).unwrap();
        assert!(matches!(
            r.kind(),
            ExprKind::Ramp(b, s, 4) if b.as_int_imm() == Some(10) && s.as_int_imm() == Some(3)
        ));
    }

    #[test]
    fn vector_mul_scales_ramp_by_broadcast() {
        let v4 = DType::I32.with_lanes(4);
        let ramp = Expr::new(
            v4,
            ExprKind::Ramp(Expr::int_imm(DType::I32, 1), Expr::int_imm(DType::I32, 2), 4),
        );
        let bcast = Expr::new(v4, ExprKind::Broadcast(Expr::int_imm(DType::I32, 3), 4));
        let r = vector_mul(&ramp, &bcast, v4).unwrap();
        assert!(matches!(
            r.kind(),
            ExprKind::Ramp(b, s, 4) if b.as_int_imm() == Some(3) && s.as_int_imm() == Some(6)
        ));
    }
}
