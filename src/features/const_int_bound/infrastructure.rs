//! `ConstIntBoundAnalyzer`: abstract interpretation of `Expr` over the
//! `ConstIntBoundEntry` lattice.

use super::domain::ConstIntBoundEntry;
use crate::domain::expr::{Expr, ExprKind, IntrinsicOp, VarId};
use crate::errors::{AnalyzerError, Result};
use crate::shared::DType;
use rustc_hash::FxHashMap;

/// A scope mark: the length of the hint stack just before a constraint
/// was pushed. `leave_constraint` truncates back to this length.
#[derive(Debug, Clone, Copy)]
pub struct ScopeMark(usize);

pub struct ConstIntBoundAnalyzer {
    var_map: FxHashMap<VarId, ConstIntBoundEntry>,
    /// Scope-local extra `(Expr, Entry)` hints, applied structurally on
    /// every visit via a linear scan (§4.C).
    hints: Vec<(Expr, ConstIntBoundEntry)>,
}

impl ConstIntBoundAnalyzer {
    pub fn new() -> Self {
        Self {
            var_map: FxHashMap::default(),
            hints: Vec::new(),
        }
    }

    pub fn bind(&mut self, var: VarId, min: i64, extent: i64, allow_override: bool) -> Result<()> {
        let entry = ConstIntBoundEntry::new(min, crate::shared::inf_aware_add(min, crate::shared::inf_aware_add(extent, -1)));
        self.update(var, entry, allow_override)
    }

    pub fn update(&mut self, var: VarId, entry: ConstIntBoundEntry, allow_override: bool) -> Result<()> {
        if let Some(existing) = self.var_map.get(&var) {
            if !allow_override && *existing != entry {
                return Err(AnalyzerError::internal(format!(
                    "conflicting ConstIntBound update for var {:?}: {:?} vs {:?}",
                    var, existing, entry
                )));
            }
        }
        self.var_map.insert(var, entry);
        Ok(())
    }

    fn lookup_hint(&self, e: &Expr) -> Option<ConstIntBoundEntry> {
        self.hints
            .iter()
            .filter(|(expr, _)| expr.structurally_eq(e))
            .map(|(_, entry)| *entry)
            .fold(None, |acc, e| Some(acc.map_or(e, |a: ConstIntBoundEntry| a.intersect(&e))))
    }

    /// Install bounds implied by a conjunction of comparisons as
    /// structural hints; returns a mark for `leave_constraint`.
    pub fn enter_constraint(&mut self, cond: &Expr) -> ScopeMark {
        let mark = ScopeMark(self.hints.len());
        for conj in crate::domain::extract_and(cond, true) {
            if let Some((target, entry)) = hint_from_comparison(&conj) {
                self.hints.push((target, entry));
            }
        }
        mark
    }

    pub fn leave_constraint(&mut self, mark: ScopeMark) {
        self.hints.truncate(mark.0);
    }

    pub fn query(&mut self, e: &Expr) -> ConstIntBoundEntry {
        if let Some(hint) = self.lookup_hint(e) {
            return hint.intersect(&self.query_uncached(e));
        }
        self.query_uncached(e)
    }

    fn query_uncached(&mut self, e: &Expr) -> ConstIntBoundEntry {
        use ExprKind::*;
        match e.kind() {
            Var(id, _) => self
                .var_map
                .get(id)
                .copied()
                .unwrap_or_else(|| ConstIntBoundEntry::everything_for(e.dtype())),
            IntImm(v) => ConstIntBoundEntry::constant(*v),
            FloatImm(_) => ConstIntBoundEntry::everything_for(e.dtype()),
            Add(a, b) => self.query(a).add(&self.query(b)),
            Sub(a, b) => self.query(a).sub(&self.query(b)),
            Mul(a, b) => self.query(a).mul(&self.query(b)),
            Div(a, b) => self.query(a).trunc_div(&self.query(b)),
            Mod(a, b) => self.query(a).trunc_mod(&self.query(b)),
            FloorDiv(a, b) => self.query(a).floor_div(&self.query(b)),
            FloorMod(a, b) => self.query(a).floor_mod(&self.query(b)),
            Min(a, b) => self.query(a).min_with(&self.query(b)),
            Max(a, b) => self.query(a).max_with(&self.query(b)),
            Select(_, t, f) => self.query(t).union(&self.query(f)),
            Cast(to, x) => self.query(x).cast_to(*to),
            Ramp(base, stride, lanes) => {
                let b = self.query(base);
                let s = self.query(stride);
                let last = b.add(&s.mul(&ConstIntBoundEntry::constant(*lanes as i64 - 1)));
                b.union(&last)
            }
            Broadcast(v, _) => self.query(v),
            Call(op, args) => self.query_call(*op, e.dtype(), args),
            Let(v, value, body) => {
                let val_entry = self.query(value);
                let prior = self.var_map.insert(*v, val_entry);
                let r = self.query(body);
                match prior {
                    Some(p) => {
                        self.var_map.insert(*v, p);
                    }
                    None => {
                        self.var_map.remove(v);
                    }
                }
                r
            }
            Eq(..) | Ne(..) | Lt(..) | Le(..) | Gt(..) | Ge(..) | And(..) | Or(..) | Not(..) => {
                ConstIntBoundEntry::new(0, 1)
            }
        }
    }

    fn query_call(&mut self, op: IntrinsicOp, dtype: DType, args: &[Expr]) -> ConstIntBoundEntry {
        match op {
            IntrinsicOp::BitwiseAnd => {
                let a = self.query(&args[0]);
                let b = self.query(&args[1]);
                if let (Some(_), Some(bv)) = (a.as_const(), b.as_const()) {
                    if bv >= 0 {
                        return ConstIntBoundEntry::new(0, bv);
                    }
                }
                ConstIntBoundEntry::everything_for(dtype)
            }
            IntrinsicOp::RightShift => {
                let a = self.query(&args[0]);
                if let Some(k) = args[1].as_int_imm() {
                    if k >= 0 && k < 63 {
                        return ConstIntBoundEntry::new(a.min >> k, a.max >> k);
                    }
                }
                ConstIntBoundEntry::everything_for(dtype)
            }
            IntrinsicOp::LeftShift => {
                let a = self.query(&args[0]);
                if a.min < 0 {
                    return ConstIntBoundEntry::everything_for(dtype);
                }
                if let Some(k) = args[1].as_int_imm() {
                    if k >= 0 && k < dtype.bits as i64 {
                        let max = a.max.checked_shl(k as u32).unwrap_or(crate::shared::POS_INF);
                        let max = max.min(ConstIntBoundEntry::everything_for(dtype).max);
                        return ConstIntBoundEntry::new(a.min << k.min(62), max);
                    }
                }
                ConstIntBoundEntry::everything_for(dtype)
            }
            _ => ConstIntBoundEntry::everything_for(dtype),
        }
    }
}

impl Default for ConstIntBoundAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Recognize `x <= c`, `c <= x`, `x < c`, `x == c` (and symmetric forms)
/// as a structural hint `(x, entry)`.
fn hint_from_comparison(cond: &Expr) -> Option<(Expr, ConstIntBoundEntry)> {
    use ExprKind::*;
    match cond.kind() {
        Le(a, b) => pair(a, b, |c| ConstIntBoundEntry::new(crate::shared::NEG_INF, c), |c| {
            ConstIntBoundEntry::new(c, crate::shared::POS_INF)
        }),
        Lt(a, b) => pair(
            a,
            b,
            |c| ConstIntBoundEntry::new(crate::shared::NEG_INF, c - 1),
            |c| ConstIntBoundEntry::new(c + 1, crate::shared::POS_INF),
        ),
        Ge(a, b) => pair(
            a,
            b,
            |c| ConstIntBoundEntry::new(c, crate::shared::POS_INF),
            |c| ConstIntBoundEntry::new(crate::shared::NEG_INF, c),
        ),
        Gt(a, b) => pair(
            a,
            b,
            |c| ConstIntBoundEntry::new(c + 1, crate::shared::POS_INF),
            |c| ConstIntBoundEntry::new(crate::shared::NEG_INF, c - 1),
        ),
        Eq(a, b) => {
            if let Some(c) = b.as_int_imm() {
                Some((a.clone(), ConstIntBoundEntry::constant(c)))
            } else {
                a.as_int_imm().map(|c| (b.clone(), ConstIntBoundEntry::constant(c)))
            }
        }
        _ => None,
    }
}

fn pair(
    a: &Expr,
    b: &Expr,
    from_rhs_const: impl Fn(i64) -> ConstIntBoundEntry,
    from_lhs_const: impl Fn(i64) -> ConstIntBoundEntry,
) -> Option<(Expr, ConstIntBoundEntry)> {
    if let Some(c) = b.as_int_imm() {
        return Some((a.clone(), from_rhs_const(c)));
    }
    if let Some(c) = a.as_int_imm() {
        return Some((b.clone(), from_lhs_const(c)));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::expr::VarId;

    #[test]
    fn bind_and_query_var() {
        let mut a = ConstIntBoundAnalyzer::new();
        a.bind(VarId(0), 0, 32, false).unwrap();
        let x = Expr::var(VarId(0), "n", DType::I32);
        let e = a.query(&x);
        assert_eq!(e, ConstIntBoundEntry::new(0, 31));
    }

    #[test]
    fn enter_constraint_narrows_and_restores() {
        let mut a = ConstIntBoundAnalyzer::new();
        let x = Expr::var(VarId(0), "n", DType::I32);
        let cond = Expr::new(DType::BOOL, ExprKind::Lt(x.clone(), Expr::int_imm(DType::I32, 10)));
        let before = a.query(&x);
        let mark = a.enter_constraint(&cond);
        let narrowed = a.query(&x);
        assert_eq!(narrowed.max, 9);
        a.leave_constraint(mark);
        assert_eq!(a.query(&x), before);
    }

    #[test]
    fn conflicting_update_without_override_errors() {
        let mut a = ConstIntBoundAnalyzer::new();
        a.update(VarId(0), ConstIntBoundEntry::constant(1), false).unwrap();
        let err = a.update(VarId(0), ConstIntBoundEntry::constant(2), false).unwrap_err();
        assert!(matches!(err, AnalyzerError::Internal(_)));
    }
}
