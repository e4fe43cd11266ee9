//! `TransitiveComparisonAnalyzer`: a hash-consed comparison graph over
//! `Expr` with a DFS prover for chained inequalities (Component E).

use super::domain::{Comparison, Key, RawOp};
use crate::domain::expr::{Expr, ExprKind, VarId};
use crate::shared::CompareResult;
use rustc_hash::FxHashMap;

/// Interns `Expr`s into densely-numbered `Key`s so the comparison graph
/// can use cheap integer indices instead of cloning/hashing whole trees
/// on every lookup.
#[derive(Default)]
struct KeyTable {
    exprs: Vec<Expr>,
    index: FxHashMap<Expr, Key>,
}

impl KeyTable {
    fn intern(&mut self, e: &Expr) -> Key {
        if let Some(k) = self.index.get(e) {
            return *k;
        }
        let k = Key(self.exprs.len() as u32);
        self.exprs.push(e.clone());
        self.index.insert(e.clone(), k);
        k
    }

    fn expr(&self, k: Key) -> &Expr {
        &self.exprs[k.0 as usize]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScopeMark(usize);

pub struct TransitiveComparisonAnalyzer {
    keys: KeyTable,
    edges: Vec<Comparison>,
}

/// Peel off a top-level additive constant: `(x + 3)` becomes `(x, 3)`,
/// `(x - 3)` becomes `(x, -3)`, applied recursively so `(x + 1) + 2`
/// becomes `(x, 3)`. Anything else is its own core with offset 0.
fn split_offset(e: &Expr) -> (Expr, i64) {
    match e.kind() {
        ExprKind::Add(a, b) => {
            if let Some(c) = b.as_int_imm() {
                let (core, off) = split_offset(a);
                return (core, off + c);
            }
            if let Some(c) = a.as_int_imm() {
                let (core, off) = split_offset(b);
                return (core, off + c);
            }
            (e.clone(), 0)
        }
        ExprKind::Sub(a, b) => {
            if let Some(c) = b.as_int_imm() {
                let (core, off) = split_offset(a);
                return (core, off - c);
            }
            (e.clone(), 0)
        }
        _ => (e.clone(), 0),
    }
}

fn numeric_compare(a: i64, b: i64) -> CompareResult {
    match a.cmp(&b) {
        std::cmp::Ordering::Less => CompareResult::LT,
        std::cmp::Ordering::Equal => CompareResult::EQ,
        std::cmp::Ordering::Greater => CompareResult::GT,
    }
}

/// Fold one graph edge `a OP b + offset` against a target `diff`
/// (where the query wants to know how `a` relates to `b + diff`),
/// per the merge rules in the data model: an edge only narrows the
/// outcome when its offset pins down the relationship exactly or
/// strictly; otherwise it contributes no information.
fn edge_contribution(result: CompareResult, offset: i64, diff: i64) -> CompareResult {
    match result {
        CompareResult::EQ => {
            if offset == diff {
                CompareResult::EQ
            } else {
                CompareResult::NE
            }
        }
        CompareResult::LE => match offset.cmp(&diff) {
            std::cmp::Ordering::Less => CompareResult::LT,
            std::cmp::Ordering::Equal => CompareResult::LE,
            std::cmp::Ordering::Greater => CompareResult::UNKNOWN,
        },
        CompareResult::GE => match offset.cmp(&diff) {
            std::cmp::Ordering::Greater => CompareResult::GT,
            std::cmp::Ordering::Equal => CompareResult::GE,
            std::cmp::Ordering::Less => CompareResult::UNKNOWN,
        },
        CompareResult::NE => {
            if offset == diff {
                CompareResult::NE
            } else {
                CompareResult::UNKNOWN
            }
        }
        _ => CompareResult::UNKNOWN,
    }
}

/// Compose two chained edges `acc: lhs OP0 mid + o0` and
/// `next: mid OP1 rhs + o1` into a single `lhs OP rhs + (o0+o1)` edge,
/// or `None` if the operators don't chain (an `LE` can't compose with
/// a `GE`, and `NE` never composes).
fn compose(acc: (CompareResult, i64), next: (CompareResult, i64)) -> Option<(CompareResult, i64)> {
    let (ar, ao) = acc;
    let (br, bo) = next;
    let result = if ar == CompareResult::EQ {
        br
    } else if br == CompareResult::EQ {
        ar
    } else if ar == br && matches!(ar, CompareResult::LE | CompareResult::GE) {
        ar
    } else {
        return None;
    };
    Some((result, ao + bo))
}

impl TransitiveComparisonAnalyzer {
    pub fn new() -> Self {
        Self { keys: KeyTable::default(), edges: Vec::new() }
    }

    fn push_edge(&mut self, lhs: &Expr, rhs: &Expr, offset: i64, op: RawOp) {
        let lk = self.keys.intern(lhs);
        let rk = self.keys.intern(rhs);
        self.edges.push(Comparison::new(lk, rk, offset, op));
    }

    /// Installs `v >= min` and `v < min + extent` as two chained edges.
    pub fn bind_range(&mut self, var: VarId, var_dtype: crate::shared::DType, min: &Expr, extent: &Expr) {
        let v = Expr::var(var, "_", var_dtype);
        self.push_edge(&v, min, 0, RawOp::Ge);
        if let (Some(min_c), Some(ext_c)) = (min.as_int_imm(), extent.as_int_imm()) {
            let bound = Expr::int_imm(var_dtype, min_c + ext_c);
            self.push_edge(&v, &bound, 0, RawOp::Lt);
        }
    }

    pub fn bind_expr(&mut self, var: VarId, var_dtype: crate::shared::DType, value: &Expr) {
        let v = Expr::var(var, "_", var_dtype);
        self.push_edge(&v, value, 0, RawOp::Eq);
    }

    /// Splits on `And`, adding one edge per conjunct that is a direct
    /// comparison; returns a mark to roll back to via `leave_constraint`.
    pub fn enter_constraint(&mut self, cond: &Expr) -> ScopeMark {
        let mark = ScopeMark(self.edges.len());
        for conj in crate::domain::extract_and(cond, true) {
            let op = match conj.kind() {
                ExprKind::Eq(..) => Some(RawOp::Eq),
                ExprKind::Ne(..) => Some(RawOp::Ne),
                ExprKind::Lt(..) => Some(RawOp::Lt),
                ExprKind::Le(..) => Some(RawOp::Le),
                ExprKind::Gt(..) => Some(RawOp::Gt),
                ExprKind::Ge(..) => Some(RawOp::Ge),
                _ => None,
            };
            let (a, b) = match conj.kind() {
                ExprKind::Eq(a, b)
                | ExprKind::Ne(a, b)
                | ExprKind::Lt(a, b)
                | ExprKind::Le(a, b)
                | ExprKind::Gt(a, b)
                | ExprKind::Ge(a, b) => (a, b),
                _ => continue,
            };
            if let Some(op) = op {
                let (lcore, loff) = split_offset(a);
                let (rcore, roff) = split_offset(b);
                self.push_edge(&lcore, &rcore, roff - loff, op);
            }
        }
        mark
    }

    pub fn leave_constraint(&mut self, mark: ScopeMark) {
        self.edges.truncate(mark.0);
    }

    /// `try_compare(lhs, rhs, propagate)`: does `lhs OP rhs` hold?
    /// `propagate` enables indirect (multi-hop) edges; without it only
    /// directly-stored edges are consulted.
    pub fn try_compare(&mut self, lhs: &Expr, rhs: &Expr, propagate: bool) -> CompareResult {
        let (lcore, loff) = split_offset(lhs);
        let (rcore, roff) = split_offset(rhs);
        let diff = roff - loff;

        if lcore.structurally_eq(&rcore) {
            return numeric_compare(0, diff);
        }
        if let (Some(a), Some(b)) = (lcore.as_int_imm(), rcore.as_int_imm()) {
            return numeric_compare(a, b + diff);
        }

        let lk = self.keys.intern(&lcore);
        let rk = self.keys.intern(&rcore);

        let mut acc = CompareResult::UNKNOWN;
        for e in &self.edges {
            if let Some(edge) = e.with_lhs(lk) {
                if edge.rhs == rk {
                    acc = acc.and(edge_contribution(edge.result, edge.offset, diff));
                }
            }
        }

        if propagate {
            acc = acc.and(self.dfs_indirect(lk, rk, diff));
        }
        acc
    }

    /// Unbounded worklist over the comparison graph: every node reachable
    /// from `start` is visited exactly once (`visited` gives termination
    /// on this finite graph), mirroring the reference's `DFSFromLHS`
    /// rather than imposing an arbitrary depth cap.
    fn dfs_indirect(&self, start: Key, target: Key, diff: i64) -> CompareResult {
        let mut best = CompareResult::UNKNOWN;
        let mut visited = vec![start];
        let mut stack = vec![(start, (CompareResult::EQ, 0i64))];
        while let Some((node, acc)) = stack.pop() {
            for e in &self.edges {
                let edge = match e.with_lhs(node) {
                    Some(edge) => edge,
                    None => continue,
                };
                let composed = match compose(acc, (edge.result, edge.offset)) {
                    Some(c) => c,
                    None => continue,
                };
                if edge.rhs == target {
                    best = best.and(edge_contribution(composed.0, composed.1, diff));
                    continue;
                }
                if !visited.contains(&edge.rhs) {
                    visited.push(edge.rhs);
                    stack.push((edge.rhs, composed));
                }
            }
        }
        best
    }

    pub fn lookup_expr(&self, k: Key) -> &Expr {
        self.keys.expr(k)
    }
}

impl Default for TransitiveComparisonAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::DType;

    #[test]
    fn direct_edge_answers_le() {
        let mut a = TransitiveComparisonAnalyzer::new();
        let x = Expr::var(VarId(0), "x", DType::I32);
        let y = Expr::var(VarId(1), "y", DType::I32);
        let cond = Expr::new(DType::BOOL, ExprKind::Le(x.clone(), y.clone()));
        let mark = a.enter_constraint(&cond);
        assert_eq!(a.try_compare(&x, &y, false), CompareResult::LE);
        a.leave_constraint(mark);
        assert_eq!(a.try_compare(&x, &y, false), CompareResult::UNKNOWN);
    }

    #[test]
    fn transitive_chain_proves_lt() {
        let mut a = TransitiveComparisonAnalyzer::new();
        let x = Expr::var(VarId(0), "x", DType::I32);
        let y = Expr::var(VarId(1), "y", DType::I32);
        let z = Expr::var(VarId(2), "z", DType::I32);
        let c1 = Expr::new(DType::BOOL, ExprKind::Lt(x.clone(), y.clone()));
        let c2 = Expr::new(DType::BOOL, ExprKind::Le(y.clone(), z.clone()));
        a.enter_constraint(&c1);
        a.enter_constraint(&c2);
        assert_eq!(a.try_compare(&x, &z, true), CompareResult::LT);
    }

    #[test]
    fn offset_shifted_query_against_chain() {
        let mut a = TransitiveComparisonAnalyzer::new();
        let x = Expr::var(VarId(0), "x", DType::I32);
        let y = Expr::var(VarId(1), "y", DType::I32);
        // x <= y, query whether x < y + 1 (should hold transitively: LE with diff 1 -> LE, not LT; still true)
        let cond = Expr::new(DType::BOOL, ExprKind::Le(x.clone(), y.clone()));
        a.enter_constraint(&cond);
        let y_plus_1 = Expr::new(DType::I32, ExprKind::Add(y, Expr::int_imm(DType::I32, 1)));
        let r = a.try_compare(&x, &y_plus_1, false);
        assert!(r.implies_true(CompareResult::LE));
    }

    #[test]
    fn no_path_is_unknown() {
        let mut a = TransitiveComparisonAnalyzer::new();
        let x = Expr::var(VarId(0), "x", DType::I32);
        let y = Expr::var(VarId(1), "y", DType::I32);
        assert_eq!(a.try_compare(&x, &y, true), CompareResult::UNKNOWN);
    }
}
