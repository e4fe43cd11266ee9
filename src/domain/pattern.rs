//! A small embedded pattern-matching DSL over `Expr`, per §4.A / §9 ("do
//! not introduce runtime reflection; the pattern language should be a
//! small embedded DSL over the sum type").
//!
//! Patterns are built from typed pattern-variable sites (`PVar<Expr>`,
//! `PVar<i64>`) plus structural combinators, and matched against a
//! concrete `Expr` to produce a `Bindings` table. `Var` nodes inside the
//! *target* are compared to each other by identity; everywhere else
//! comparison is structural.

use super::expr::{Expr, ExprKind};
use rustc_hash::FxHashMap;

/// Opaque identity for a pattern-variable binding site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub u32);

/// Captured bindings produced by a successful match.
#[derive(Debug, Default, Clone)]
pub struct Bindings {
    exprs: FxHashMap<u32, Expr>,
    ints: FxHashMap<u32, i64>,
}

impl Bindings {
    pub fn expr(&self, slot: SlotId) -> Option<&Expr> {
        self.exprs.get(&slot.0)
    }

    pub fn int(&self, slot: SlotId) -> Option<i64> {
        self.ints.get(&slot.0).copied()
    }
}

/// A pattern-variable handle for `Expr`-typed captures. `eval` reads the
/// captured value back out of a successful match's `Bindings`.
#[derive(Debug, Clone, Copy)]
pub struct PExprVar(pub SlotId);

impl PExprVar {
    pub fn eval(self, b: &Bindings) -> Expr {
        b.expr(self.0).cloned().expect("pattern variable must be bound after a successful match")
    }
}

/// A pattern-variable handle for `i64`-typed captures (e.g. requiring the
/// matched sub-expression to be a literal integer).
#[derive(Debug, Clone, Copy)]
pub struct PIntVar(pub SlotId);

impl PIntVar {
    pub fn eval(self, b: &Bindings) -> i64 {
        b.int(self.0).expect("pattern variable must be bound after a successful match")
    }
}

/// A pattern tree. Variants mirror `ExprKind` loosely enough to express
/// common rewrite-rule shapes; anything not named here is matched through
/// `PExpr`, which accepts any sub-expression. Most rewrite rules match
/// `Expr` directly since a one- or two-level `match e.kind()` is already
/// as readable as a pattern literal; this is reached for where a rule
/// needs named, reusable slot captures (see `try_scaled_compare` in
/// `features::rewrite_simplifier`).
pub enum Pattern {
    /// Matches any expression, capturing it.
    PExpr(PExprVar),
    /// Matches only an `IntImm`, capturing its value.
    PInt(PIntVar),
    /// Matches only the literal constant `value`.
    Const(i64),
    Add(Box<Pattern>, Box<Pattern>),
    Sub(Box<Pattern>, Box<Pattern>),
    Mul(Box<Pattern>, Box<Pattern>),
    FloorDiv(Box<Pattern>, Box<Pattern>),
    FloorMod(Box<Pattern>, Box<Pattern>),
    Min(Box<Pattern>, Box<Pattern>),
    Max(Box<Pattern>, Box<Pattern>),
    /// Matches if any of the listed alternatives match, sharing one
    /// binding scope (the "n-of" combinator of §4.A).
    AnyOf(Vec<Pattern>),
}

pub fn match_pattern(pattern: &Pattern, target: &Expr) -> Option<Bindings> {
    let mut b = Bindings::default();
    if match_into(pattern, target, &mut b) {
        Some(b)
    } else {
        None
    }
}

fn match_into(pattern: &Pattern, target: &Expr, b: &mut Bindings) -> bool {
    match pattern {
        Pattern::PExpr(slot) => {
            if let Some(existing) = b.exprs.get(&slot.0.0) {
                return existing.structurally_eq(target);
            }
            b.exprs.insert(slot.0 .0, target.clone());
            true
        }
        Pattern::PInt(slot) => match target.as_int_imm() {
            Some(v) => {
                if let Some(existing) = b.ints.get(&slot.0 .0) {
                    return *existing == v;
                }
                b.ints.insert(slot.0 .0, v);
                true
            }
            None => false,
        },
        Pattern::Const(v) => target.as_int_imm() == Some(*v),
        Pattern::Add(p1, p2) => match_binary(target, p1, p2, |k| matches!(k, ExprKind::Add(..)), b),
        Pattern::Sub(p1, p2) => match_binary(target, p1, p2, |k| matches!(k, ExprKind::Sub(..)), b),
        Pattern::Mul(p1, p2) => match_binary(target, p1, p2, |k| matches!(k, ExprKind::Mul(..)), b),
        Pattern::FloorDiv(p1, p2) => {
            match_binary(target, p1, p2, |k| matches!(k, ExprKind::FloorDiv(..)), b)
        }
        Pattern::FloorMod(p1, p2) => {
            match_binary(target, p1, p2, |k| matches!(k, ExprKind::FloorMod(..)), b)
        }
        Pattern::Min(p1, p2) => match_binary(target, p1, p2, |k| matches!(k, ExprKind::Min(..)), b),
        Pattern::Max(p1, p2) => match_binary(target, p1, p2, |k| matches!(k, ExprKind::Max(..)), b),
        Pattern::AnyOf(alts) => alts.iter().any(|alt| {
            let mut trial = b.clone();
            if match_into(alt, target, &mut trial) {
                *b = trial;
                true
            } else {
                false
            }
        }),
    }
}

fn match_binary(
    target: &Expr,
    p1: &Pattern,
    p2: &Pattern,
    is_kind: impl Fn(&ExprKind) -> bool,
    b: &mut Bindings,
) -> bool {
    if !is_kind(target.kind()) {
        return false;
    }
    let (a, c) = match target.kind() {
        ExprKind::Add(a, c)
        | ExprKind::Sub(a, c)
        | ExprKind::Mul(a, c)
        | ExprKind::FloorDiv(a, c)
        | ExprKind::FloorMod(a, c)
        | ExprKind::Min(a, c)
        | ExprKind::Max(a, c) => (a, c),
        _ => unreachable!("is_kind already filtered non-binary nodes"),
    };
    match_into(p1, a, b) && match_into(p2, c, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::expr::VarId;
    use crate::shared::DType;

    #[test]
    fn matches_add_and_captures() {
        let x = PExprVar(SlotId(0));
        let c = PIntVar(SlotId(1));
        let pattern = Pattern::Add(Box::new(Pattern::PExpr(x)), Box::new(Pattern::PInt(c)));

        let var = Expr::var(VarId(0), "n", DType::I32);
        let target = Expr::new(
            DType::I32,
            ExprKind::Add(var.clone(), Expr::int_imm(DType::I32, 5)),
        );
        let bindings = match_pattern(&pattern, &target).expect("should match");
        assert!(x.eval(&bindings).structurally_eq(&var));
        assert_eq!(c.eval(&bindings), 5);
    }

    #[test]
    fn repeated_slot_requires_equal_capture() {
        let x = PExprVar(SlotId(0));
        // x - x
        let pattern = Pattern::Sub(Box::new(Pattern::PExpr(x)), Box::new(Pattern::PExpr(x)));
        let var = Expr::var(VarId(0), "n", DType::I32);
        let good = Expr::new(DType::I32, ExprKind::Sub(var.clone(), var.clone()));
        assert!(match_pattern(&pattern, &good).is_some());

        let other = Expr::var(VarId(1), "m", DType::I32);
        let bad = Expr::new(DType::I32, ExprKind::Sub(var, other));
        assert!(match_pattern(&pattern, &bad).is_none());
    }
}
