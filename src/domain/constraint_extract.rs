//! Constraint extractor: splits a boolean expression into its `And`
//! conjuncts or `Or` disjuncts, used pervasively by the sub-analyzers
//! to install hypotheses and to build and-of-ors normal forms.

use super::expr::{Expr, ExprKind};

/// Split `cond` on top-level (and, optionally, nested) `And` nodes.
pub fn extract_and(cond: &Expr, recurse: bool) -> Vec<Expr> {
    let mut out = Vec::new();
    collect(cond, recurse, &mut out, |k| matches!(k, ExprKind::And(..)));
    out
}

/// Split `cond` on top-level (and, optionally, nested) `Or` nodes.
pub fn extract_or(cond: &Expr, recurse: bool) -> Vec<Expr> {
    let mut out = Vec::new();
    collect(cond, recurse, &mut out, |k| matches!(k, ExprKind::Or(..)));
    out
}

fn collect(e: &Expr, recurse: bool, out: &mut Vec<Expr>, is_target: impl Fn(&ExprKind) -> bool + Copy) {
    match e.kind() {
        ExprKind::And(a, b) if is_target(e.kind()) => {
            if recurse {
                collect(a, recurse, out, is_target);
                collect(b, recurse, out, is_target);
            } else {
                out.push(a.clone());
                out.push(b.clone());
            }
        }
        ExprKind::Or(a, b) if is_target(e.kind()) => {
            if recurse {
                collect(a, recurse, out, is_target);
                collect(b, recurse, out, is_target);
            } else {
                out.push(a.clone());
                out.push(b.clone());
            }
        }
        _ => out.push(e.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::expr::VarId;
    use crate::shared::DType;

    #[test]
    fn extract_and_splits_nested_conjunction() {
        let x = Expr::var(VarId(0), "x", DType::I32);
        let a = Expr::new(DType::BOOL, ExprKind::Lt(x.clone(), Expr::int_imm(DType::I32, 1)));
        let b = Expr::new(DType::BOOL, ExprKind::Gt(x.clone(), Expr::int_imm(DType::I32, 0)));
        let c = Expr::new(DType::BOOL, ExprKind::Eq(x, Expr::int_imm(DType::I32, 0)));
        let ab = Expr::new(DType::BOOL, ExprKind::And(a.clone(), b.clone()));
        let abc = Expr::new(DType::BOOL, ExprKind::And(ab, c.clone()));

        let parts = extract_and(&abc, true);
        assert_eq!(parts.len(), 3);
        assert!(parts[0].structurally_eq(&a));
        assert!(parts[1].structurally_eq(&b));
        assert!(parts[2].structurally_eq(&c));
    }
}
