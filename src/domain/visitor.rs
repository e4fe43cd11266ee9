//! Read-only visitor and tree-rewriting mutator over `Expr`, each with a
//! default "walk children" combinator so a sub-analyzer only overrides
//! the node kinds it actually interprets.

use super::expr::{Expr, ExprKind};

/// Structural read-only walk. Override individual `visit_*` hooks; the
/// default `visit` dispatches to them and recurses into children.
pub trait ExprVisitor {
    fn visit(&mut self, e: &Expr) {
        walk_visit(self, e);
    }
}

pub fn walk_visit<V: ExprVisitor + ?Sized>(v: &mut V, e: &Expr) {
    match e.kind() {
        ExprKind::Var(..) | ExprKind::IntImm(_) | ExprKind::FloatImm(_) => {}
        ExprKind::Add(a, b)
        | ExprKind::Sub(a, b)
        | ExprKind::Mul(a, b)
        | ExprKind::Div(a, b)
        | ExprKind::Mod(a, b)
        | ExprKind::FloorDiv(a, b)
        | ExprKind::FloorMod(a, b)
        | ExprKind::Min(a, b)
        | ExprKind::Max(a, b)
        | ExprKind::Eq(a, b)
        | ExprKind::Ne(a, b)
        | ExprKind::Lt(a, b)
        | ExprKind::Le(a, b)
        | ExprKind::Gt(a, b)
        | ExprKind::Ge(a, b)
        | ExprKind::And(a, b)
        | ExprKind::Or(a, b) => {
            v.visit(a);
            v.visit(b);
        }
        ExprKind::Not(a) => v.visit(a),
        ExprKind::Select(c, t, f) => {
            v.visit(c);
            v.visit(t);
            v.visit(f);
        }
        ExprKind::Ramp(base, stride, _) => {
            v.visit(base);
            v.visit(stride);
        }
        ExprKind::Broadcast(val, _) => v.visit(val),
        ExprKind::Cast(_, x) => v.visit(x),
        ExprKind::Call(_, args) => {
            for a in args {
                v.visit(a);
            }
        }
        ExprKind::Let(_, value, body) => {
            v.visit(value);
            v.visit(body);
        }
    }
}

/// Tree-rewriting mutator. `mutate` returns a new tree, reusing the
/// input node (by `Rc` clone) whenever every child comes back pointer-
/// identical to what went in.
pub trait ExprMutator {
    fn mutate(&mut self, e: &Expr) -> Expr {
        walk_mutate(self, e)
    }
}

pub fn walk_mutate<M: ExprMutator + ?Sized>(m: &mut M, e: &Expr) -> Expr {
    let dtype = e.dtype();
    match e.kind() {
        ExprKind::Var(..) | ExprKind::IntImm(_) | ExprKind::FloatImm(_) => e.clone(),
        ExprKind::Add(a, b) => rebuild2(e, dtype, m, a, b, ExprKind::Add),
        ExprKind::Sub(a, b) => rebuild2(e, dtype, m, a, b, ExprKind::Sub),
        ExprKind::Mul(a, b) => rebuild2(e, dtype, m, a, b, ExprKind::Mul),
        ExprKind::Div(a, b) => rebuild2(e, dtype, m, a, b, ExprKind::Div),
        ExprKind::Mod(a, b) => rebuild2(e, dtype, m, a, b, ExprKind::Mod),
        ExprKind::FloorDiv(a, b) => rebuild2(e, dtype, m, a, b, ExprKind::FloorDiv),
        ExprKind::FloorMod(a, b) => rebuild2(e, dtype, m, a, b, ExprKind::FloorMod),
        ExprKind::Min(a, b) => rebuild2(e, dtype, m, a, b, ExprKind::Min),
        ExprKind::Max(a, b) => rebuild2(e, dtype, m, a, b, ExprKind::Max),
        ExprKind::Eq(a, b) => rebuild2(e, dtype, m, a, b, ExprKind::Eq),
        ExprKind::Ne(a, b) => rebuild2(e, dtype, m, a, b, ExprKind::Ne),
        ExprKind::Lt(a, b) => rebuild2(e, dtype, m, a, b, ExprKind::Lt),
        ExprKind::Le(a, b) => rebuild2(e, dtype, m, a, b, ExprKind::Le),
        ExprKind::Gt(a, b) => rebuild2(e, dtype, m, a, b, ExprKind::Gt),
        ExprKind::Ge(a, b) => rebuild2(e, dtype, m, a, b, ExprKind::Ge),
        ExprKind::And(a, b) => rebuild2(e, dtype, m, a, b, ExprKind::And),
        ExprKind::Or(a, b) => rebuild2(e, dtype, m, a, b, ExprKind::Or),
        ExprKind::Not(a) => {
            let na = m.mutate(a);
            if na.ptr_eq(a) {
                e.clone()
            } else {
                Expr::new(dtype, ExprKind::Not(na))
            }
        }
        ExprKind::Select(c, t, f) => {
            let nc = m.mutate(c);
            let nt = m.mutate(t);
            let nf = m.mutate(f);
            if nc.ptr_eq(c) && nt.ptr_eq(t) && nf.ptr_eq(f) {
                e.clone()
            } else {
                Expr::new(dtype, ExprKind::Select(nc, nt, nf))
            }
        }
        ExprKind::Ramp(base, stride, lanes) => {
            let nb = m.mutate(base);
            let ns = m.mutate(stride);
            if nb.ptr_eq(base) && ns.ptr_eq(stride) {
                e.clone()
            } else {
                Expr::new(dtype, ExprKind::Ramp(nb, ns, *lanes))
            }
        }
        ExprKind::Broadcast(val, lanes) => {
            let nv = m.mutate(val);
            if nv.ptr_eq(val) {
                e.clone()
            } else {
                Expr::new(dtype, ExprKind::Broadcast(nv, *lanes))
            }
        }
        ExprKind::Cast(to, x) => {
            let nx = m.mutate(x);
            if nx.ptr_eq(x) {
                e.clone()
            } else {
                Expr::new(dtype, ExprKind::Cast(*to, nx))
            }
        }
        ExprKind::Call(op, args) => {
            let nargs: Vec<Expr> = args.iter().map(|a| m.mutate(a)).collect();
            let unchanged = nargs.iter().zip(args).all(|(n, o)| n.ptr_eq(o));
            if unchanged {
                e.clone()
            } else {
                Expr::new(dtype, ExprKind::Call(*op, nargs))
            }
        }
        ExprKind::Let(v, value, body) => {
            let nvalue = m.mutate(value);
            let nbody = m.mutate(body);
            if nvalue.ptr_eq(value) && nbody.ptr_eq(body) {
                e.clone()
            } else {
                Expr::new(dtype, ExprKind::Let(*v, nvalue, nbody))
            }
        }
    }
}

fn rebuild2<M: ExprMutator + ?Sized>(
    e: &Expr,
    dtype: crate::shared::DType,
    m: &mut M,
    a: &Expr,
    b: &Expr,
    ctor: impl FnOnce(Expr, Expr) -> ExprKind,
) -> Expr {
    let na = m.mutate(a);
    let nb = m.mutate(b);
    if na.ptr_eq(a) && nb.ptr_eq(b) {
        e.clone()
    } else {
        Expr::new(dtype, ctor(na, nb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::expr::VarId;
    use crate::shared::DType;

    struct CountVars(usize);
    impl ExprVisitor for CountVars {
        fn visit(&mut self, e: &Expr) {
            if matches!(e.kind(), ExprKind::Var(..)) {
                self.0 += 1;
            }
            walk_visit(self, e);
        }
    }

    #[test]
    fn visitor_counts_vars() {
        let x = Expr::var(VarId(0), "x", DType::I32);
        let e = Expr::new(
            DType::I32,
            ExprKind::Add(x.clone(), Expr::new(DType::I32, ExprKind::Mul(x, Expr::int_imm(DType::I32, 2)))),
        );
        let mut c = CountVars(0);
        c.visit(&e);
        assert_eq!(c.0, 2);
    }

    struct Identity;
    impl ExprMutator for Identity {}

    #[test]
    fn identity_mutator_reuses_nodes() {
        let e = Expr::new(
            DType::I32,
            ExprKind::Add(Expr::int_imm(DType::I32, 1), Expr::int_imm(DType::I32, 2)),
        );
        let mut m = Identity;
        let e2 = m.mutate(&e);
        assert!(e.ptr_eq(&e2));
    }
}
