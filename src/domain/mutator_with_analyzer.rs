//! `MutatorWithAnalyzer`: a cooperating mutator that pushes branch
//! conditions as scoped hypotheses while descending into `Select`/
//! `if_then_else` branches, and binds `Let`-values for the duration of
//! the body's recursion.

use super::expr::{Expr, ExprKind};
use super::visitor::{walk_mutate, ExprMutator};
use crate::analyzer::Analyzer;

/// Wraps a closure-based `ExprMutator` with a mutable reference to the
/// owning `Analyzer`, so branch-sensitive rewrites can install and then
/// roll back constraints as they recurse.
pub struct MutatorWithAnalyzer<'a> {
    pub analyzer: &'a mut Analyzer,
}

impl<'a> MutatorWithAnalyzer<'a> {
    pub fn new(analyzer: &'a mut Analyzer) -> Self {
        Self { analyzer }
    }
}

impl<'a> ExprMutator for MutatorWithAnalyzer<'a> {
    fn mutate(&mut self, e: &Expr) -> Expr {
        let rebuilt = match e.kind() {
            ExprKind::Select(cond, t, f) => {
                let new_cond = self.mutate(cond);
                let mark = self.analyzer.enter_constraint(&new_cond);
                let new_t = self.mutate(t);
                self.analyzer.leave_constraint(mark);

                let not_cond = self.analyzer.simplify_rewrite_only(&Expr::new(
                    cond.dtype(),
                    ExprKind::Not(new_cond.clone()),
                ));
                let mark = self.analyzer.enter_constraint(&not_cond);
                let new_f = self.mutate(f);
                self.analyzer.leave_constraint(mark);

                if new_cond.ptr_eq(cond) && new_t.ptr_eq(t) && new_f.ptr_eq(f) {
                    e.clone()
                } else {
                    Expr::new(e.dtype(), ExprKind::Select(new_cond, new_t, new_f))
                }
            }
            ExprKind::Let(v, value, body) => {
                let new_value = self.mutate(value);
                let simplified_value = self.analyzer.simplify(&new_value);
                self.analyzer.bind_expr(*v, &simplified_value, true);
                let new_body = self.mutate(body);
                if new_value.ptr_eq(value) && new_body.ptr_eq(body) {
                    e.clone()
                } else {
                    Expr::new(e.dtype(), ExprKind::Let(*v, new_value, new_body))
                }
            }
            _ => walk_mutate(self, e),
        };
        self.analyzer.rewrite_postprocess(&rebuilt)
    }
}
