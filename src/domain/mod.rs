//! Component A: the expression model, its visitor/mutator traversal
//! hooks, a small embedded pattern-matching DSL, and the constraint
//! extractor — plus (component B) constant folding.

pub mod constraint_extract;
pub mod expr;
pub mod fold;
pub mod mutator_with_analyzer;
pub mod pattern;
pub mod visitor;

pub use constraint_extract::{extract_and, extract_or};
pub use expr::{shape_var, Expr, ExprKind, ExprNode, IntrinsicOp, VarId, VarNode};
pub use mutator_with_analyzer::MutatorWithAnalyzer;
pub use pattern::{match_pattern, Bindings, PExprVar, PIntVar, Pattern, SlotId};
pub use visitor::{walk_mutate, walk_visit, ExprMutator, ExprVisitor};
