//! The five sub-analyzers, each laid out as `domain` (pure algebra) +
//! `infrastructure` (the stateful `Expr`-walking analyzer built on top).

pub mod canonical_simplifier;
pub mod const_int_bound;
pub mod modular_set;
pub mod rewrite_simplifier;
pub mod transitive_comparisons;
