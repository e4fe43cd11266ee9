//! Component F: `RewriteSimplifier` — constant folding, a literal-
//! constraint table, and ordered algebraic rewrite rules.

pub mod domain;
pub mod infrastructure;

pub use domain::{Extensions, Limits, Stats};
pub use infrastructure::{RewriteSimplifier, ScopeMark as RewriteSimplifierMark};
