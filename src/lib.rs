//! shapearith: symbolic integer-expression analysis for tensor shapes,
//! loop bounds, and memory indices in a tensor-compiler front end.
//!
//! The [`Analyzer`] façade coordinates five cooperating sub-analyzers —
//! [`features::const_int_bound`], [`features::modular_set`],
//! [`features::rewrite_simplifier`], [`features::canonical_simplifier`],
//! and [`features::transitive_comparisons`] — over the [`Expr`] tree
//! defined in [`domain`].

pub mod analyzer;
pub mod config;
pub mod domain;
pub mod errors;
pub mod features;
pub mod shared;

pub use analyzer::{Analyzer, BindValue, ProveStrength};
pub use config::AnalyzerConfig;
pub use domain::{shape_var, Expr, ExprKind, ExprMutator, ExprVisitor, IntrinsicOp, VarId};
pub use errors::{AnalyzerError, Result};
pub use shared::{CompareResult, DType, DivMode, TypeCode};
