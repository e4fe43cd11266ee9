//! Component E: `TransitiveComparisons` — a DFS-based prover over a
//! hash-consed graph of chained inequalities.

pub mod domain;
pub mod infrastructure;

pub use domain::{Comparison, Key, RawOp};
pub use infrastructure::{ScopeMark as TransitiveComparisonsMark, TransitiveComparisonAnalyzer};
