//! Component G: `CanonicalSimplifier` — a sum-of-split normal form for
//! index arithmetic, layered on top of `RewriteSimplifier`.

pub mod domain;
pub mod infrastructure;

pub use domain::{SplitExpr, SumExpr};
pub use infrastructure::CanonicalSimplifier;
