//! Component C: `ConstIntBound` — abstract interpretation over the
//! bounded `i64` interval lattice with ±∞ saturation.

pub mod domain;
pub mod infrastructure;

pub use domain::ConstIntBoundEntry;
pub use infrastructure::{ConstIntBoundAnalyzer, ScopeMark as ConstIntBoundMark};
