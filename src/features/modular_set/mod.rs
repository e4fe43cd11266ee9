//! Component D: `ModularSet` — abstract interpretation over the
//! `{coeff*k + base}` lattice.

pub mod domain;
pub mod infrastructure;

pub use domain::ModularSetEntry;
pub use infrastructure::{ModularSetAnalyzer, ScopeMark as ModularSetMark};
