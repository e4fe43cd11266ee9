//! Pure data held by the rewrite simplifier: running statistics and the
//! extension-flag bitset.

use serde::{Deserialize, Serialize};

/// Running counters over the lifetime of a `RewriteSimplifier` (§4.F:
/// "a running `stats` counter tracks visited nodes, attempted rewrites,
/// performed rewrites, recursion depth and constraints entered").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub nodes_visited: u64,
    pub rewrites_attempted: u64,
    pub rewrites_performed: u64,
    pub max_recursion_depth: u32,
    pub constraints_entered: u64,
}

/// Opt-in behaviors, each independently toggleable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extensions {
    pub transitively_prove_inequalities: bool,
    pub convert_boolean_to_and_of_ors: bool,
    pub apply_constraints_to_boolean_branches: bool,
    pub comparison_of_product_and_sum: bool,
}

/// Recursion-depth / rewrite-step limits. `max_rewrite_steps` of `None`
/// means unbounded (bounded only by `recursion_limit`).
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub recursion_limit: u32,
    pub max_rewrite_steps: Option<u64>,
}

impl Default for Limits {
    fn default() -> Self {
        Self { recursion_limit: 5, max_rewrite_steps: None }
    }
}
