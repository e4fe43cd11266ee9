//! Analyzer configuration: recursion/step limits and opt-in extensions.
//!
//! Deserializable with `serde` so a caller can load a profile (e.g. from
//! a project's `analyzer.toml`) instead of constructing one in code.

use crate::features::rewrite_simplifier::Extensions;
use serde::{Deserialize, Serialize};

/// Top-level tuning knobs for an [`crate::analyzer::Analyzer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Number of rewrite+canonicalize rounds `simplify` runs before
    /// giving up on reaching a fixed point.
    pub simplify_steps: u32,
    /// Bounded re-entry depth for a single `RewriteSimplifier` rule
    /// application (§4.F).
    pub rewrite_recursion_limit: u32,
    /// Optional hard cap on rewrite attempts, to bound pathological
    /// inputs; `None` means bounded only by `rewrite_recursion_limit`.
    pub max_rewrite_steps: Option<u64>,
    pub extensions: Extensions,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            simplify_steps: 2,
            rewrite_recursion_limit: 5,
            max_rewrite_steps: None,
            extensions: Extensions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_json() {
        let cfg = AnalyzerConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: AnalyzerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
