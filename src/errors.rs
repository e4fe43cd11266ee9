//! Error types for shapearith
//!
//! Provides unified error handling across the crate, following the
//! taxonomy of value/type/internal/key errors the analyzer distinguishes
//! between soft failures (returned as lattice-top or `false`) and hard
//! programmer errors (returned as `Err`).

use thiserror::Error;

/// Main error type for shapearith operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalyzerError {
    /// Invalid operand: divide-by-zero constant fold, out-of-range shift
    /// amount, `min_value`/`max_value` of an unsupported dtype, mixing
    /// incompatible dtypes, non-boolean condition to `if_then_else`.
    #[error("value error: {0}")]
    Value(String),

    /// Operator applied to an unsupported dtype (e.g. `truncdiv` on float).
    #[error("type error: {0}")]
    Type(String),

    /// Invariant violation: malformed `SplitExpr`, lost constraint-stack
    /// bookkeeping, a non-normalized `Comparison`, or unbounded recursion
    /// detected by a depth counter.
    #[error("internal error: {0}")]
    Internal(String),

    /// Lookup of a missing global symbol (FFI boundary only).
    #[error("key error: {0}")]
    Key(String),
}

impl AnalyzerError {
    pub fn value(msg: impl Into<String>) -> Self {
        AnalyzerError::Value(msg.into())
    }
    pub fn type_error(msg: impl Into<String>) -> Self {
        AnalyzerError::Type(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        AnalyzerError::Internal(msg.into())
    }
    pub fn key(msg: impl Into<String>) -> Self {
        AnalyzerError::Key(msg.into())
    }
}

/// Result type alias for shapearith operations.
pub type Result<T> = std::result::Result<T, AnalyzerError>;
