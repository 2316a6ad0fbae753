//! Invocation metrics.
//!
//! Counters are collected on every invocation; they are plain integers and
//! cost next to nothing. [`Interpreter::invoke`](super::Interpreter::invoke)
//! drops them, [`Interpreter::invoke_with_metrics`](super::Interpreter::invoke_with_metrics)
//! hands them back for profiling and rule debugging.

use std::time::Duration;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvokeMetrics {
    /// Wall time for the whole invocation.
    pub total: Duration,
    /// Rule nodes whose guard held and whose expression ran.
    pub rules_visited: usize,
    /// Rule nodes (with their nested rules) skipped by a false guard.
    pub rules_skipped: usize,
    /// Regex matches processed across all rules.
    pub matches: usize,
    /// Buffer writes caused by matches.
    pub writes: usize,
    /// Matches dropped because the output template could not be expanded.
    pub discarded_expansions: usize,
    /// Matches not written because they failed the `compare` check.
    pub compare_rejections: usize,
    /// Deepest rule nesting reached (top-level rules are depth 1).
    pub max_depth: usize,
}

/// The result of one function invocation together with its metrics.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Function name as written in the definition.
    pub function: String,
    /// Buffer index the result was read from.
    pub result_buffer: usize,
    pub value: String,
    pub metrics: InvokeMetrics,
}
