//! Rule tree walking.
//!
//! A function is a chain of sibling rules; any rule may carry a nested chain.
//! The walk is depth-first and pre-order over the nested chain:
//!
//! ```text
//! <RegExp A>            visit order:
//!   <RegExp A1/>          A1, A2, A, B
//!   <RegExp A2/>
//! </RegExp>
//! <RegExp B/>
//! ```
//!
//! A rule whose guard fails is skipped together with everything nested in it.
//! Nested rules run before their parent so that the parent's `input` and
//! `output` templates can read what they wrote. All communication goes through
//! the shared registers; the walk itself returns nothing.

use super::condition;
use super::metrics::InvokeMetrics;
use super::registers::Registers;
use crate::definition::{NodeId, RuleArena};
use crate::error::Result;
use crate::settings::Settings;
use regex::Regex;
use std::collections::HashMap;

/// Mutable state for one invocation.
pub(crate) struct Evaluator<'a> {
    pub(super) arena: &'a RuleArena,
    pub(super) registers: &'a mut Registers,
    pub(super) settings: &'a Settings,
    /// Compiled patterns, keyed by the fully substituted pattern text.
    pub(super) regex_cache: &'a mut HashMap<String, Regex>,
    pub(super) metrics: &'a mut InvokeMetrics,
    pub(super) depth: usize,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(
        arena: &'a RuleArena,
        registers: &'a mut Registers,
        settings: &'a Settings,
        regex_cache: &'a mut HashMap<String, Regex>,
        metrics: &'a mut InvokeMetrics,
    ) -> Self {
        Evaluator { arena, registers, settings, regex_cache, metrics, depth: 0 }
    }

    /// Evaluate a sibling chain of rules, left to right.
    pub(crate) fn evaluate_group(&mut self, chain: &[NodeId]) -> Result<()> {
        let arena = self.arena;
        self.depth += 1;
        self.metrics.max_depth = self.metrics.max_depth.max(self.depth);
        log::trace!("{}^^^ entering rule chain ({} rules)", self.indent(), chain.len());

        for &id in chain {
            let node = arena.get(id);
            if !condition::evaluate(node.guard(), self.settings) {
                log::debug!("{}skipping rule {}: guard {:?} is false", self.indent(), id.0, node.guard());
                self.metrics.rules_skipped += 1;
                continue;
            }
            if !node.children().is_empty() {
                self.evaluate_group(node.children())?;
            }
            self.metrics.rules_visited += 1;
            self.run_step(node.step())?;
        }

        log::trace!("{}vvv leaving rule chain", self.indent());
        self.depth -= 1;
        Ok(())
    }

    pub(super) fn indent(&self) -> String {
        "  ".repeat(self.depth)
    }
}
