//! Rule evaluation engine.
//!
//! This module is the *public entry point* for running scraper functions. The
//! engine is split into focused submodules under `src/engine/` while keeping
//! public paths flat (for example `crate::engine::Interpreter` and
//! `crate::engine::Registers`).
//!
//! ## How the parts work together
//!
//! Invoking a function is a pipeline over a shared register file:
//!
//! ```text
//! ScraperDefinition ──┐
//!                     │  Interpreter::new            (interpreter.rs)
//!                     │    - runs <GetSettings> into a Settings table
//!                     v
//! caller ── set_buffer(i, text) ──> Registers        (registers.rs)
//!                     │
//!                     v
//!             Interpreter::invoke(name)
//!                     │
//!                     v
//!             Evaluator::evaluate_group              (walker.rs)
//!               - guard check                        (condition.rs)
//!               - nested rules first, then the rule
//!                     │
//!                     v
//!             Evaluator::run_step                    (expression.rs)
//!               - input/output/pattern templates     (template.rs)
//!               - regex matching + backreferences    (expand.rs)
//!               - !!!CLEAN!!! / !!!TRIM!!! post-pass (cleanup.rs)
//!               - write to dest buffer
//!                     │
//!                     v
//!             result buffer ── $INFO[..] ──> String (buffers cleared)
//! ```
//!
//! ## Responsibilities by module
//!
//! - `registers.rs`: the numbered buffers, 1-based, with ASCII normalization
//!   on every write.
//! - `template.rs`: `$$N`, `\n` and `$INFO[id]` substitution.
//! - `condition.rs`: `conditional="[!]name"` guards.
//! - `expand.rs`: output template expansion against one regex match.
//! - `cleanup.rs`: marking and post-processing of cleaned/trimmed groups.
//! - `walker.rs` + `expression.rs`: the rule tree walk and per-rule execution.
//! - `interpreter.rs`: function dispatch, settings bootstrap, buffer lifetime.
//! - `metrics.rs`: counters for one invocation.
//!
//! ## Debugging
//!
//! Everything is logged through the `log` facade: `debug` shows each rule's
//! expression and skipped guards, `trace` adds matches and buffer contents.
//! The `scrapxml` binary turns this on with `-v` or `SCRAPXML_LOG=trace`.

#[path = "engine/cleanup.rs"]
pub(crate) mod cleanup;
#[path = "engine/condition.rs"]
pub mod condition;
#[path = "engine/expand.rs"]
mod expand;
#[path = "engine/expression.rs"]
mod expression;
#[path = "engine/interpreter.rs"]
mod interpreter;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/registers.rs"]
mod registers;
#[path = "engine/template.rs"]
pub mod template;
#[path = "engine/walker.rs"]
mod walker;

#[cfg(test)]
#[path = "engine/tests.rs"]
mod tests;

pub use cleanup::{CLEAN_MARK, TRIM_MARK};
pub use expand::expand;
pub use interpreter::{GET_SETTINGS, Interpreter};
pub use metrics::{Invocation, InvokeMetrics};
pub use registers::{DEFAULT_BUFFER_COUNT, Registers, normalize};
