//! Running one rule's `<expression>`.
//!
//! ```text
//! input template ──substitute──> haystack
//! output template ─substitute──> mark \1..\8 ──┐
//! pattern ──$INFO──substitute──> Regex ────────┤
//!                                              v
//!                  for each match: expand -> clean/trim -> substitute
//!                                              │
//!                               compare filter │
//!                                              v
//!                                       dest buffer
//! ```
//!
//! The output template is substituted once, before matching, so any `$$N`
//! it mentions reads the registers as they were when the rule started.
//!
//! Write mode: without a `+` on `dest` the destination is emptied on the
//! first match and later matches of the same rule append to it; with `+`
//! every match appends. `clear="yes"` empties the destination up front, so a
//! rule that matches nothing still leaves it empty.
//!
//! Patterns are compiled by the `regex` crate, so lookaround and
//! backreferences inside a pattern are rejected with [`ScraperError::Regex`].
//! Only patterns without `$$N` or `$INFO[..]` tokens are cached: the others
//! change with every buffer value.

use super::cleanup;
use super::expand::expand;
use super::template::substitute;
use super::walker::Evaluator;
use crate::definition::RuleStep;
use crate::error::{Result, ScraperError};
use regex::{Regex, RegexBuilder};

impl Evaluator<'_> {
    pub(super) fn run_step(&mut self, step: &RuleStep) -> Result<()> {
        let input = match &step.input {
            Some(template) => substitute(template, self.registers, self.settings)?,
            None => self.registers.get(1)?.to_string(),
        };
        let output = substitute(&step.output, self.registers, self.settings)?;

        let Some(expr) = &step.expression else {
            log::trace!("{}rule has no <expression>", self.indent());
            return Ok(());
        };

        let pattern = substitute(&self.settings.expand_info(&expr.pattern)?, self.registers, self.settings)?;
        let re = self.compile(&pattern, is_static(&expr.pattern))?;
        let dest = step.dest;
        log::debug!(
            "{}expression /{}/ -> dest {}{} output {:?} (repeat={}, clear={})",
            self.indent(),
            preview(&pattern, 60),
            dest.buffer,
            if dest.append { "+" } else { "" },
            output,
            expr.repeat,
            expr.clear
        );

        if expr.clear {
            self.registers.set(dest.buffer, "", false)?;
        }
        if let Some(compare) = expr.compare {
            let lowered = self.registers.get(compare)?.to_lowercase();
            self.registers.set(compare, &lowered, false)?;
        }

        let template = cleanup::mark_backreferences(&output, expr.no_clean, expr.trim);
        let mut append = dest.append;

        for caps in re.captures_iter(&input) {
            self.metrics.matches += 1;
            if log::log_enabled!(log::Level::Trace) {
                let groups: Vec<&str> = caps.iter().skip(1).flatten().map(|m| preview(m.as_str(), 20)).collect();
                log::trace!("{}matched: {:?}", self.indent(), groups);
            }

            if !append {
                self.registers.set(dest.buffer, "", false)?;
                append = true;
            }

            if let Some(group) = expr.optional {
                log::warn!("{}optional group \\{group} stripping is not supported", self.indent());
                return Err(ScraperError::UnsupportedOptionalGroup(group));
            }

            match expand(&template, &re, &caps) {
                None => {
                    self.metrics.discarded_expansions += 1;
                    log::debug!("{}could not expand {:?}; match dropped", self.indent(), output);
                }
                Some(result) if !result.is_empty() => {
                    let result = cleanup::process(&result);
                    let result = substitute(&result, self.registers, self.settings)?;
                    let accepted = match expr.compare {
                        Some(compare) => result.to_lowercase().contains(self.registers.get(compare)?),
                        None => true,
                    };
                    if accepted {
                        self.registers.set(dest.buffer, &result, append)?;
                        self.metrics.writes += 1;
                    } else {
                        self.metrics.compare_rejections += 1;
                    }
                }
                Some(_) => {}
            }

            if !expr.repeat {
                break;
            }
        }

        log::trace!("{}dest {} = {:?}", self.indent(), dest.buffer, preview(self.registers.get(dest.buffer)?, 80));
        Ok(())
    }

    /// Compile `pattern` with dot-matches-newline. Cacheable patterns are
    /// compiled once per interpreter.
    fn compile(&mut self, pattern: &str, cacheable: bool) -> Result<Regex> {
        if let Some(re) = self.regex_cache.get(pattern) {
            return Ok(re.clone());
        }
        let re = RegexBuilder::new(pattern)
            .dot_matches_new_line(true)
            .build()
            .map_err(|source| ScraperError::Regex { pattern: pattern.to_string(), source })?;
        if cacheable {
            self.regex_cache.insert(pattern.to_string(), re.clone());
        }
        Ok(re)
    }
}

/// A raw pattern that resolves to the same text on every run.
fn is_static(raw: &str) -> bool {
    !raw.contains("$$") && !raw.contains("$INFO[")
}

fn preview(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
