//! The function dispatcher: the public face of the engine.

use super::metrics::{Invocation, InvokeMetrics};
use super::registers::Registers;
use super::walker::Evaluator;
use crate::api::Options;
use crate::definition::ScraperDefinition;
use crate::error::{Result, ScraperError};
use crate::settings::Settings;
use regex::Regex;
use std::collections::HashMap;
use std::time::Instant;

/// Name of the function whose output defines the settings table.
pub const GET_SETTINGS: &str = "GetSettings";

/// Executes the functions of one scraper definition.
///
/// An interpreter owns one register file and one settings table. It is not
/// re-entrant: callers put their inputs in the buffers, invoke a function,
/// and get the result back with every buffer already cleared.
///
/// ```text
/// set_buffer(1, page) ──> invoke("GetDetails") ──> "<details>...</details>"
///                               │
///                               └─ buffers cleared
/// ```
#[derive(Debug)]
pub struct Interpreter {
    definition: ScraperDefinition,
    registers: Registers,
    settings: Settings,
    regex_cache: HashMap<String, Regex>,
}

impl Interpreter {
    /// Create an interpreter with default [`Options`].
    pub fn new(definition: ScraperDefinition) -> Result<Self> {
        Self::with_options(definition, &Options::default())
    }

    /// Parse `xml` as a scraper definition and create an interpreter for it.
    pub fn from_xml(xml: &str) -> Result<Self> {
        Self::new(ScraperDefinition::parse(xml)?)
    }

    /// Create an interpreter and build its settings table by running the
    /// definition's `GetSettings` function (if it has one).
    pub fn with_options(definition: ScraperDefinition, options: &Options) -> Result<Self> {
        let mut interpreter = Interpreter {
            definition,
            registers: Registers::new(options.buffer_count),
            settings: Settings::implicit(),
            regex_cache: HashMap::new(),
        };

        if interpreter.definition.function(GET_SETTINGS).is_some() {
            let settings_xml = interpreter.invoke(GET_SETTINGS)?;
            interpreter.settings = Settings::from_xml(&settings_xml)?;
        } else {
            log::debug!("scraper '{}' has no <{GET_SETTINGS}>; using implicit settings", interpreter.definition.name);
        }
        Ok(interpreter)
    }

    /// Run function `name` and return the content of its result buffer.
    pub fn invoke(&mut self, name: &str) -> Result<String> {
        self.invoke_with_metrics(name).map(|inv| inv.value)
    }

    /// Like [`invoke`](Self::invoke) but also returns the run's counters.
    pub fn invoke_with_metrics(&mut self, name: &str) -> Result<Invocation> {
        self.dispatch(name, None)
    }

    /// Run function `name` against a caller-supplied settings table instead
    /// of the interpreter's own.
    pub fn invoke_with_settings(&mut self, name: &str, settings: &Settings) -> Result<String> {
        self.dispatch(name, Some(settings)).map(|inv| inv.value)
    }

    fn dispatch(&mut self, name: &str, caller_settings: Option<&Settings>) -> Result<Invocation> {
        let start = Instant::now();
        let function =
            self.definition.function(name).ok_or_else(|| ScraperError::UnknownFunction(name.to_string()))?;
        let settings = caller_settings.unwrap_or(&self.settings);
        log::debug!("invoke <{}>, result buffer {}", function.name, function.result_buffer);

        let mut metrics = InvokeMetrics::default();
        let walked = {
            let mut evaluator = Evaluator::new(
                self.definition.arena(),
                &mut self.registers,
                settings,
                &mut self.regex_cache,
                &mut metrics,
            );
            evaluator.evaluate_group(&function.roots)
        };
        let outcome = walked
            .and_then(|()| self.registers.get(function.result_buffer).map(str::to_string))
            .and_then(|raw| settings.expand_info(&raw));

        // Nothing survives an invocation, successful or not.
        self.registers.clear_all();

        let value = outcome?;
        metrics.total = start.elapsed();
        log::debug!("invoke <{}> -> {} bytes in {:?}", function.name, value.len(), metrics.total);
        Ok(Invocation { function: function.name.clone(), result_buffer: function.result_buffer, value, metrics })
    }

    /// Store `value` in buffer `index` (1-based).
    pub fn set_buffer(&mut self, index: usize, value: &str, append: bool) -> Result<()> {
        self.registers.set(index, value, append)
    }

    /// Current content of buffer `index` (1-based).
    pub fn get_buffer(&self, index: usize) -> Result<String> {
        self.registers.get(index).map(str::to_string)
    }

    pub fn clear_buffers(&mut self) {
        self.registers.clear_all();
    }

    pub fn buffer_count(&self) -> usize {
        self.registers.count()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn definition(&self) -> &ScraperDefinition {
        &self.definition
    }

    #[cfg(test)]
    pub(super) fn cached_patterns(&self) -> usize {
        self.regex_cache.len()
    }
}
