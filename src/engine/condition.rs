//! Rule guards (`conditional="fanart"`, `conditional="!fanart"`).
//!
//! A guard holds when its setting is a bool set to `true`. Anything else,
//! including an id the settings table has never heard of, counts as false.
//! Negation is applied last.

use crate::definition::Guard;
use crate::settings::Settings;

pub fn evaluate(guard: &Guard, settings: &Settings) -> bool {
    match guard {
        Guard::Always => true,
        Guard::Setting { name, negated } => settings.get(name).is_true() != *negated,
    }
}

/// Evaluate a raw `conditional` attribute value.
pub fn evaluate_raw(conditional: &str, settings: &Settings) -> bool {
    evaluate(&Guard::parse(conditional), settings)
}
