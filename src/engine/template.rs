//! Template substitution.
//!
//! Applied to `input`/`output` attributes, expression patterns, and again to
//! every expanded match result. The passes run in a fixed order:
//!
//! ```text
//! "Title: $$10 / $$1\n$INFO[language]"
//!   1. normalize      non-ASCII -> &#NNN;
//!   2. registers      $$N .. $$1   (highest index first)
//!   3. escapes        two-character "\n" -> newline
//!   4. settings       $INFO[id] -> value (unknown id is an error)
//! ```
//!
//! Step 2 walks the registers from the top down. Going upwards would let
//! `$$1` consume the front of `$$10` and leave a stray `0` behind.

use super::registers::{Registers, normalize};
use crate::error::Result;
use crate::settings::Settings;

/// Run all substitution passes over `text`.
pub fn substitute(text: &str, registers: &Registers, settings: &Settings) -> Result<String> {
    let mut result = substitute_registers(&normalize(text), registers);
    if result.contains("\\n") {
        result = result.replace("\\n", "\n");
    }
    settings.expand_info(&result)
}

/// Replace `$$N` tokens with buffer contents, highest index first.
pub fn substitute_registers(text: &str, registers: &Registers) -> String {
    let mut result = text.to_string();
    if !result.contains("$$") {
        return result;
    }
    for (index, value) in registers.iter_descending() {
        let token = format!("$${index}");
        if result.contains(&token) {
            result = result.replace(&token, value);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScraperError;
    use proptest::prelude::*;

    #[test]
    fn longer_register_tokens_win() {
        let mut regs = Registers::default();
        regs.set(1, "Y", false).unwrap();
        regs.set(10, "X", false).unwrap();
        regs.set(12, "Z", false).unwrap();
        let out = substitute("$$10|$$1|$$12|$$2", &regs, &Settings::default()).unwrap();
        assert_eq!(out, "X|Y|Z|");
    }

    #[test]
    fn newline_escape_and_info() {
        let regs = Registers::default();
        let settings = Settings::default();
        assert_eq!(substitute("a\\nb", &regs, &settings).unwrap(), "a\nb");
        assert_eq!(substitute("lang=$INFO[language]", &regs, &settings).unwrap(), "lang=en");
        assert!(matches!(
            substitute("$INFO[fanart]", &regs, &settings),
            Err(ScraperError::UnknownSetting(id)) if id == "fanart"
        ));
    }

    #[test]
    fn normalizes_before_substituting() {
        let mut regs = Registers::default();
        regs.set(2, "ü", false).unwrap();
        assert_eq!(substitute("é $$2", &regs, &Settings::default()).unwrap(), "&#233; &#252;");
    }

    #[test]
    fn register_values_are_rescanned_by_lower_tokens() {
        // The value spliced in for $$3 contains "$$1"; the later $$1 pass
        // sees it, exactly as a plain string replace chain would.
        let mut regs = Registers::default();
        regs.set(3, "[$$1]", false).unwrap();
        regs.set(1, "one", false).unwrap();
        assert_eq!(substitute_registers("$$3", &regs), "[one]");
    }

    proptest! {
        #[test]
        fn two_digit_tokens_never_split(a in "[a-z]{0,8}", b in "[a-z]{0,8}", n in 10usize..=20) {
            let mut regs = Registers::default();
            regs.set(1, &a, false).unwrap();
            regs.set(n, &b, false).unwrap();
            let out = substitute_registers(&format!("$${n}:$$1"), &regs);
            prop_assert_eq!(out, format!("{b}:{a}"));
        }
    }
}
