//! Clean/trim post-processing of expanded output.
//!
//! Before a match is expanded, each backreference in the output template is
//! bracketed with sentinels saying what should happen to the captured text:
//!
//! ```text
//! output:   "<title>\1</title>"      (group 1 cleaned, not trimmed)
//! marked:   "<title>⟦C\1⟦C</title>"
//! expanded: "<title>⟦C  Fight Club ⟦C</title>"
//! cleaned:  "<title>Fight Club</title>"
//! ```
//!
//! The sentinels are private-use code points. Registers and templates are
//! normalized to ASCII before any of this happens, so neither captured text
//! nor literal template text can contain them.
//!
//! "Cleaning" is meant to turn HTML into plain text. The rule format has
//! always shipped it as a trim and scrapers depend on that, so it stays a
//! trim.

use crate::definition::GroupSet;
use regex::Captures;

/// Brackets text that must be cleaned.
pub const CLEAN_MARK: char = '\u{E000}';
/// Brackets text that must be trimmed.
pub const TRIM_MARK: char = '\u{E001}';

/// Strip the sentinels from `text`, cleaning and trimming the spans they mark.
pub fn process(text: &str) -> String {
    let cleaned = regex!(r"(?s)\x{E000}(.*?)\x{E000}").replace_all(text, |caps: &Captures<'_>| clean(&caps[1]));
    let trimmed = regex!(r"(?s)\x{E001}(.*?)\x{E001}").replace_all(&cleaned, |caps: &Captures<'_>| trim(&caps[1]));

    // Spans around empty captures are normally consumed above; drop any pair
    // that survived.
    let mut result = trimmed.into_owned();
    for mark in [CLEAN_MARK, TRIM_MARK] {
        let pair: String = [mark, mark].iter().collect();
        if result.contains(&pair) {
            result = result.replace(&pair, "");
        }
    }
    result
}

fn clean(span: &str) -> String {
    span.trim().to_string()
}

fn trim(span: &str) -> String {
    span.trim().to_string()
}

/// Wrap `\1`..`\8` in `template` with the sentinels their group settings ask for.
pub fn mark_backreferences(template: &str, no_clean: GroupSet, trim: GroupSet) -> String {
    let mut marked = template.to_string();
    for group in 1..=8 {
        let token = format!("\\{group}");
        if !marked.contains(&token) {
            continue;
        }
        if !no_clean.has(group) {
            marked = marked.replace(&token, &format!("{CLEAN_MARK}{token}{CLEAN_MARK}"));
        }
        if trim.has(group) {
            marked = marked.replace(&token, &format!("{TRIM_MARK}{token}{TRIM_MARK}"));
        }
    }
    marked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean_span(s: &str) -> String {
        format!("{CLEAN_MARK}{s}{CLEAN_MARK}")
    }

    fn trim_span(s: &str) -> String {
        format!("{TRIM_MARK}{s}{TRIM_MARK}")
    }

    #[test]
    fn marks_cleaned_and_trimmed_groups() {
        let marked = mark_backreferences("<a>\\1</a><b>\\2</b>", GroupSet::G2, GroupSet::G1);
        assert_eq!(marked, format!("<a>{}</a><b>\\2</b>", clean_span(&trim_span("\\1"))));
    }

    #[test]
    fn groups_above_eight_are_never_marked() {
        assert_eq!(mark_backreferences("\\9", GroupSet::empty(), GroupSet::G9), "\\9");
    }

    #[test]
    fn adjacent_spans_stay_separate() {
        let text = format!("{}{}", clean_span(" a "), clean_span(" b "));
        assert_eq!(process(&text), "ab");
    }

    #[test]
    fn cleaning_only_trims() {
        let text = clean_span("  <b>Fight</b> Club \n");
        assert_eq!(process(&text), "<b>Fight</b> Club");
    }

    #[test]
    fn nested_markers_and_empty_captures() {
        let text = format!("[{}][{}]", clean_span(&trim_span("  x ")), clean_span(""));
        assert_eq!(process(&text), "[x][]");
        assert_eq!(process(&format!("{TRIM_MARK}{TRIM_MARK}")), "");
    }
}
