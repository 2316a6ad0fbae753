/// Compile a literal pattern on first use and hand out a `&'static Regex`.
///
/// Only for patterns written in this crate; rule patterns from scraper
/// definitions are compiled by the interpreter and cached per instance.
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).expect("static pattern compiles"));
        &*RE
    }};
}
