//! Crate error type.
//!
//! Failures fall into a few families with different policies:
//!
//! - definition problems (`Xml`, `Definition`, `UnknownFunction`) are fatal to
//!   the invocation and surfaced unchanged;
//! - `BufferOutOfRange` is a programmer error at the call site;
//! - `UnknownSetting` comes only from the strict lookup paths (`Settings::set`,
//!   `$INFO[..]` substitution). The tolerant accessor used by guards never
//!   produces it;
//! - `UnsupportedOptionalGroup` marks the optional-group stripping step, which
//!   is not implemented.
//!
//! A backreference that cannot be expanded is not an error at all: the match
//! is dropped and evaluation carries on.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("invalid scraper definition: {0}")]
    Definition(String),

    #[error("unknown function <{0}>")]
    UnknownFunction(String),

    #[error("buffer index {index} out of range (valid buffers are 1..={max})")]
    BufferOutOfRange { index: usize, max: usize },

    #[error("unknown setting '{0}'")]
    UnknownSetting(String),

    #[error("invalid expression {pattern:?}: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("optional group \\{0} is not supported")]
    UnsupportedOptionalGroup(usize),

    #[error("bad url: {0}")]
    BadUrl(String),

    #[error("fetch failed: {0}")]
    Fetch(String),
}

pub type Result<T> = std::result::Result<T, ScraperError>;
