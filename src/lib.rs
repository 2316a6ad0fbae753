//! An interpreter for XML scraper definitions.
//!
//! A scraper definition is a set of named functions; each function is a tree
//! of regex rules that read and write a shared file of numbered text buffers.
//! Callers put fetched pages into the buffers, invoke a function by name, and
//! read the XML it builds back out.
//!
//! - [`Interpreter`] runs functions of one [`ScraperDefinition`].
//! - [`Scraper`] adds URL fetching, caching and domain models on top.
//! - [`run`] / [`run_with`] are one-shot conveniences.

#[macro_use]
mod macros;
mod api;
mod definition;
mod engine;
mod error;
mod fetch;
mod models;
mod scraper;
mod settings;
mod url;
pub mod xml;

pub use api::{Options, run, run_verbose_with, run_with};
pub use definition::{
    ContentKind, Destination, Expression, Function, GroupSet, Guard, NodeId, RuleArena, RuleNode, RuleStep,
    ScraperDefinition,
};
pub use engine::{DEFAULT_BUFFER_COUNT, GET_SETTINGS, Interpreter, Invocation, InvokeMetrics, Registers, normalize};
pub use error::{Result, ScraperError};
pub use fetch::{Fetched, Fetcher, MemoryFetcher, UrlCache, retrieve};
pub use models::{Details, Episode, EpisodeDetails, LookupResult, MovieDetails, TvShowDetails};
pub use scraper::{
    CREATE_SEARCH_URL, CustomHandler, GET_DETAILS, GET_EPISODE_DETAILS, GET_EPISODE_LIST, GET_SEARCH_RESULTS,
    Scraper, quote_plus, search_terms,
};
pub use settings::{Setting, SettingKind, SettingValue, Settings};
pub use url::UrlDescriptor;

/// Template and guard helpers, exposed for tools that inspect rules.
pub mod template {
    pub use crate::engine::condition::{evaluate as evaluate_guard, evaluate_raw as evaluate_conditional};
    pub use crate::engine::template::{substitute, substitute_registers};
    pub use crate::engine::{CLEAN_MARK, TRIM_MARK, expand};
}
