//! A scraper session: the interpreter plus the fetching glue around it.
//!
//! The session knows which buffers each well-known function expects and how
//! to turn the XML it returns into domain objects:
//!
//! ```text
//! lookup("Fight.Club.DVDRip")
//!   create_search_url  buffer 1 = "fight+club+"          -> <url>..</url>
//!   get_search_results buffer 1 = page, 2 = url          -> <results><entity>..
//! get_details(result)  buffer 1..n = link pages, n+1 = id -> <details>..
//! custom_functions     buffer 1 = page of <url function=..> (recursive)
//! ```

use crate::definition::{ContentKind, ScraperDefinition};
use crate::engine::Interpreter;
use crate::error::{Result, ScraperError};
use crate::fetch::{self, Fetched, Fetcher, UrlCache};
use crate::models::{Details, Episode, EpisodeDetails, LookupResult, MovieDetails, TvShowDetails};
use crate::url::UrlDescriptor;
use crate::xml::{self, Element};
use std::collections::HashMap;

pub const CREATE_SEARCH_URL: &str = "CreateSearchUrl";
pub const GET_SEARCH_RESULTS: &str = "GetSearchResults";
pub const GET_DETAILS: &str = "GetDetails";
pub const GET_EPISODE_LIST: &str = "GetEpisodeList";
pub const GET_EPISODE_DETAILS: &str = "GetEpisodeDetails";

/// Receives the output of one custom function.
pub type CustomHandler = Box<dyn FnMut(&str) + Send>;

pub struct Scraper<F: Fetcher> {
    interpreter: Interpreter,
    fetcher: F,
    cache: UrlCache,
    handlers: HashMap<String, CustomHandler>,
}

impl<F: Fetcher> Scraper<F> {
    pub fn new(definition: ScraperDefinition, fetcher: F, cache: UrlCache) -> Result<Self> {
        Ok(Scraper { interpreter: Interpreter::new(definition)?, fetcher, cache, handlers: HashMap::new() })
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn cache(&self) -> &UrlCache {
        &self.cache
    }

    /// Register `handler` for the output of custom function `name`
    /// (case-insensitive). A later registration replaces an earlier one.
    pub fn register_handler(&mut self, name: &str, handler: impl FnMut(&str) + Send + 'static) {
        self.handlers.insert(name.to_lowercase(), Box::new(handler));
    }

    /// Turn a free-form title (often a file name) into the scraper's search URL.
    pub fn create_search_url(&mut self, search: &str) -> Result<String> {
        let terms = search_terms(search);
        log::debug!("create_search_url: {search:?} -> {terms:?}");
        self.interpreter.set_buffer(1, &terms, false)?;
        self.interpreter.invoke(CREATE_SEARCH_URL)
    }

    /// Fetch the search page at `url` and run `GetSearchResults` over it.
    pub fn get_search_results(&mut self, url: &str) -> Result<String> {
        let url = UrlDescriptor::parse(url, None, self.interpreter.settings())?;
        let page = self.fetch_required(&url)?;
        self.interpreter.set_buffer(1, page.first(), false)?;
        self.interpreter.set_buffer(2, url.url.as_deref().unwrap_or(""), false)?;
        self.interpreter.invoke(GET_SEARCH_RESULTS)
    }

    pub fn lookup(&mut self, search: &str) -> Result<Vec<LookupResult>> {
        let url = self.create_search_url(search)?;
        log::debug!("lookup: search url {url}");
        let results = self.get_search_results(&url)?;
        LookupResult::parse_list(&results, self.interpreter.settings())
    }

    /// Fetch every link of `result` into buffers `1..=n`, its id into `n+1`,
    /// and run `GetDetails`.
    pub fn get_details(&mut self, result: &LookupResult) -> Result<Details> {
        let mut index = 0;
        for link in &result.links {
            index += 1;
            let page = self.retrieve(link)?;
            if page.is_none() {
                log::warn!("get_details: nothing retrieved for {link}; buffer {index} left empty");
            }
            // Multi-part responses only ever feed their first part.
            let data = page.as_ref().map(Fetched::first).unwrap_or("");
            self.interpreter.set_buffer(index, data, false)?;
        }
        log::debug!("get_details: buffer {} = id {:?}", index + 1, result.id);
        self.interpreter.set_buffer(index + 1, result.id.as_deref().unwrap_or(""), false)?;

        let details = self.interpreter.invoke(GET_DETAILS)?;
        let settings = self.interpreter.settings();
        Ok(match self.interpreter.definition().content {
            ContentKind::Movies => Details::Movie(MovieDetails::parse(&details, settings)?),
            ContentKind::TvShows => Details::TvShow(TvShowDetails::parse(&details, settings)?),
        })
    }

    pub fn get_episode_list(&mut self, show: &TvShowDetails) -> Result<Vec<Episode>> {
        let mut episodes = Vec::new();
        for url in &show.episode_guide_urls {
            let Some(page) = self.retrieve(url)? else {
                log::warn!("get_episode_list: nothing retrieved for {url}");
                continue;
            };
            self.interpreter.set_buffer(1, page.first(), false)?;
            self.interpreter.set_buffer(2, url.url.as_deref().unwrap_or(""), false)?;
            let list = self.interpreter.invoke(GET_EPISODE_LIST)?;
            episodes.extend(Episode::parse_list(&list, self.interpreter.settings())?);
        }
        Ok(episodes)
    }

    /// Run `GetEpisodeDetails` for `episode` and attach the result to it.
    pub fn get_episode_details(&mut self, episode: &mut Episode) -> Result<()> {
        let url =
            episode.url.clone().ok_or_else(|| ScraperError::BadUrl(format!("episode '{}' has no url", episode.title)))?;
        let page = self.fetch_required(&url)?;
        self.interpreter.set_buffer(1, page.first(), false)?;
        self.interpreter.set_buffer(2, episode.id.as_deref().unwrap_or(""), false)?;

        let details = EpisodeDetails::parse(&self.interpreter.invoke(GET_EPISODE_DETAILS)?)?;
        log::debug!("episode details for '{}': {} bytes", episode.title, details.xml.len());
        if !details.title.is_empty() {
            episode.title = details.title.clone();
        }
        episode.episode_number = details.episode_number.or(episode.episode_number);
        episode.season_number = details.season_number.or(episode.season_number);
        episode.details = Some(details);
        Ok(())
    }

    /// Run the custom functions named by `<url function="...">` elements in
    /// `document`, recursing into what each one returns.
    ///
    /// Every function's output is passed to its registered handler and also
    /// collected, depth first, into the returned list. Malformed input is
    /// logged and yields nothing.
    pub fn custom_functions(&mut self, document: &str) -> Result<Vec<String>> {
        let root = match xml::parse_root(document) {
            Ok(root) => root,
            Err(e) => {
                log::error!("custom_functions: skipping malformed xml ({e})");
                return Ok(Vec::new());
            }
        };
        let urls: Vec<&Element> = if root.name.eq_ignore_ascii_case("url") {
            vec![&root]
        } else {
            root.children_named("url").collect()
        };

        let mut outputs = Vec::new();
        for element in urls {
            let url = UrlDescriptor::from_element(element, None, self.interpreter.settings())?;
            let Some(function) = url.function.clone() else { continue };
            let Some(page) = self.retrieve(&url)? else {
                log::warn!("custom_functions: nothing retrieved for {url}, skipping <{function}>");
                continue;
            };
            log::debug!("custom_functions: <{function}> over {url}");

            self.interpreter.set_buffer(1, page.first(), false)?;
            let output = self.interpreter.invoke(&function)?;
            match self.handlers.get_mut(&function.to_lowercase()) {
                Some(handler) => handler(output.as_str()),
                None => log::debug!("custom_functions: no handler registered for <{function}>"),
            }
            let nested = self.custom_functions(&output)?;
            outputs.push(output);
            outputs.extend(nested);
        }
        Ok(outputs)
    }

    fn retrieve(&mut self, url: &UrlDescriptor) -> Result<Option<Fetched>> {
        fetch::retrieve(&mut self.fetcher, &mut self.cache, url)
    }

    fn fetch_required(&mut self, url: &UrlDescriptor) -> Result<Fetched> {
        self.retrieve(url)?.ok_or_else(|| ScraperError::BadUrl(format!("nothing to fetch for {url}")))
    }
}

/// Lower-case, treat `.`, `-`, `_` as spaces, quote, and cut at the first
/// release tag (`+dvdrip`, `+xvid`, `+cd1`, ...).
pub fn search_terms(search: &str) -> String {
    let spaced: String =
        search.to_lowercase().chars().map(|c| if matches!(c, '.' | '-' | '_') { ' ' } else { c }).collect();
    let quoted = quote_plus(&spaced);
    let tags = regex!(
        r"\+(ac3|custom|dc|divx|dsr|dsrip|dutch|dvd|dvdrip|dvdscr|fragment|fs|hdtv|internal|limited|multisubs|ntsc|ogg|ogm|pal|pdtv|proper|repack|rerip|retail|se|svcd|swedish|unrated|ws|xvid|xxx|cd[1-9]|\[.*\])(\+|$)"
    );
    match tags.captures(&quoted).and_then(|c| c.get(1)) {
        Some(tag) => quoted[..tag.start()].to_string(),
        None => quoted,
    }
}

/// Form-encode `text`: spaces become `+`, everything outside
/// `[A-Za-z0-9_.-]` is percent-encoded byte by byte.
pub fn quote_plus(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b' ' => out.push('+'),
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'.' | b'-' => out.push(byte as char),
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}
