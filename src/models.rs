//! Domain objects built from scraper output.
//!
//! Scraper functions return small XML documents; these types pull the fields
//! the rest of an application cares about out of them. Parsing is lenient:
//! numbers that do not parse become `None`, missing text becomes empty.

use crate::error::Result;
use crate::settings::Settings;
use crate::url::UrlDescriptor;
use crate::xml::{self, Element};
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

// --- Helpers ----------------------------------------------------------------

fn number<T: FromStr>(text: Option<String>) -> Option<T> {
    text.and_then(|t| t.trim().replace(',', "").parse().ok())
}

fn date(text: Option<String>) -> Option<NaiveDate> {
    let text = text?;
    let parsed = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok();
    if parsed.is_none() {
        log::debug!("unparseable date {text:?}");
    }
    parsed
}

/// Non-empty text of every child named `name`.
fn texts(element: &Element, name: &str) -> Vec<String> {
    element.children_named(name).map(Element::text).filter(|t| !t.is_empty()).collect()
}

fn urls(element: &Element, settings: &Settings) -> Result<Vec<UrlDescriptor>> {
    element.children_named("url").map(|u| UrlDescriptor::from_element(u, None, settings)).collect()
}

// --- Search results ---------------------------------------------------------

/// One `<entity>` of a search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupResult {
    pub title: Option<String>,
    pub id: Option<String>,
    pub links: Vec<UrlDescriptor>,
}

impl LookupResult {
    pub fn from_element(entity: &Element, settings: &Settings) -> Result<Self> {
        Ok(LookupResult {
            title: entity.child_text("title").map(|t| crate::engine::normalize(&t).into_owned()),
            id: entity.child_text("id"),
            links: urls(entity, settings)?,
        })
    }

    /// Parse every `<entity>` under the root of `results_xml`.
    pub fn parse_list(results_xml: &str, settings: &Settings) -> Result<Vec<Self>> {
        let root = xml::parse_root(results_xml)?;
        root.children_named("entity").map(|e| Self::from_element(e, settings)).collect()
    }
}

impl fmt::Display for LookupResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title.as_deref().unwrap_or("<untitled>"))?;
        if let Some(id) = &self.id {
            write!(f, " [{id}]")?;
        }
        Ok(())
    }
}

// --- Details ----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MovieDetails {
    pub id: Option<String>,
    pub title: String,
    pub year: Option<i32>,
    pub certifications: Vec<String>,
    pub runtime: Option<String>,
    pub rating: Option<f64>,
    pub votes: Option<u64>,
    pub genres: Vec<String>,
    pub studio: String,
    pub outline: String,
    pub plot: String,
    /// Follow-up URLs, usually carrying custom functions.
    pub urls: Vec<UrlDescriptor>,
    /// The `<details>` document this was parsed from.
    pub xml: String,
}

impl MovieDetails {
    pub fn parse(details_xml: &str, settings: &Settings) -> Result<Self> {
        let root = xml::parse_root(details_xml)?;
        Ok(MovieDetails {
            id: root.child_text("id"),
            title: root.child_text("title").unwrap_or_default(),
            year: number(root.child_text("year")),
            certifications: texts(&root, "certification"),
            runtime: root.child_text("runtime"),
            rating: number(root.child_text("rating")),
            votes: number(root.child_text("votes")),
            genres: texts(&root, "genre"),
            studio: root.child_text("studio").unwrap_or_default(),
            outline: root.child_text("outline").unwrap_or_default(),
            plot: root.child_text("plot").unwrap_or_default(),
            urls: urls(&root, settings)?,
            xml: details_xml.to_string(),
        })
    }
}

impl fmt::Display for MovieDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Title: {}", self.title)?;
        if let Some(year) = self.year {
            writeln!(f, "Year: {year}")?;
        }
        if !self.certifications.is_empty() {
            writeln!(f, "Certifications: {}", self.certifications.join(", "))?;
        }
        if let Some(runtime) = &self.runtime {
            writeln!(f, "Runtime: {runtime}")?;
        }
        if let Some(rating) = self.rating {
            writeln!(f, "Rating: {rating}")?;
        }
        if let Some(votes) = self.votes {
            writeln!(f, "Votes: {votes}")?;
        }
        if !self.genres.is_empty() {
            writeln!(f, "Genres: {}", self.genres.join(", "))?;
        }
        writeln!(f, "Studio: {}", self.studio)?;
        writeln!(f, "Outline: {}", self.outline)?;
        write!(f, "Plot: {}", self.plot)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TvShowDetails {
    pub id: Option<String>,
    pub title: String,
    pub premiered: Option<NaiveDate>,
    pub rating: Option<f64>,
    pub plot: String,
    pub genres: Vec<String>,
    pub thumbs: Vec<String>,
    pub fanart_url: Option<String>,
    pub episode_guide_urls: Vec<UrlDescriptor>,
    pub xml: String,
}

impl TvShowDetails {
    pub fn parse(details_xml: &str, settings: &Settings) -> Result<Self> {
        let root = xml::parse_root(details_xml)?;
        let episode_guide_urls = match root.first_child("episodeguide") {
            Some(guide) => urls(guide, settings)?,
            None => Vec::new(),
        };
        Ok(TvShowDetails {
            id: root.child_text("id"),
            title: root.child_text("title").unwrap_or_default(),
            premiered: date(root.child_text("premiered")),
            rating: number(root.child_text("rating")),
            plot: root.child_text("plot").unwrap_or_default(),
            genres: texts(&root, "genre"),
            thumbs: texts(&root, "thumb"),
            fanart_url: root.first_child("fanart").and_then(|f| f.attr("url")).map(str::to_string),
            episode_guide_urls,
            xml: details_xml.to_string(),
        })
    }
}

impl fmt::Display for TvShowDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Title: {}", self.title)?;
        if let Some(premiered) = self.premiered {
            writeln!(f, "Premiered: {premiered}")?;
        }
        if !self.genres.is_empty() {
            writeln!(f, "Genres: {}", self.genres.join(", "))?;
        }
        if let Some(rating) = self.rating {
            writeln!(f, "Rating: {rating}")?;
        }
        write!(f, "Plot: {}", self.plot)
    }
}

/// `GetDetails` output, shaped by the scraper's content kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Details {
    Movie(MovieDetails),
    TvShow(TvShowDetails),
}

impl Details {
    pub fn title(&self) -> &str {
        match self {
            Details::Movie(m) => &m.title,
            Details::TvShow(t) => &t.title,
        }
    }
}

impl fmt::Display for Details {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Details::Movie(m) => fmt::Display::fmt(m, f),
            Details::TvShow(t) => fmt::Display::fmt(t, f),
        }
    }
}

// --- Episodes ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    pub title: String,
    pub url: Option<UrlDescriptor>,
    pub episode_number: Option<u32>,
    pub season_number: Option<u32>,
    pub id: Option<String>,
    /// Filled in by [`Scraper::get_episode_details`](crate::Scraper::get_episode_details).
    pub details: Option<EpisodeDetails>,
}

impl Episode {
    pub fn from_element(episode: &Element, settings: &Settings) -> Result<Self> {
        Ok(Episode {
            title: episode.child_text("title").unwrap_or_default(),
            url: episode.child_text("url").map(|u| UrlDescriptor::parse(&u, None, settings)).transpose()?,
            episode_number: number(episode.child_text("epnum")),
            season_number: number(episode.child_text("season")),
            id: episode.child_text("id"),
            details: None,
        })
    }

    /// Parse every `<episode>` under the root of `list_xml`.
    pub fn parse_list(list_xml: &str, settings: &Settings) -> Result<Vec<Self>> {
        let root = xml::parse_root(list_xml)?;
        root.children_named("episode").map(|e| Self::from_element(e, settings)).collect()
    }
}

impl fmt::Display for Episode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (S{:02}E{:02})",
            self.title,
            self.season_number.unwrap_or(0),
            self.episode_number.unwrap_or(0)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeDetails {
    pub title: String,
    pub plot: Option<String>,
    pub aired: Option<NaiveDate>,
    pub thumbnail: Option<String>,
    pub director: Option<String>,
    pub rating: Option<f64>,
    pub episode_number: Option<u32>,
    pub season_number: Option<u32>,
    pub credits: Vec<String>,
    pub actors: Vec<String>,
    pub xml: String,
}

impl EpisodeDetails {
    pub fn parse(details_xml: &str) -> Result<Self> {
        let root = xml::parse_root(details_xml)?;
        Ok(EpisodeDetails {
            title: root.child_text("title").unwrap_or_default(),
            plot: root.child_text("plot"),
            aired: date(root.child_text("aired")),
            thumbnail: root.child_text("thumb"),
            director: root.child_text("director"),
            rating: number(root.child_text("rating")),
            episode_number: number(root.child_text("episode")),
            season_number: number(root.child_text("season")),
            credits: texts(&root, "credits"),
            actors: root.children_named("actor").filter_map(|a| a.child_text("name")).collect(),
            xml: details_xml.to_string(),
        })
    }
}
