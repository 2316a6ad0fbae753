//! URL descriptors found in scraper output.
//!
//! Scrapers hand back URLs either as bare strings or as small elements:
//!
//! ```xml
//! <url spoof="http://example.org/" post="yes" cache="details-123.xml" function="GetCast">
//!   http://example.org/search?q=fight+club
//! </url>
//! ```
//!
//! A descriptor may legitimately carry no URL at all (`<url cache="x"/>`);
//! such a descriptor can only be satisfied from the cache.

use crate::error::{Result, ScraperError};
use crate::settings::Settings;
use crate::xml::{self, Element};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UrlDescriptor {
    pub url: Option<String>,
    /// Value sent as the `Referer` header.
    pub spoof: Option<String>,
    /// Send the query string as a POST body instead of a GET.
    pub post: bool,
    pub cache_key: Option<String>,
    /// Function that must process the fetched content (custom functions).
    pub function: Option<String>,
}

impl UrlDescriptor {
    /// Parse `text` as a `<url>` element, or as a bare URL if it is not markup.
    pub fn parse(text: &str, base_url: Option<&str>, settings: &Settings) -> Result<Self> {
        if text.is_empty() {
            return Err(ScraperError::BadUrl("an empty string is not a valid URL".to_string()));
        }
        match xml::parse_root(text) {
            Ok(element) => Self::from_element(&element, base_url, settings),
            Err(_) => Self { url: Some(text.to_string()), ..Self::default() }.resolve(base_url, settings),
        }
    }

    pub fn from_element(element: &Element, base_url: Option<&str>, settings: &Settings) -> Result<Self> {
        let non_empty = |name: &str| element.attr(name).filter(|v| !v.is_empty()).map(str::to_string);
        let text = element.text();
        Self {
            url: if text.is_empty() { None } else { Some(text) },
            spoof: non_empty("spoof"),
            post: element.has_attr("post"),
            cache_key: non_empty("cache"),
            function: non_empty("function"),
        }
        .resolve(base_url, settings)
    }

    fn resolve(mut self, base_url: Option<&str>, settings: &Settings) -> Result<Self> {
        if let Some(url) = self.url.take() {
            let url = url.trim();
            let mut full = match base_url {
                Some(base) if !url.is_empty() && !starts_with_http(url) => format!("{base}{url}"),
                _ => url.to_string(),
            };
            full = settings.expand_info(&full)?;
            self.url = Some(full);
        }
        Ok(self)
    }

    /// Split a POST descriptor into `(endpoint, body)`. `None` for GET
    /// descriptors and descriptors without a URL.
    pub fn request_body(&self) -> Option<(&str, &str)> {
        if !self.post {
            return None;
        }
        let url = self.url.as_deref()?;
        Some(match url.split_once('?') {
            Some((endpoint, query)) => (endpoint, query),
            None => (url, ""),
        })
    }
}

fn starts_with_http(url: &str) -> bool {
    url.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("http"))
}

impl fmt::Display for UrlDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.url, &self.cache_key) {
            (Some(url), _) => f.write_str(url),
            (None, Some(key)) => write!(f, "<cache:{key}>"),
            (None, None) => f.write_str("<no url>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_url_elements() {
        let s = Settings::default();
        let d = UrlDescriptor::parse(
            r#"<url spoof="http://ref/" post="yes" cache="c.xml" function="GetCast">http://a.org/s?q=1&amp;l=$INFO[language]</url>"#,
            None,
            &s,
        )
        .unwrap();
        assert_eq!(d.url.as_deref(), Some("http://a.org/s?q=1&l=en"));
        assert_eq!(d.spoof.as_deref(), Some("http://ref/"));
        assert!(d.post);
        assert_eq!(d.cache_key.as_deref(), Some("c.xml"));
        assert_eq!(d.function.as_deref(), Some("GetCast"));
        assert_eq!(d.request_body(), Some(("http://a.org/s", "q=1&l=en")));
    }

    #[test]
    fn bare_strings_and_base_url() {
        let s = Settings::default();
        let d = UrlDescriptor::parse("http://a.org/x?a=1&b=2", Some("http://base"), &s).unwrap();
        assert_eq!(d.url.as_deref(), Some("http://a.org/x?a=1&b=2"));
        assert_eq!(d.request_body(), None);

        let d = UrlDescriptor::parse("/title/tt0137523/", Some("http://www.imdb.com"), &s).unwrap();
        assert_eq!(d.url.as_deref(), Some("http://www.imdb.com/title/tt0137523/"));

        let d = UrlDescriptor::parse("HTTP://A.ORG", Some("http://base"), &s).unwrap();
        assert_eq!(d.url.as_deref(), Some("HTTP://A.ORG"));
    }

    #[test]
    fn cache_only_descriptor_and_empty_input() {
        let s = Settings::default();
        let d = UrlDescriptor::parse(r#"<url cache="k"/>"#, Some("http://base"), &s).unwrap();
        assert_eq!(d.url, None);
        assert_eq!(d.to_string(), "<cache:k>");
        assert!(matches!(UrlDescriptor::parse("", None, &s), Err(ScraperError::BadUrl(_))));
    }
}
