//! The settings table.
//!
//! Built once from the XML returned by a scraper's `GetSettings` function:
//!
//! ```xml
//! <settings>
//!   <setting label="Enable Fanart" type="bool" id="fanart" default="true"/>
//!   <setting type="sep"/>
//!   <setting label="Language" type="labelenum" id="language" values="en|de|fr" default="de"/>
//! </settings>
//! ```
//!
//! Two ids always exist even when the document omits them: `override` (bool,
//! `false`) and `language` (text, `"en"`).
//!
//! There are two read paths with different failure policies:
//!
//! - [`Settings::get`] is tolerant: an unknown id reads as `Bool(false)`.
//!   Guards rely on this.
//! - [`Settings::lookup`] / [`Settings::expand_info`] are strict and report
//!   unknown ids.

use crate::error::{Result, ScraperError};
use crate::xml;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingKind {
    Bool,
    Text,
    /// `enum` / `labelenum`: free text with a list of suggested values.
    Enum { values: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Bool(bool),
    Text(String),
}

impl SettingValue {
    pub fn is_true(&self) -> bool {
        matches!(self, SettingValue::Bool(true))
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{b}"),
            SettingValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub id: String,
    pub label: String,
    pub kind: SettingKind,
    pub default: SettingValue,
    pub value: SettingValue,
}

impl Setting {
    fn new(id: &str, label: &str, kind: SettingKind, default: SettingValue) -> Self {
        Setting { id: id.to_string(), label: label.to_string(), kind, value: default.clone(), default }
    }

    fn coerce(&self, raw: &str) -> SettingValue {
        match self.kind {
            SettingKind::Bool => SettingValue::Bool(raw.eq_ignore_ascii_case("true")),
            SettingKind::Text | SettingKind::Enum { .. } => SettingValue::Text(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    settings: Vec<Setting>,
    index: HashMap<String, usize>,
}

impl Settings {
    /// A table holding only the implicit ids.
    pub fn implicit() -> Self {
        let mut table = Settings { settings: Vec::new(), index: HashMap::new() };
        table.insert(Setting::new("override", "Language Override", SettingKind::Bool, SettingValue::Bool(false)));
        table.insert(Setting::new("language", "Language", SettingKind::Text, SettingValue::Text("en".to_string())));
        table
    }

    /// Build the table from a `<settings>` document. An empty (or all
    /// whitespace) document yields the implicit ids only.
    pub fn from_xml(settings_xml: &str) -> Result<Self> {
        let mut table = Settings::implicit();
        if settings_xml.trim().is_empty() {
            return Ok(table);
        }

        let root = xml::parse_root(settings_xml)?;
        for node in root.children_named("setting") {
            let id = node.attr_or_empty("id");
            // Separators and other decorations carry no id.
            if id.is_empty() {
                continue;
            }
            let label = node.attr_or_empty("label");
            let default = node.attr_or_empty("default");
            let kind = match node.attr_or_empty("type") {
                "bool" => SettingKind::Bool,
                "enum" | "labelenum" => SettingKind::Enum {
                    values: node
                        .attr_or_empty("values")
                        .split('|')
                        .filter(|v| !v.is_empty())
                        .map(str::to_string)
                        .collect(),
                },
                _ => SettingKind::Text,
            };
            let mut setting = Setting::new(id, label, kind, SettingValue::Bool(false));
            setting.default = setting.coerce(default);
            setting.value = setting.default.clone();
            table.insert(setting);
        }
        log::debug!("settings: loaded {} ids", table.settings.len());
        Ok(table)
    }

    fn insert(&mut self, setting: Setting) {
        match self.index.get(&setting.id) {
            Some(&pos) => self.settings[pos] = setting,
            None => {
                self.index.insert(setting.id.clone(), self.settings.len());
                self.settings.push(setting);
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Tolerant read: unknown ids are `Bool(false)`.
    pub fn get(&self, id: &str) -> SettingValue {
        self.lookup(id).cloned().unwrap_or(SettingValue::Bool(false))
    }

    /// Strict read: `None` for unknown ids.
    pub fn lookup(&self, id: &str) -> Option<&SettingValue> {
        self.index.get(id).map(|&pos| &self.settings[pos].value)
    }

    pub fn setting(&self, id: &str) -> Option<&Setting> {
        self.index.get(id).map(|&pos| &self.settings[pos])
    }

    /// Set `id` from a raw string. Bool settings are `true` iff `raw` equals
    /// `true` ignoring case.
    pub fn set(&mut self, id: &str, raw: &str) -> Result<()> {
        let pos = *self.index.get(id).ok_or_else(|| ScraperError::UnknownSetting(id.to_string()))?;
        let setting = &mut self.settings[pos];
        setting.value = setting.coerce(raw);
        log::debug!("settings: {id} = {}", setting.value);
        Ok(())
    }

    /// Restore one id (or every id when `None`) to its default.
    pub fn reset(&mut self, id: Option<&str>) -> Result<()> {
        match id {
            Some(id) => {
                let pos = *self.index.get(id).ok_or_else(|| ScraperError::UnknownSetting(id.to_string()))?;
                let setting = &mut self.settings[pos];
                setting.value = setting.default.clone();
            }
            None => {
                for setting in &mut self.settings {
                    setting.value = setting.default.clone();
                }
            }
        }
        Ok(())
    }

    /// Settings in declaration order (implicit ids first).
    pub fn iter(&self) -> impl Iterator<Item = &Setting> {
        self.settings.iter()
    }

    /// Replace every `$INFO[id]` token with the value of `id`. Unknown ids are
    /// an error.
    pub fn expand_info(&self, text: &str) -> Result<String> {
        if !text.contains("$INFO[") {
            return Ok(text.to_string());
        }
        let re = regex!(r"\$INFO\[([^\]]*)\]");
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in re.captures_iter(text) {
            let (Some(whole), Some(id)) = (caps.get(0), caps.get(1)) else { continue };
            let value = self.lookup(id.as_str()).ok_or_else(|| ScraperError::UnknownSetting(id.as_str().to_string()))?;
            out.push_str(&text[last..whole.start()]);
            out.push_str(&value.to_string());
            last = whole.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::implicit()
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .settings
            .iter()
            .map(|s| format!("id: {}, label: '{}', default: '{}', value: '{}'", s.id, s.label, s.default, s.value))
            .collect();
        write!(f, "< Settings: {} >", parts.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<settings>
        <setting label="Enable Fanart" type="bool" id="fanart" default="TRUE"/>
        <setting type="sep"/>
        <setting label="Trailer" type="bool" id="trailer" default="false"/>
        <setting label="Poster size" type="labelenum" id="size" values="small|large" default="large"/>
        <setting label="Url" type="text" id="url" default="imdb.com"/>
    </settings>"#;

    #[test]
    fn parses_definitions_and_implicit_ids() {
        let s = Settings::from_xml(DOC).unwrap();
        assert_eq!(s.get("fanart"), SettingValue::Bool(true));
        assert_eq!(s.get("trailer"), SettingValue::Bool(false));
        assert_eq!(s.get("url"), SettingValue::Text("imdb.com".into()));
        assert_eq!(s.get("override"), SettingValue::Bool(false));
        assert_eq!(s.get("language"), SettingValue::Text("en".into()));
        assert_eq!(
            s.setting("size").map(|x| x.kind.clone()),
            Some(SettingKind::Enum { values: vec!["small".into(), "large".into()] })
        );
        let ids: Vec<_> = s.iter().map(|x| x.id.as_str()).collect();
        assert_eq!(ids, vec!["override", "language", "fanart", "trailer", "size", "url"]);
    }

    #[test]
    fn document_can_redefine_language() {
        let s = Settings::from_xml(r#"<settings><setting id="language" type="text" default="de"/></settings>"#).unwrap();
        assert_eq!(s.get("language"), SettingValue::Text("de".into()));
        assert_eq!(s.iter().filter(|x| x.id == "language").count(), 1);
    }

    #[test]
    fn unknown_ids_are_false_for_get_but_errors_for_set() {
        let mut s = Settings::implicit();
        assert_eq!(s.get("nope"), SettingValue::Bool(false));
        assert!(s.lookup("nope").is_none());
        assert!(matches!(s.set("nope", "true"), Err(ScraperError::UnknownSetting(id)) if id == "nope"));
        assert!(s.reset(Some("nope")).is_err());
    }

    #[test]
    fn set_coerces_bools_and_reset_restores() {
        let mut s = Settings::from_xml(DOC).unwrap();
        s.set("trailer", "True").unwrap();
        assert!(s.get("trailer").is_true());
        s.set("trailer", "yes").unwrap();
        assert!(!s.get("trailer").is_true());
        s.set("url", "example.org").unwrap();
        s.set("language", "fr").unwrap();
        s.reset(Some("url")).unwrap();
        assert_eq!(s.get("url").to_string(), "imdb.com");
        assert_eq!(s.get("language").to_string(), "fr");
        s.reset(None).unwrap();
        assert_eq!(s.get("language").to_string(), "en");
    }

    #[test]
    fn expand_info_is_strict() {
        let s = Settings::from_xml(DOC).unwrap();
        assert_eq!(s.expand_info("http://$INFO[url]/?l=$INFO[language]").unwrap(), "http://imdb.com/?l=en");
        assert_eq!(s.expand_info("fanart=$INFO[fanart]").unwrap(), "fanart=true");
        assert!(matches!(s.expand_info("$INFO[missing]"), Err(ScraperError::UnknownSetting(_))));
    }

    #[test]
    fn empty_document_yields_implicit_table() {
        let s = Settings::from_xml("  ").unwrap();
        assert_eq!(s.iter().count(), 2);
        assert!(Settings::from_xml("<settings>").is_err());
    }
}
