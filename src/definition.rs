//! Scraper definitions: the parsed, read-only form of a scraper XML file.
//!
//! ```xml
//! <scraper name="imdb" content="movies">
//!   <GetSettings dest="3">
//!     <RegExp input="$$5" output="&lt;settings&gt;\1&lt;/settings&gt;" dest="3">
//!       <RegExp input="$$1" output="..." dest="5+">
//!         <expression/>
//!       </RegExp>
//!       <expression noclean="1"/>
//!     </RegExp>
//!   </GetSettings>
//!   <CreateSearchUrl dest="3"> ... </CreateSearchUrl>
//! </scraper>
//! ```
//!
//! Each child of `<scraper>` is a function. A function is a sibling chain of
//! `<RegExp>` rule nodes; each rule node may nest further rule nodes that run
//! before it. Nodes live in a [`RuleArena`] and refer to each other by
//! [`NodeId`], so the tree is never mutated after loading.

use crate::error::{Result, ScraperError};
use crate::xml::{self, Element};
use std::collections::HashMap;
use std::fmt;

bitflags::bitflags! {
    /// A set of capture group numbers `1..=9`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GroupSet: u16 {
        const G1 = 1 << 1;
        const G2 = 1 << 2;
        const G3 = 1 << 3;
        const G4 = 1 << 4;
        const G5 = 1 << 5;
        const G6 = 1 << 6;
        const G7 = 1 << 7;
        const G8 = 1 << 8;
        const G9 = 1 << 9;
    }
}

impl GroupSet {
    /// Parse a comma list such as `"1,3"`. Items other than `1`..`9` are ignored.
    pub fn parse_list(list: &str) -> Self {
        list.split(',').filter_map(|item| Self::group(item.parse().ok()?)).fold(GroupSet::empty(), |acc, g| acc | g)
    }

    /// The single-group set for `n`, if `n` is in `1..=9`.
    pub fn group(n: usize) -> Option<Self> {
        if (1..=9).contains(&n) { GroupSet::from_bits(1 << n) } else { None }
    }

    pub fn has(self, n: usize) -> bool {
        Self::group(n).is_some_and(|g| self.contains(g))
    }
}

/// What a scraper is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Movies,
    TvShows,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Movies => "movies",
            ContentKind::TvShows => "tvshows",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index of a node in a [`RuleArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// A rule's `conditional` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// No condition: the rule always runs.
    Always,
    /// `name` or `!name`.
    Setting { name: String, negated: bool },
}

impl Guard {
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Guard::Always;
        }
        match raw.strip_prefix('!') {
            Some(name) => Guard::Setting { name: name.to_string(), negated: true },
            None => Guard::Setting { name: raw.to_string(), negated: false },
        }
    }
}

/// Where a rule writes: `dest="5"` or `dest="5+"` (append).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destination {
    pub buffer: usize,
    pub append: bool,
}

impl Destination {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Ok(Destination { buffer: 1, append: false });
        }
        let (digits, append) = match raw.strip_suffix('+') {
            Some(d) => (d, true),
            None => (raw, false),
        };
        let buffer = parse_index("dest", digits)?;
        Ok(Destination { buffer, append })
    }
}

/// The `<expression>` of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub pattern: String,
    pub repeat: bool,
    pub clear: bool,
    /// Groups listed in `noclean`; every other backreference is cleaned.
    pub no_clean: GroupSet,
    /// Groups listed in `trim`.
    pub trim: GroupSet,
    pub optional: Option<usize>,
    pub compare: Option<usize>,
}

impl Expression {
    fn from_element(e: &Element) -> Result<Self> {
        let text = e.text();
        Ok(Expression {
            pattern: if text.is_empty() { "(.*)".to_string() } else { text },
            repeat: e.attr_or_empty("repeat").eq_ignore_ascii_case("yes"),
            clear: e.attr_or_empty("clear").eq_ignore_ascii_case("yes"),
            no_clean: GroupSet::parse_list(e.attr_or_empty("noclean")),
            trim: GroupSet::parse_list(e.attr_or_empty("trim")),
            optional: optional_index("optional", e.attr_or_empty("optional"))?,
            compare: optional_index("compare", e.attr_or_empty("compare"))?,
        })
    }
}

/// The work one rule node performs once its nested rules have run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleStep {
    /// `input` template; `None` reads buffer 1.
    pub input: Option<String>,
    pub output: String,
    pub dest: Destination,
    /// `None` when the node has no `<expression>` child.
    pub expression: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleNode {
    /// A rule with nested rules that run first.
    Group { guard: Guard, children: Vec<NodeId>, step: RuleStep },
    Leaf { guard: Guard, step: RuleStep },
}

impl RuleNode {
    pub fn guard(&self) -> &Guard {
        match self {
            RuleNode::Group { guard, .. } | RuleNode::Leaf { guard, .. } => guard,
        }
    }

    pub fn step(&self) -> &RuleStep {
        match self {
            RuleNode::Group { step, .. } | RuleNode::Leaf { step, .. } => step,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match self {
            RuleNode::Group { children, .. } => children,
            RuleNode::Leaf { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleArena {
    nodes: Vec<RuleNode>,
}

impl RuleArena {
    pub fn get(&self, id: NodeId) -> &RuleNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, node: RuleNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }
}

#[derive(Debug, Clone)]
pub struct Function {
    /// Name as written in the definition.
    pub name: String,
    /// Buffer read as the function's result.
    pub result_buffer: usize,
    /// Top-level rule chain; empty when the function has no rules.
    pub roots: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ScraperDefinition {
    pub name: String,
    pub content: ContentKind,
    functions: HashMap<String, Function>,
    order: Vec<String>,
    arena: RuleArena,
}

impl ScraperDefinition {
    pub fn parse(xml_text: &str) -> Result<Self> {
        let document = xml::parse_document(xml_text)?;
        let root = document
            .first_child("scraper")
            .ok_or_else(|| ScraperError::Definition("the document's root element is not <scraper>".to_string()))?;

        let name = root.attr_or_empty("name").to_lowercase();
        let content = root.attr_or_empty("content").to_lowercase();
        if name.is_empty() || content.is_empty() {
            return Err(ScraperError::Definition("<scraper> needs both a 'name' and a 'content' attribute".to_string()));
        }
        let content = match content.as_str() {
            "movies" => ContentKind::Movies,
            "tvshows" => ContentKind::TvShows,
            other => {
                return Err(ScraperError::Definition(format!(
                    "<scraper> content must be 'movies' or 'tvshows', not '{other}'"
                )));
            }
        };

        let mut def = ScraperDefinition {
            name,
            content,
            functions: HashMap::new(),
            order: Vec::new(),
            arena: RuleArena::default(),
        };
        for element in root.elements() {
            let key = element.name.to_lowercase();
            if def.functions.contains_key(&key) {
                continue;
            }
            let result_buffer = match element.attr_or_empty("dest") {
                "" => 1,
                raw => parse_index("dest", raw)?,
            };
            let roots = def.load_chain(element)?;
            def.functions.insert(key.clone(), Function { name: element.name.clone(), result_buffer, roots });
            def.order.push(key);
        }

        log::debug!(
            "loaded scraper '{}' ({}): {} functions, {} rule nodes",
            def.name,
            def.content,
            def.functions.len(),
            def.arena.len()
        );
        Ok(def)
    }

    /// Look up a function by name, ignoring ASCII case.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(&name.to_lowercase())
    }

    /// Functions in definition order.
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.order.iter().filter_map(|k| self.functions.get(k))
    }

    pub fn arena(&self) -> &RuleArena {
        &self.arena
    }

    /// Load the rule nodes nested directly under `parent`.
    fn load_chain(&mut self, parent: &Element) -> Result<Vec<NodeId>> {
        let mut ids = Vec::new();
        for element in parent.children_named("RegExp") {
            ids.push(self.load_node(element)?);
        }
        Ok(ids)
    }

    fn load_node(&mut self, element: &Element) -> Result<NodeId> {
        let mut children = self.load_chain(element)?;
        if children.is_empty() {
            // A bare <clear> child stands in for the nested chain.
            if let Some(clear) = element.first_child("clear") {
                children.push(self.load_node(clear)?);
            }
        }

        let step = RuleStep {
            input: element.attr("input").filter(|s| !s.is_empty()).map(str::to_string),
            output: element.attr_or_empty("output").to_string(),
            dest: Destination::parse(element.attr_or_empty("dest"))?,
            expression: element.first_child("expression").map(Expression::from_element).transpose()?,
        };
        let guard = Guard::parse(element.attr_or_empty("conditional"));

        let node = if children.is_empty() {
            RuleNode::Leaf { guard, step }
        } else {
            RuleNode::Group { guard, children, step }
        };
        Ok(self.arena.push(node))
    }
}

fn parse_index(attr: &str, raw: &str) -> Result<usize> {
    raw.trim().parse().map_err(|_| ScraperError::Definition(format!("attribute {attr}=\"{raw}\" is not an integer")))
}

fn optional_index(attr: &str, raw: &str) -> Result<Option<usize>> {
    if raw.is_empty() { Ok(None) } else { parse_index(attr, raw).map(Some) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<scraper name="IMDB" content="Movies">
  <GetSettings dest="3">
    <RegExp input="$$5" output="&lt;settings&gt;\1&lt;/settings&gt;" dest="3">
      <RegExp input="$$1" output="x" dest="5+" conditional="!fanart">
        <expression repeat="yes" noclean="1,2,x,10" trim="3" compare="4">(a)(b)</expression>
      </RegExp>
      <expression/>
    </RegExp>
  </GetSettings>
  <CreateSearchUrl dest="2"/>
  <getsettings dest="9"/>
</scraper>"#;

    #[test]
    fn loads_functions_and_rule_tree() {
        let def = ScraperDefinition::parse(DEF).unwrap();
        assert_eq!(def.name, "imdb");
        assert_eq!(def.content, ContentKind::Movies);

        let f = def.function("getsettings").unwrap();
        assert_eq!(f.name, "GetSettings");
        assert_eq!(f.result_buffer, 3);
        assert_eq!(f.roots.len(), 1);

        let outer = def.arena().get(f.roots[0]);
        assert_eq!(outer.guard(), &Guard::Always);
        assert_eq!(outer.step().output, "<settings>\\1</settings>");
        assert_eq!(outer.step().input.as_deref(), Some("$$5"));
        let expr = outer.step().expression.as_ref().unwrap();
        assert_eq!(expr.pattern, "(.*)");
        assert!(!expr.repeat);

        let inner = def.arena().get(outer.children()[0]);
        assert!(matches!(inner, RuleNode::Leaf { .. }));
        assert_eq!(inner.guard(), &Guard::Setting { name: "fanart".into(), negated: true });
        assert_eq!(inner.step().dest, Destination { buffer: 5, append: true });
        let expr = inner.step().expression.as_ref().unwrap();
        assert!(expr.repeat);
        assert_eq!(expr.no_clean, GroupSet::G1 | GroupSet::G2);
        assert!(expr.trim.has(3));
        assert_eq!(expr.compare, Some(4));
        assert_eq!(expr.optional, None);

        let names: Vec<_> = def.functions().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["GetSettings", "CreateSearchUrl"]);
        assert!(def.function("CreateSearchUrl").unwrap().roots.is_empty());
    }

    #[test]
    fn clear_child_is_nested_rule() {
        let def = ScraperDefinition::parse(
            r#"<scraper name="a" content="tvshows"><F><RegExp output="x"><clear dest="4"><expression clear="yes"/></clear><expression/></RegExp></F></scraper>"#,
        )
        .unwrap();
        let f = def.function("f").unwrap();
        let node = def.arena().get(f.roots[0]);
        let clear = def.arena().get(node.children()[0]);
        assert_eq!(clear.step().dest.buffer, 4);
        assert!(clear.step().expression.as_ref().unwrap().clear);
    }

    #[test]
    fn rejects_bad_roots_and_attributes() {
        assert!(matches!(ScraperDefinition::parse("<other/>"), Err(ScraperError::Definition(_))));
        assert!(matches!(ScraperDefinition::parse(r#"<scraper name="a"/>"#), Err(ScraperError::Definition(_))));
        assert!(matches!(
            ScraperDefinition::parse(r#"<scraper name="a" content="music"/>"#),
            Err(ScraperError::Definition(_))
        ));
        assert!(matches!(
            ScraperDefinition::parse(r#"<scraper name="a" content="movies"><F><RegExp dest="x+"/></F></scraper>"#),
            Err(ScraperError::Definition(_))
        ));
        assert!(matches!(
            ScraperDefinition::parse(
                r#"<scraper name="a" content="movies"><F><RegExp><expression compare="z"/></RegExp></F></scraper>"#
            ),
            Err(ScraperError::Definition(_))
        ));
        assert!(matches!(ScraperDefinition::parse("<scraper"), Err(ScraperError::Xml(_))));
    }

    #[test]
    fn group_sets() {
        assert_eq!(GroupSet::parse_list(""), GroupSet::empty());
        assert_eq!(GroupSet::parse_list("9,1"), GroupSet::G1 | GroupSet::G9);
        assert!(GroupSet::group(0).is_none());
        assert!(GroupSet::group(10).is_none());
        assert!(!GroupSet::G2.has(1));
    }
}
