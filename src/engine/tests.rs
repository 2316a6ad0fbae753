//! End-to-end tests: scraper XML in, function results out.

use super::*;
use crate::error::ScraperError;

fn scraper(functions: &str) -> Interpreter {
    let xml = format!(r#"<scraper name="test" content="movies">{functions}</scraper>"#);
    Interpreter::from_xml(&xml).unwrap()
}

const SETTINGS_FN: &str = r#"
  <GetSettings dest="3">
    <RegExp output='&lt;settings&gt;&lt;setting id="fanart" type="bool" default="true"/&gt;&lt;setting id="trailer" type="bool" default="false"/&gt;&lt;setting id="site" type="text" default="imdb.com"/&gt;&lt;/settings&gt;' dest="3">
      <expression/>
    </RegExp>
  </GetSettings>"#;

// --- Expressions ------------------------------------------------------------

#[test]
fn first_word_of_title() {
    let mut it = scraper(
        r#"<GetTitle dest="2"><RegExp input="$$1" output="\1" dest="2"><expression>(\w+)</expression></RegExp></GetTitle>"#,
    );
    it.set_buffer(1, "Fight Club", false).unwrap();
    assert_eq!(it.invoke("GetTitle").unwrap(), "Fight");
}

#[test]
fn repeat_collects_every_match() {
    let xml = r#"<Words dest="2"><RegExp input="$$1" output="\1," dest="2"><expression repeat="yes">(\w+)</expression></RegExp></Words>"#;
    let mut it = scraper(xml);
    it.set_buffer(1, "Fight Club", false).unwrap();
    assert_eq!(it.invoke("Words").unwrap(), "Fight,Club,");

    let mut it = scraper(&xml.replace(r#" repeat="yes""#, r#" repeat="no""#));
    it.set_buffer(1, "Fight Club", false).unwrap();
    assert_eq!(it.invoke("Words").unwrap(), "Fight,");
}

#[test]
fn first_match_replaces_then_appends() {
    let mut it = scraper(
        r#"<F dest="2"><RegExp input="$$1" output="\1" dest="2"><expression repeat="yes">(\w)</expression></RegExp></F>"#,
    );
    it.set_buffer(1, "a b", false).unwrap();
    it.set_buffer(2, "old", false).unwrap();
    assert_eq!(it.invoke("F").unwrap(), "ab");
}

#[test]
fn append_destination_keeps_existing_content() {
    let mut it = scraper(r#"<F dest="2"><RegExp output="b" dest="2+"><expression/></RegExp></F>"#);
    it.set_buffer(2, "a", false).unwrap();
    assert_eq!(it.invoke("F").unwrap(), "ab");
}

#[test]
fn clear_empties_destination_without_a_match() {
    let xml = r#"<F dest="2"><RegExp input="$$1" output="\1" dest="2"><expression clear="yes">id=(\d+)</expression></RegExp></F>"#;
    let mut it = scraper(xml);
    it.set_buffer(1, "no ids here", false).unwrap();
    it.set_buffer(2, "old", false).unwrap();
    assert_eq!(it.invoke("F").unwrap(), "");

    let mut it = scraper(&xml.replace(r#" clear="yes""#, ""));
    it.set_buffer(1, "no ids here", false).unwrap();
    it.set_buffer(2, "old", false).unwrap();
    assert_eq!(it.invoke("F").unwrap(), "old");
}

#[test]
fn compare_filters_results() {
    let mut it = scraper(
        r#"<Search dest="2">
             <RegExp input="$$1" output="\1|" dest="2">
               <expression repeat="yes" compare="4">&lt;m&gt;([^&lt;]*)&lt;/m&gt;</expression>
             </RegExp>
           </Search>"#,
    );
    it.set_buffer(1, "<m>Fight Club</m><m>Se7en</m><m>The Fight</m>", false).unwrap();
    it.set_buffer(4, "FIGHT", false).unwrap();
    let inv = it.invoke_with_metrics("Search").unwrap();
    assert_eq!(inv.value, "Fight Club|The Fight|");
    assert_eq!(inv.metrics.matches, 3);
    assert_eq!(inv.metrics.writes, 2);
    assert_eq!(inv.metrics.compare_rejections, 1);
}

#[test]
fn missing_backreference_drops_the_match() {
    let mut it = scraper(
        r#"<F dest="2"><RegExp input="$$1" output="\1-\2" dest="2"><expression>(\w+)</expression></RegExp></F>"#,
    );
    it.set_buffer(1, "x", false).unwrap();
    let inv = it.invoke_with_metrics("F").unwrap();
    assert_eq!(inv.value, "");
    assert_eq!(inv.metrics.discarded_expansions, 1);
    assert_eq!(inv.metrics.writes, 0);
}

#[test]
fn optional_group_fails_and_clears_buffers() {
    let mut it = scraper(
        r#"<F dest="2"><RegExp input="$$1" output="\1" dest="2"><expression optional="1">(a)?</expression></RegExp></F>"#,
    );
    it.set_buffer(1, "a", false).unwrap();
    it.set_buffer(5, "scratch", false).unwrap();
    assert!(matches!(it.invoke("F"), Err(ScraperError::UnsupportedOptionalGroup(1))));
    assert_eq!(it.get_buffer(5).unwrap(), "");
}

#[test]
fn invalid_pattern_is_reported() {
    let mut it = scraper(r#"<F><RegExp><expression>(unclosed</expression></RegExp></F>"#);
    assert!(matches!(it.invoke("F"), Err(ScraperError::Regex { pattern, .. }) if pattern == "(unclosed"));
}

// --- Clean / trim -----------------------------------------------------------

#[test]
fn backreferences_are_cleaned_unless_noclean() {
    let xml = r#"<F dest="2"><RegExp input="$$1" output="[\1]" dest="2"><expression ATTRS>&lt;t&gt;(.*)&lt;/t&gt;</expression></RegExp></F>"#;
    let run = |attrs: &str| {
        let mut it = scraper(&xml.replace("ATTRS", attrs));
        it.set_buffer(1, "<t>  Fight Club  </t>", false).unwrap();
        it.invoke("F").unwrap()
    };
    assert_eq!(run(""), "[Fight Club]");
    assert_eq!(run(r#"noclean="1""#), "[  Fight Club  ]");
    assert_eq!(run(r#"noclean="1" trim="1""#), "[Fight Club]");
}

// --- Templates --------------------------------------------------------------

#[test]
fn info_tokens_resolve_from_settings() {
    let mut it = scraper(r#"<F dest="2"><RegExp output="lang=$INFO[language]" dest="2"><expression/></RegExp></F>"#);
    assert_eq!(it.invoke("F").unwrap(), "lang=en");
}

#[test]
fn unknown_info_token_is_an_error() {
    let mut it = scraper(r#"<F dest="2"><RegExp output="$INFO[nope]" dest="2"><expression/></RegExp></F>"#);
    assert!(matches!(it.invoke("F"), Err(ScraperError::UnknownSetting(id)) if id == "nope"));
}

#[test]
fn expanded_results_are_substituted_again() {
    let mut it = scraper(
        r#"<F dest="2"><RegExp input="$$1" output="\1" dest="2"><expression>ref:(.*)</expression></RegExp></F>"#,
    );
    it.set_buffer(1, "ref:$$3", false).unwrap();
    it.set_buffer(3, "X", false).unwrap();
    assert_eq!(it.invoke("F").unwrap(), "X");
}

#[test]
fn input_is_normalized_before_matching() {
    let mut it = scraper(r#"<F dest="2"><RegExp input="$$1" output="\1" dest="2"><expression/></RegExp></F>"#);
    it.set_buffer(1, "Amélie", false).unwrap();
    assert_eq!(it.invoke("F").unwrap(), "Am&#233;lie");
}

// --- Rule tree --------------------------------------------------------------

#[test]
fn nested_rules_run_before_their_parent() {
    let mut it = scraper(
        r#"<F dest="2">
             <RegExp input="$$3" output="[\1]" dest="2">
               <RegExp input="$$1" output="\1" dest="3"><expression>(\w+) Club</expression></RegExp>
               <expression/>
             </RegExp>
           </F>"#,
    );
    it.set_buffer(1, "Fight Club", false).unwrap();
    let inv = it.invoke_with_metrics("F").unwrap();
    assert_eq!(inv.value, "[Fight]");
    assert_eq!(inv.metrics.rules_visited, 2);
    assert_eq!(inv.metrics.max_depth, 2);
}

#[test]
fn guards_follow_settings() {
    let mut it = scraper(&format!(
        r#"{SETTINGS_FN}
           <F dest="2">
             <RegExp conditional="fanart" output="F" dest="2+"><expression/></RegExp>
             <RegExp conditional="trailer" output="T" dest="2+"><expression/></RegExp>
             <RegExp conditional="!trailer" output="t" dest="2+"><expression/></RegExp>
             <RegExp conditional="unheard_of" output="?" dest="2+"><expression/></RegExp>
           </F>"#
    ));
    let inv = it.invoke_with_metrics("F").unwrap();
    assert_eq!(inv.value, "Ft");
    assert_eq!(inv.metrics.rules_skipped, 2);

    it.settings_mut().set("trailer", "TRUE").unwrap();
    assert_eq!(it.invoke("F").unwrap(), "FT");
}

#[test]
fn skipped_guard_skips_nested_rules() {
    let mut it = scraper(
        r#"<F dest="2">
             <RegExp conditional="override" output="outer" dest="2">
               <RegExp output="inner" dest="2"><expression/></RegExp>
               <expression/>
             </RegExp>
           </F>"#,
    );
    let inv = it.invoke_with_metrics("F").unwrap();
    assert_eq!(inv.value, "");
    assert_eq!(inv.metrics.rules_visited, 0);
}

#[test]
fn rule_without_expression_does_nothing() {
    let mut it = scraper(r#"<F dest="2"><RegExp output="x" dest="2"/></F>"#);
    assert_eq!(it.invoke("F").unwrap(), "");
}

#[test]
fn clear_child_runs_before_its_parent() {
    let mut it = scraper(
        r#"<F dest="2">
             <RegExp input="$$4" output="got \1" dest="2">
               <clear output="inner" dest="4"><expression/></clear>
               <expression>(.+)</expression>
             </RegExp>
           </F>"#,
    );
    it.set_buffer(4, "stale", false).unwrap();
    let inv = it.invoke_with_metrics("F").unwrap();
    assert_eq!(inv.value, "got inner");
    assert_eq!(inv.metrics.rules_visited, 2);
    assert_eq!(inv.metrics.writes, 2);
}

// --- Dispatch ---------------------------------------------------------------

#[test]
fn get_settings_builds_the_table() {
    let it = scraper(SETTINGS_FN);
    assert!(it.settings().get("fanart").is_true());
    assert_eq!(it.settings().get("site").to_string(), "imdb.com");
    assert_eq!(it.settings().get("language").to_string(), "en");
}

#[test]
fn without_get_settings_only_implicit_ids_exist() {
    let it = scraper("<F/>");
    let ids: Vec<_> = it.settings().iter().map(|s| s.id.clone()).collect();
    assert_eq!(ids, vec!["override", "language"]);
}

#[test]
fn unknown_setting_errors_on_write_but_reads_false() {
    let mut it = scraper(r#"<F dest="2"><RegExp conditional="nope" output="x" dest="2"><expression/></RegExp></F>"#);
    assert!(matches!(it.settings_mut().set("nope", "true"), Err(ScraperError::UnknownSetting(_))));
    assert!(!it.settings().get("nope").is_true());
    assert_eq!(it.invoke("F").unwrap(), "");
}

#[test]
fn unknown_function_leaves_buffers_alone() {
    let mut it = scraper("<F/>");
    it.set_buffer(1, "keep", false).unwrap();
    assert!(matches!(it.invoke("Nope"), Err(ScraperError::UnknownFunction(name)) if name == "Nope"));
    assert_eq!(it.get_buffer(1).unwrap(), "keep");
}

#[test]
fn buffers_are_cleared_after_every_invocation() {
    let mut it = scraper(r#"<F dest="2"><RegExp input="$$1" output="\1" dest="2"><expression/></RegExp></F>"#);
    it.set_buffer(1, "x", false).unwrap();
    it.set_buffer(20, "y", false).unwrap();
    assert_eq!(it.invoke("F").unwrap(), "x");
    for i in 1..=it.buffer_count() {
        assert_eq!(it.get_buffer(i).unwrap(), "");
    }
    assert_eq!(it.invoke("F").unwrap(), "");
}

#[test]
fn function_names_ignore_case_and_empty_functions_return_nothing() {
    let mut it = scraper(r#"<CreateSearchUrl dest="3"/>"#);
    let inv = it.invoke_with_metrics("createsearchurl").unwrap();
    assert_eq!(inv.function, "CreateSearchUrl");
    assert_eq!(inv.result_buffer, 3);
    assert_eq!(inv.value, "");
}

#[test]
fn caller_supplied_settings_override_the_table() {
    let mut it = scraper(&format!(
        r#"{SETTINGS_FN}<F dest="2"><RegExp conditional="fanart" output="yes" dest="2"><expression/></RegExp></F>"#
    ));
    let mut custom = it.settings().clone();
    custom.set("fanart", "false").unwrap();
    assert_eq!(it.invoke_with_settings("F", &custom).unwrap(), "");
    assert_eq!(it.invoke("F").unwrap(), "yes");
}

#[test]
fn buffer_count_follows_options() {
    let def = crate::definition::ScraperDefinition::parse(r#"<scraper name="t" content="movies"/>"#).unwrap();
    let mut it = Interpreter::with_options(def, &crate::api::Options { buffer_count: 5 }).unwrap();
    assert_eq!(it.buffer_count(), 5);
    assert!(matches!(it.set_buffer(6, "x", false), Err(ScraperError::BufferOutOfRange { index: 6, max: 5 })));
    assert!(it.set_buffer(5, "x", false).is_ok());
}

#[test]
fn patterns_built_from_buffers_are_not_cached() {
    let mut it = scraper(
        r#"<Id dest="2"><RegExp input="$$1" output="\1" dest="2"><expression>id=($$3)</expression></RegExp></Id>
           <Word dest="2"><RegExp input="$$1" output="\1" dest="2"><expression>(\w+)</expression></RegExp></Word>"#,
    );
    for n in 0..50 {
        it.set_buffer(1, &format!("id={n}"), false).unwrap();
        it.set_buffer(3, &n.to_string(), false).unwrap();
        assert_eq!(it.invoke("Id").unwrap(), n.to_string());
        it.set_buffer(1, "Fight Club", false).unwrap();
        assert_eq!(it.invoke("Word").unwrap(), "Fight");
    }
    assert_eq!(it.cached_patterns(), 1);
}
