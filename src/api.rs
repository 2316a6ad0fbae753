use crate::engine::{DEFAULT_BUFFER_COUNT, Interpreter, Invocation};
use crate::error::Result;
use crate::{ScraperDefinition, Settings};

/// Options that affect interpreter construction.
#[derive(Debug, Clone)]
pub struct Options {
    /// Number of buffers (`$$1`..`$$N`) the interpreter provides.
    pub buffer_count: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options { buffer_count: DEFAULT_BUFFER_COUNT }
    }
}

/// Run `function` from the scraper in `scraper_xml`, with `buffers` preloaded
/// as `(index, value)` pairs, and return its result.
///
/// # Example
/// ```
/// let xml = r#"<scraper name="demo" content="movies">
///   <GetTitle dest="2">
///     <RegExp input="$$1" output="\1" dest="2"><expression>(\w+)</expression></RegExp>
///   </GetTitle>
/// </scraper>"#;
///
/// let title = scrapxml::run(xml, "GetTitle", &[(1, "Fight Club")]).unwrap();
/// assert_eq!(title, "Fight");
/// ```
pub fn run(scraper_xml: &str, function: &str, buffers: &[(usize, &str)]) -> Result<String> {
    run_with(scraper_xml, function, buffers, &[], &Options::default())
}

/// Like [`run`], applying `settings` as `(id, value)` overrides first.
pub fn run_with(
    scraper_xml: &str,
    function: &str,
    buffers: &[(usize, &str)],
    settings: &[(&str, &str)],
    options: &Options,
) -> Result<String> {
    run_verbose_with(scraper_xml, function, buffers, settings, options).map(|inv| inv.value)
}

/// Like [`run_with`] but also returns the invocation metrics.
///
/// This is useful for profiling and rule debugging.
pub fn run_verbose_with(
    scraper_xml: &str,
    function: &str,
    buffers: &[(usize, &str)],
    settings: &[(&str, &str)],
    options: &Options,
) -> Result<Invocation> {
    let mut interpreter = Interpreter::with_options(ScraperDefinition::parse(scraper_xml)?, options)?;
    apply_settings(interpreter.settings_mut(), settings)?;
    for &(index, value) in buffers {
        interpreter.set_buffer(index, value, false)?;
    }
    interpreter.invoke_with_metrics(function)
}

fn apply_settings(table: &mut Settings, overrides: &[(&str, &str)]) -> Result<()> {
    for &(id, value) in overrides {
        table.set(id, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScraperError;

    const XML: &str = r#"<scraper name="demo" content="movies">
      <GetSettings dest="3">
        <RegExp output='&lt;settings&gt;&lt;setting id="loud" type="bool" default="false"/&gt;&lt;/settings&gt;' dest="3">
          <expression/>
        </RegExp>
      </GetSettings>
      <Shout dest="2">
        <RegExp input="$$1" output="\1!" dest="2" conditional="loud"><expression>(\w+)</expression></RegExp>
        <RegExp input="$$1" output="\1." dest="2" conditional="!loud"><expression>(\w+)</expression></RegExp>
      </Shout>
    </scraper>"#;

    #[test]
    fn run_uses_defaults() {
        assert_eq!(run(XML, "Shout", &[(1, "hello world")]).unwrap(), "hello.");
    }

    #[test]
    fn run_with_applies_settings_and_options() {
        let out = run_with(XML, "shout", &[(1, "hello")], &[("loud", "true")], &Options::default()).unwrap();
        assert_eq!(out, "hello!");

        let small = Options { buffer_count: 2 };
        assert!(matches!(
            run_with(XML, "Shout", &[(1, "x")], &[], &small),
            Err(ScraperError::BufferOutOfRange { index: 3, max: 2 })
        ));
        assert!(matches!(
            run_with(XML, "Shout", &[], &[("quiet", "true")], &Options::default()),
            Err(ScraperError::UnknownSetting(_))
        ));
    }

    #[test]
    fn verbose_run_reports_metrics() {
        let inv = run_verbose_with(XML, "Shout", &[(1, "hi")], &[], &Options::default()).unwrap();
        assert_eq!(inv.value, "hi.");
        assert_eq!(inv.metrics.rules_visited, 1);
        assert_eq!(inv.metrics.rules_skipped, 1);
        assert_eq!(inv.metrics.max_depth, 1);
    }
}
