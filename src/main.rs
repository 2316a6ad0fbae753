mod debug_report;

use log::{Level, LevelFilter, Log, Metadata, Record};
use scrapxml::{Interpreter, Options, ScraperDefinition};
use std::io::{self, IsTerminal};
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };
    init_logging(config.verbose);

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}

fn run(config: &CliConfig) -> Result<(), Box<dyn std::error::Error>> {
    let xml = std::fs::read_to_string(&config.scraper)
        .map_err(|err| format!("failed to read {}: {err}", config.scraper))?;
    let definition = ScraperDefinition::parse(&xml)?;
    let mut interpreter = Interpreter::with_options(definition, &Options::default())?;

    for (id, value) in &config.settings {
        interpreter.settings_mut().set(id, value)?;
    }

    if config.list {
        debug_report::print_listing(&interpreter, config.color);
        if config.function.is_none() {
            return Ok(());
        }
    }

    let Some(function) = &config.function else {
        return Err(format!("no function given\n\n{}", help_text()).into());
    };

    for (index, source) in &config.buffers {
        let value = match source {
            BufferSource::Text(text) => text.clone(),
            BufferSource::File(path) => {
                std::fs::read_to_string(path).map_err(|err| format!("failed to read {path}: {err}"))?
            }
        };
        interpreter.set_buffer(*index, &value, false)?;
    }

    let invocation = interpreter.invoke_with_metrics(function)?;
    println!("{}", invocation.value);
    if config.report {
        debug_report::print_invocation(&invocation, config.color);
    }
    Ok(())
}

// --- Arguments --------------------------------------------------------------

enum BufferSource {
    Text(String),
    File(String),
}

struct CliConfig {
    scraper: String,
    function: Option<String>,
    buffers: Vec<(usize, BufferSource)>,
    settings: Vec<(String, String)>,
    list: bool,
    report: bool,
    color: bool,
    verbose: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut positional: Vec<String> = Vec::new();
    let mut buffers = Vec::new();
    let mut settings = Vec::new();
    let mut list = false;
    let mut report = false;
    let mut color = io::stderr().is_terminal();
    let mut verbose = false;
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("scrapxml {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--list" => list = true,
            "--report" => report = true,
            "-v" | "--verbose" => verbose = true,
            "-b" | "--buffer" => {
                let value = args.next().ok_or_else(|| format!("error: {arg} expects N=TEXT"))?;
                let (index, text) = split_buffer(&arg, &value)?;
                buffers.push((index, BufferSource::Text(text)));
            }
            "-f" | "--buffer-file" => {
                let value = args.next().ok_or_else(|| format!("error: {arg} expects N=PATH"))?;
                let (index, path) = split_buffer(&arg, &value)?;
                buffers.push((index, BufferSource::File(path)));
            }
            "-s" | "--set" => {
                let value = args.next().ok_or_else(|| format!("error: {arg} expects ID=VALUE"))?;
                let (id, v) = value
                    .split_once('=')
                    .ok_or_else(|| format!("error: invalid {arg} '{value}' (expected ID=VALUE)"))?;
                settings.push((id.to_string(), v.to_string()));
            }
            "--" => {
                positional.extend(args.by_ref());
                break;
            }
            _ if arg.starts_with("--buffer=") => {
                let (index, text) = split_buffer("--buffer", arg.trim_start_matches("--buffer="))?;
                buffers.push((index, BufferSource::Text(text)));
            }
            _ if arg.starts_with("--buffer-file=") => {
                let (index, path) = split_buffer("--buffer-file", arg.trim_start_matches("--buffer-file="))?;
                buffers.push((index, BufferSource::File(path)));
            }
            _ if arg.starts_with('-') && arg.len() > 1 => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let scraper = positional.next().ok_or_else(|| format!("error: no scraper file given\n\n{}", help_text()))?;
    let function = positional.next();
    if let Some(extra) = positional.next() {
        return Err(format!("error: unexpected argument '{extra}'"));
    }
    if function.is_none() && !list {
        return Err(format!("error: no function given\n\n{}", help_text()));
    }

    Ok(CliConfig { scraper, function, buffers, settings, list, report, color, verbose })
}

fn split_buffer(flag: &str, value: &str) -> Result<(usize, String), String> {
    let invalid = || format!("error: invalid {flag} '{value}' (expected N=VALUE with N >= 1)");
    let (index, rest) = value.split_once('=').ok_or_else(invalid)?;
    let index: usize = index.trim().parse().map_err(|_| invalid())?;
    if index == 0 {
        return Err(invalid());
    }
    Ok((index, rest.to_string()))
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "scrapxml {version}

Run a function of an XML scraper definition.

Usage:
  scrapxml [OPTIONS] <scraper.xml> <Function>
  scrapxml --list <scraper.xml>

Options:
  -b, --buffer N=TEXT        Put TEXT in buffer N before the call (repeatable).
  -f, --buffer-file N=PATH   Put the contents of PATH in buffer N (repeatable).
  -s, --set ID=VALUE         Set scraper setting ID (repeatable).
  --list                     List the scraper's functions and settings.
  --report                   Print rule metrics to stderr after the call.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -v, --verbose              Log rule evaluation (same as SCRAPXML_LOG=debug).
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Environment:
  SCRAPXML_LOG               error|warn|info|debug|trace (default: warn)

Exit codes:
  0  Success.
  1  Scraper or runtime error.
  2  Invalid arguments.
",
        version = env!("CARGO_PKG_VERSION"),
    )
}

// --- Logging ----------------------------------------------------------------

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "error",
            Level::Warn => "warn",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Trace => "trace",
        };
        eprintln!("[{tag} {}] {}", record.target(), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: bool) {
    let from_env = std::env::var("SCRAPXML_LOG").ok().and_then(|v| v.parse::<LevelFilter>().ok());
    let level = match (from_env, verbose) {
        (Some(level), true) => level.max(LevelFilter::Debug),
        (Some(level), false) => level,
        (None, true) => LevelFilter::Debug,
        (None, false) => LevelFilter::Warn,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
