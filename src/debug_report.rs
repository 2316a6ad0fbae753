use scrapxml::{Interpreter, Invocation, SettingKind};

mod ansi {
    // SGR parameters, wrapped as `ESC [ <code> m`.
    pub const DIM: &str = "2";
    pub const BOLD: &str = "1";
    pub const GREEN: &str = "32";
    pub const YELLOW: &str = "33";
    pub const BLUE: &str = "34";
    pub const CYAN: &str = "36";
    pub const GRAY: &str = "90";

    pub struct Palette(bool);

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Palette(enabled)
        }

        pub fn paint(&self, s: impl AsRef<str>, code: &str) -> String {
            match self.0 {
                true => format!("\x1b[{code}m{}\x1b[0m", s.as_ref()),
                false => s.as_ref().to_string(),
            }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            self.paint(s, BOLD)
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            self.paint(s, DIM)
        }
    }
}

/// Print the rule counters of one invocation (to stderr, so stdout stays the result).
pub fn print_invocation(inv: &Invocation, color: bool) {
    let palette = ansi::Palette::new(color);
    let m = &inv.metrics;
    eprintln!(
        "\n{}",
        palette.bold(palette.paint(format!("⚙  <{}> → buffer {}", inv.function, inv.result_buffer), ansi::CYAN))
    );

    eprintln!("\n{}", palette.paint("━━━ Rules ━━━", ansi::GRAY));
    eprintln!(
        "  {} {}  {} {}  {} {}",
        palette.dim("visited:"),
        palette.paint(m.rules_visited.to_string(), ansi::GREEN),
        palette.dim("skipped:"),
        palette.paint(m.rules_skipped.to_string(), ansi::YELLOW),
        palette.dim("max depth:"),
        palette.paint(m.max_depth.to_string(), ansi::BLUE),
    );

    eprintln!("\n{}", palette.paint("━━━ Matches ━━━", ansi::GRAY));
    eprintln!(
        "  {} {}  {} {}",
        palette.dim("matches:"),
        palette.paint(m.matches.to_string(), ansi::BLUE),
        palette.dim("writes:"),
        palette.paint(m.writes.to_string(), ansi::GREEN),
    );
    if m.discarded_expansions > 0 || m.compare_rejections > 0 {
        eprintln!(
            "  {} {}  {} {}",
            palette.dim("dropped (bad backreference):"),
            palette.paint(m.discarded_expansions.to_string(), ansi::YELLOW),
            palette.dim("rejected by compare:"),
            palette.paint(m.compare_rejections.to_string(), ansi::YELLOW),
        );
    }
    if m.matches == 0 {
        eprintln!("\n{}", palette.paint("No expression matched. Possible reasons:", ansi::YELLOW));
        eprintln!("  • Input buffers were empty (pass -b 1=... or -f 1=...)");
        eprintln!("  • Rules were skipped by their conditional");
        eprintln!("\n{}", palette.dim("  Tip: Set SCRAPXML_LOG=trace to see every rule and match"));
    }

    eprintln!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    eprintln!("  Total: {}", palette.paint(format!("{:?}", m.total), ansi::GREEN));
    eprintln!();
}

/// Print the functions and settings of a loaded scraper.
pub fn print_listing(interpreter: &Interpreter, color: bool) {
    let palette = ansi::Palette::new(color);
    let def = interpreter.definition();
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Scraper: {} ({})", def.name, def.content), ansi::CYAN)));

    println!("\n{}", palette.paint("━━━ Functions ━━━", ansi::GRAY));
    for f in def.functions() {
        println!(
            "  {} {} {}",
            palette.paint(&f.name, ansi::BLUE),
            palette.dim("│ result buffer"),
            palette.paint(f.result_buffer.to_string(), ansi::YELLOW)
        );
    }

    println!("\n{}", palette.paint("━━━ Settings ━━━", ansi::GRAY));
    for s in interpreter.settings().iter() {
        let kind = match &s.kind {
            SettingKind::Bool => "bool".to_string(),
            SettingKind::Text => "text".to_string(),
            SettingKind::Enum { values } => format!("enum[{}]", values.join("|")),
        };
        println!(
            "  {} {} {} {}",
            palette.paint(&s.id, ansi::BLUE),
            palette.bold(palette.paint(s.value.to_string(), ansi::GREEN)),
            palette.dim(format!("│ {kind}")),
            palette.dim(&s.label),
        );
    }
    println!();
}
