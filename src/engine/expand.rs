//! Backreference expansion of an output template against one regex match.
//!
//! Supported syntax:
//!
//! - `\1`..`\99`: numbered group (two digits are read greedily)
//! - `\g<n>` / `\g<name>`: numbered or named group
//! - `\0`, `\0NN`: octal character escape
//! - `\a \b \f \n \r \t \v \\`: control characters / backslash
//!
//! Any other escape is kept verbatim. A group that did not take part in the
//! match expands to nothing. A reference to a group the pattern does not have,
//! a malformed `\g<..>`, or a trailing lone backslash make the whole expansion
//! fail; the caller drops that match.

use regex::{Captures, Regex};

/// Expand `template` with the groups of `caps`, a match of `re`.
pub fn expand(template: &str, re: &Regex, caps: &Captures<'_>) -> Option<String> {
    let mut out = String::with_capacity(template.len() + 32);
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let next = chars.next()?;
        match next {
            '1'..='9' => {
                let mut group = next.to_digit(10)? as usize;
                if let Some(d) = chars.peek().and_then(|d| d.to_digit(10)) {
                    group = group * 10 + d as usize;
                    chars.next();
                }
                push_group(&mut out, caps, group)?;
            }
            '0' => {
                let mut value = 0u32;
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value)?);
            }
            'g' => {
                if chars.next()? != '<' {
                    return None;
                }
                let mut name = String::new();
                loop {
                    match chars.next()? {
                        '>' => break,
                        ch => name.push(ch),
                    }
                }
                if name.is_empty() {
                    return None;
                }
                match name.parse::<usize>() {
                    Ok(group) => push_group(&mut out, caps, group)?,
                    Err(_) => {
                        if !re.capture_names().flatten().any(|n| n == name) {
                            return None;
                        }
                        if let Some(m) = caps.name(&name) {
                            out.push_str(m.as_str());
                        }
                    }
                }
            }
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\x0b'),
            '\\' => out.push('\\'),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    Some(out)
}

fn push_group(out: &mut String, caps: &Captures<'_>, group: usize) -> Option<()> {
    if group >= caps.len() {
        return None;
    }
    if let Some(m) = caps.get(group) {
        out.push_str(m.as_str());
    }
    Some(())
}
