// src/launch/escape.rs

//! Escaping for values spliced into the argument blob and into displayed
//! environment entries.
//!
//! Both dialects turn `\` into `\\`, escape their own quote character, and
//! render `\n`, `\r`, `\t`, form feed as mnemonics. Any other character below
//! U+0020 is rejected.

use crate::errors::{LauncherError, Result};

/// Escape a value for a double-quoted argument-file token.
pub fn escape_arg(value: &str) -> Result<String> {
    escape(value, '"')
}

/// Escape a value for a single-quoted `NAME='value'` rendering.
pub fn escape_env(value: &str) -> Result<String> {
    escape(value, '\'')
}

fn escape(value: &str, quote: char) -> Result<String> {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{c}' => out.push_str("\\f"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 => {
                return Err(LauncherError::UnsupportedControlCharacter(c as u32));
            }
            c => out.push(c),
        }
    }
    Ok(out)
}
